use alloy::{contract::Error as ContractError, transports::TransportError};
use alloy_primitives::{B256, U256};
use alloy_rpc_types_engine::PayloadStatusEnum;
use syncer_chainio::taiko::anchor::AnchorError;
use syncer_primitives::retries::Retryable;
use thiserror::Error;

use crate::{iterator::IteratorError, state::StateError};

/// Errors returned by the Engine API handshake.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{method} returned status {status:?}")]
    UnexpectedStatus { method: &'static str, status: PayloadStatusEnum },
    #[error("forkchoiceUpdated with attributes returned no payload ID")]
    MissingPayloadId,
}

/// Errors that can occur while syncing the L2 chain.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Iterator(#[from] IteratorError),
    #[error("State error: {0}")]
    State(#[from] StateError),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("L1 block {0} not found")]
    L1BlockNotFound(u64),
    #[error("L2 block {0} not found")]
    L2BlockNotFound(u64),
    #[error("L2 block with hash {0} not found")]
    L2BlockHashNotFound(B256),
    #[error("L1 origin of L2 block {0} not found")]
    L1OriginNotFound(u64),
    #[error("proposing transaction {index} in L1 block {block_hash} not found")]
    ProposalTxNotFound { block_hash: B256, index: u64 },
    #[error("BlockProposed log of block {0} has no position")]
    PendingLog(u64),
    #[error("block {0} was proposed with a blob, which isn't supported")]
    UnsupportedBlob(u64),
    #[error("Anchor error: {0}")]
    Anchor(#[from] AnchorError),
    #[error("parent of block {id} used {gas_used} gas, which doesn't fit the anchor input")]
    ParentGasUsedOverflow { id: u64, gas_used: u64 },
    #[error("base fee {0} of the anchor transaction doesn't fit in 128 bits")]
    BaseFeeOverflow(U256),
    #[error("no checkpoint node configured")]
    MissingCheckpoint,
    #[error("verified block {0} not found on the checkpoint node")]
    CheckpointBlockNotFound(B256),
}

impl SyncError {
    /// A short label of the error kind, used in metrics.
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Contract(_) => "contract",
            Self::Iterator(_) => "iterator",
            Self::State(_) => "state",
            Self::Engine(_) => "engine",
            Self::L1BlockNotFound(_) | Self::L2BlockNotFound(_) | Self::L2BlockHashNotFound(_) => {
                "block_not_found"
            }
            Self::L1OriginNotFound(_) => "l1_origin_not_found",
            Self::ProposalTxNotFound { .. } | Self::PendingLog(_) => "proposal_not_found",
            Self::UnsupportedBlob(_) => "unsupported_blob",
            Self::Anchor(_) | Self::ParentGasUsedOverflow { .. } | Self::BaseFeeOverflow(_) => {
                "anchor"
            }
            Self::MissingCheckpoint | Self::CheckpointBlockNotFound(_) => "checkpoint",
        }
    }
}

impl Retryable for SyncError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) | Self::Engine(EngineError::Transport(err)) => err.is_retryable(),
            Self::Contract(ContractError::TransportError(err)) => err.is_retryable(),
            Self::State(err) => err.is_retryable(),
            _ => false,
        }
    }
}
