use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

/// Constants for Taiko stack chains.
pub mod constants;

/// Fixed-K signature generation utilities.
pub mod deterministic_signer;

/// Transaction list validation against the protocol limits.
pub mod tx_list;

/// The `eth_syncing` progress of a taiko-geth node.
pub mod progress;

/// Engine API payload attributes extended with Taiko block metadata.
pub mod payload;

/// The `L1Origin` of an L2 block in Taiko.
///
/// Ref: <https://github.com/taikoxyz/taiko-geth/blob/v0.1.0/core/rawdb/taiko_l1_origin.go#L26>
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L1Origin {
    /// L2 block number.
    #[serde(rename = "blockID")]
    pub block_id: U256,
    /// L2 block hash.
    pub l2_block_hash: B256,
    /// L1 block height, the block which contains the `BlockProposed` event of this L2 block.
    pub l1_block_height: U256,
    /// L1 block hash.
    pub l1_block_hash: B256,
    /// Whether the block was built from an invalid transaction list with an older protocol
    /// revision. Such blocks carry no accepted state transition and are never used as parents.
    #[serde(default)]
    pub throwaway: bool,
}

impl L1Origin {
    /// Returns the L2 block ID as a `u64`.
    pub fn id(&self) -> u64 {
        self.block_id.saturating_to()
    }

    /// Returns the L1 block height as a `u64`.
    pub fn l1_height(&self) -> u64 {
        self.l1_block_height.saturating_to()
    }
}

/// The latest L2 block marked as verified by the L1 protocol contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VerifiedBlockInfo {
    /// The L2 block ID.
    pub id: u64,
    /// The L2 block hash recorded by the protocol.
    pub hash: B256,
}

impl VerifiedBlockInfo {
    /// Creates a new [`VerifiedBlockInfo`].
    pub const fn new(id: u64, hash: B256) -> Self {
        Self { id, hash }
    }
}
