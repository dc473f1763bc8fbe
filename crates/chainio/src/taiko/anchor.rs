use alloy::consensus::{
    SignableTransaction, Transaction, TxEip1559, TxEnvelope, transaction::SignerRecoverable,
};
use alloy_primitives::{Address, B256, TxKind, U256};
use alloy_sol_types::{Error as SolError, SolCall};
use syncer_primitives::taiko::{
    constants::{TAIKO_ANCHOR_GAS_LIMIT, TAIKO_GOLDEN_TOUCH_ACCOUNT, TAIKO_GOLDEN_TOUCH_PRIVATE_KEY},
    deterministic_signer::{DeterministicSignerError, sign_hash_deterministic},
};

use super::l2::ITaikoL2::anchorCall;

/// Errors that can occur when inspecting an anchor transaction.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum AnchorError {
    #[error("anchor transaction not found in block")]
    AnchorTransactionNotFound,
    #[error("anchor transaction signature is invalid")]
    InvalidSignature,
    #[error("anchor transaction from is not the golden touch account: {got}, expected: {expected}")]
    InvalidSigner { got: Address, expected: Address },
    #[error("anchor transaction is not sent to TaikoL2: {got}, expected: {expected}")]
    InvalidRecipient { got: Address, expected: Address },
    #[error("failed to decode anchor transaction data: {0}")]
    TransactionDataDecodeError(#[from] SolError),
    #[error("failed to sign anchor transaction: {0}")]
    Signing(#[from] DeterministicSignerError),
}

/// The inputs of the `anchor` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorInput {
    /// The hash of the L1 block that contains the proposal.
    pub l1_hash: B256,
    /// The height of the L1 block that contains the proposal.
    pub l1_height: u64,
    /// The gas used in the parent L2 block.
    pub parent_gas_used: u32,
}

impl From<AnchorInput> for anchorCall {
    fn from(input: AnchorInput) -> Self {
        Self { l1Hash: input.l1_hash, l1Height: input.l1_height, parentGasUsed: input.parent_gas_used }
    }
}

impl From<anchorCall> for AnchorInput {
    fn from(call: anchorCall) -> Self {
        Self { l1_hash: call.l1Hash, l1_height: call.l1Height, parent_gas_used: call.parentGasUsed }
    }
}

/// Builds the `anchor` transaction that opens every L2 block.
///
/// The transaction is signed by the golden touch account with a fixed ECDSA nonce, so every node
/// derives the exact same bytes for the same inputs.
#[derive(Debug, Clone, Copy)]
pub struct AnchorTxConstructor {
    chain_id: u64,
    taiko_l2: Address,
}

impl AnchorTxConstructor {
    /// Create a new constructor for the L2 chain with the given ID and `TaikoL2` address.
    pub const fn new(chain_id: u64, taiko_l2: Address) -> Self {
        Self { chain_id, taiko_l2 }
    }

    /// Assemble and sign the anchor transaction.
    ///
    /// `nonce` is the golden touch nonce at the parent block, `base_fee` the base fee of the new
    /// block. The priority fee is always zero.
    pub fn assemble(
        &self,
        input: AnchorInput,
        nonce: u64,
        base_fee: u128,
    ) -> Result<TxEnvelope, AnchorError> {
        let tx = TxEip1559 {
            chain_id: self.chain_id,
            nonce,
            gas_limit: TAIKO_ANCHOR_GAS_LIMIT,
            max_fee_per_gas: base_fee,
            max_priority_fee_per_gas: 0,
            to: TxKind::Call(self.taiko_l2),
            value: U256::ZERO,
            access_list: Default::default(),
            input: anchorCall::from(input).abi_encode().into(),
        };

        let signature =
            sign_hash_deterministic(TAIKO_GOLDEN_TOUCH_PRIVATE_KEY, tx.signature_hash())?;

        Ok(TxEnvelope::Eip1559(tx.into_signed(signature)))
    }

    /// Check that the given transaction is a well-formed anchor transaction and decode its
    /// inputs.
    pub fn decode(&self, tx: &TxEnvelope) -> Result<AnchorInput, AnchorError> {
        let signer = tx.recover_signer().map_err(|_| AnchorError::InvalidSignature)?;
        if signer != TAIKO_GOLDEN_TOUCH_ACCOUNT {
            return Err(AnchorError::InvalidSigner {
                got: signer,
                expected: TAIKO_GOLDEN_TOUCH_ACCOUNT,
            });
        }

        let to = tx.to().unwrap_or_default();
        if to != self.taiko_l2 {
            return Err(AnchorError::InvalidRecipient { got: to, expected: self.taiko_l2 });
        }

        Ok(anchorCall::abi_decode(tx.input())?.into())
    }

    /// Decode the anchor transaction of a block, i.e. the first one.
    pub fn decode_from_block(&self, txs: &[TxEnvelope]) -> Result<AnchorInput, AnchorError> {
        let first = txs.first().ok_or(AnchorError::AnchorTransactionNotFound)?;
        self.decode(first)
    }
}
