use std::fmt;

use alloy::consensus::{Transaction, TxEnvelope, transaction::SignerRecoverable};
use tracing::debug;

/// The protocol limits a proposed transaction list is checked against.
///
/// They are read from the `TaikoL1` protocol configuration at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxListLimits {
    /// The maximum size of the RLP-encoded transaction list, in bytes.
    pub max_bytes_per_tx_list: u64,
    /// The maximum amount of transactions in a single L2 block.
    pub max_transactions_per_block: u64,
    /// The maximum sum of the transactions gas limits in a single L2 block.
    pub block_max_gas_limit: u64,
    /// The minimum gas limit of a single transaction.
    pub min_tx_gas_limit: u64,
}

/// The outcome of validating a transaction list. Anything other than [`TxListHint::Ok`] means the
/// list must be replaced by an empty one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxListHint {
    /// The transaction list is valid.
    Ok,
    /// The encoded transaction list exceeds the maximum size.
    BinaryTooLarge,
    /// The bytes are not an RLP-encoded list of transactions.
    BinaryNotDecodable,
    /// The list contains more transactions than allowed in a block.
    BlockTooManyTxs,
    /// The sum of the transactions gas limits exceeds the block gas limit.
    BlockGasLimitTooLarge,
    /// The transaction at the given index has an invalid signature.
    TxInvalidSig {
        /// Index of the offending transaction.
        index: usize,
    },
    /// The transaction at the given index has a gas limit below the protocol minimum.
    TxGasLimitTooSmall {
        /// Index of the offending transaction.
        index: usize,
    },
}

impl TxListHint {
    /// Returns `true` if the transaction list is valid.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns the index of the offending transaction, if the hint refers to one.
    pub const fn tx_index(&self) -> Option<usize> {
        match self {
            Self::TxInvalidSig { index } | Self::TxGasLimitTooSmall { index } => Some(*index),
            _ => None,
        }
    }

    /// A short label for metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::BinaryTooLarge => "binary_too_large",
            Self::BinaryNotDecodable => "binary_not_decodable",
            Self::BlockTooManyTxs => "block_too_many_txs",
            Self::BlockGasLimitTooLarge => "block_gas_limit_too_large",
            Self::TxInvalidSig { .. } => "tx_invalid_sig",
            Self::TxGasLimitTooSmall { .. } => "tx_gas_limit_too_small",
        }
    }
}

impl fmt::Display for TxListHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tx_index() {
            Some(index) => write!(f, "{} (tx index {index})", self.as_str()),
            None => f.write_str(self.as_str()),
        }
    }
}

/// A transaction list after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTxList {
    /// The decoded transactions. Empty whenever `hint` is not [`TxListHint::Ok`].
    pub txs: Vec<TxEnvelope>,
    /// The validation outcome.
    pub hint: TxListHint,
}

impl ValidatedTxList {
    const fn invalid(hint: TxListHint) -> Self {
        Self { txs: Vec::new(), hint }
    }
}

/// Validates proposed transaction lists with a single rule set:
///
/// 1. the encoded list fits in `max_bytes_per_tx_list`;
/// 2. the bytes RLP-decode into a list of transactions;
/// 3. the list has at most `max_transactions_per_block` transactions;
/// 4. the summed gas limits fit in `block_max_gas_limit`;
/// 5. every transaction has a recoverable sender, signed for the L2 chain;
/// 6. every transaction gas limit is at least `min_tx_gas_limit`.
#[derive(Debug, Clone, Copy)]
pub struct TxListValidator {
    limits: TxListLimits,
    chain_id: u64,
}

impl TxListValidator {
    /// Creates a new validator for the L2 chain with the given ID.
    pub const fn new(limits: TxListLimits, chain_id: u64) -> Self {
        Self { limits, chain_id }
    }

    /// Validate the raw transaction list bytes. The input is never modified, so the caller still
    /// owns the original bytes whatever the outcome.
    pub fn validate(&self, tx_list: &[u8]) -> ValidatedTxList {
        if tx_list.len() as u64 > self.limits.max_bytes_per_tx_list {
            debug!(len = tx_list.len(), max = self.limits.max_bytes_per_tx_list, "Tx list too large");
            return ValidatedTxList::invalid(TxListHint::BinaryTooLarge);
        }

        let Ok(txs) = alloy_rlp::decode_exact::<Vec<TxEnvelope>>(tx_list) else {
            return ValidatedTxList::invalid(TxListHint::BinaryNotDecodable);
        };

        if txs.len() as u64 > self.limits.max_transactions_per_block {
            debug!(count = txs.len(), "Too many transactions in tx list");
            return ValidatedTxList::invalid(TxListHint::BlockTooManyTxs);
        }

        let total_gas = txs.iter().fold(0u64, |acc, tx| acc.saturating_add(tx.gas_limit()));
        if total_gas > self.limits.block_max_gas_limit {
            debug!(total_gas, "Tx list gas limit too large");
            return ValidatedTxList::invalid(TxListHint::BlockGasLimitTooLarge);
        }

        for (index, tx) in txs.iter().enumerate() {
            let wrong_chain = tx.chain_id().is_some_and(|id| id != self.chain_id);
            if wrong_chain || tx.recover_signer().is_err() {
                debug!(index, hash = %tx.tx_hash(), "Invalid transaction signature");
                return ValidatedTxList::invalid(TxListHint::TxInvalidSig { index });
            }

            if tx.gas_limit() < self.limits.min_tx_gas_limit {
                debug!(index, gas_limit = tx.gas_limit(), "Transaction gas limit too small");
                return ValidatedTxList::invalid(TxListHint::TxGasLimitTooSmall { index });
            }
        }

        ValidatedTxList { txs, hint: TxListHint::Ok }
    }
}
