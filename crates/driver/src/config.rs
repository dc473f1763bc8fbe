use derive_more::derive::{Deref, DerefMut};
use syncer_chainio::taiko::l1::{ITaikoL1::Config, TaikoL1};
use syncer_config::Opts;
use syncer_primitives::{retries::RetryConfig, summary::Summary, taiko::tx_list::TxListLimits};
use thiserror::Error;

use crate::iterator::{Direction, IterParams};

/// An error that occurs when creating a [`RuntimeConfig`].
#[derive(Debug, Error)]
pub enum RuntimeConfigError {
    #[error("Contract error: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error("P2P sync of verified blocks requires a checkpoint URL")]
    MissingCheckpoint,
}

/// The runtime configuration for the syncer driver.
#[derive(Debug, Clone, Deref, DerefMut)]
pub(crate) struct RuntimeConfig {
    /// CLI options that can be accessed as dereferenced fields.
    #[deref]
    #[deref_mut]
    pub opts: Opts,
    /// Protocol config, fetched from the `TaikoL1` contract.
    pub protocol: Config,
}

impl RuntimeConfig {
    /// Create a new [`RuntimeConfig`] instance from the given [`Opts`].
    pub(crate) async fn from_opts(opts: Opts) -> Result<Self, RuntimeConfigError> {
        if opts.sync.p2p_sync_verified_blocks && opts.l2.checkpoint_url.is_none() {
            return Err(RuntimeConfigError::MissingCheckpoint);
        }

        let taiko_l1 = TaikoL1::new(opts.l1.el_url.clone(), opts.contracts.taiko_l1);
        let protocol = taiko_l1.protocol_config().await?;

        Ok(Self { opts, protocol })
    }

    /// The L2 chain ID.
    pub(crate) const fn chain_id(&self) -> u64 {
        self.protocol.chainId
    }

    /// The limits proposed transaction lists are validated against.
    pub(crate) fn tx_list_limits(&self) -> TxListLimits {
        TxListLimits {
            max_bytes_per_tx_list: self.protocol.maxBytesPerTxList,
            max_transactions_per_block: self.protocol.maxTransactionsPerBlock,
            block_max_gas_limit: u64::from(self.protocol.blockMaxGasLimit),
            min_tx_gas_limit: self.protocol.minTxGasLimit,
        }
    }

    /// The backoff applied to failed L1 scan batches.
    pub(crate) const fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            initial_ms: self.opts.sync.retry_backoff_ms,
            max_delay: self.opts.sync.retry_interval,
            max_retries: self.opts.sync.max_retries,
        }
    }

    /// The settings of every L1 scan.
    pub(crate) const fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            epoch_size: self.opts.sync.epoch_size,
            reorg_rewind_depth: self.opts.sync.reorg_rewind_depth,
            retry: self.retry_config(),
        }
    }
}

impl Summary for RuntimeConfig {
    fn summary(&self) -> String {
        format!(
            "Running with the following configuration:
            - Instance name: {}
            - L2 chain: id={}, block_max_gas_limit={}, max_txs_per_block={}, max_tx_list_bytes={}
            - Contracts: taiko_l1={}, taiko_l2={}
            - Scan: epoch_size={}, reorg_rewind_depth={}, retry_interval={:?}
            - P2P sync: enabled={}, checkpoint={}, timeout={:?}
            ",
            self.opts.instance_name,
            self.protocol.chainId,
            self.protocol.blockMaxGasLimit,
            self.protocol.maxTransactionsPerBlock,
            self.protocol.maxBytesPerTxList,
            self.opts.contracts.taiko_l1,
            self.opts.contracts.taiko_l2,
            self.opts.sync.epoch_size,
            self.opts.sync.reorg_rewind_depth,
            self.opts.sync.retry_interval,
            self.opts.sync.p2p_sync_verified_blocks,
            self.opts.l2.checkpoint_url.as_ref().map_or("none", |url| url.as_str()),
            self.opts.sync.p2p_sync_timeout,
        )
    }
}

/// The settings shared by every L1 event scan.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScanConfig {
    /// The number of L1 blocks fetched per batch.
    pub(crate) epoch_size: u64,
    /// How many blocks to go back when the scan cursor is reorged out.
    pub(crate) reorg_rewind_depth: u64,
    /// Backoff applied to failed batches.
    pub(crate) retry: RetryConfig,
}

impl ScanConfig {
    /// Returns the iterator parameters of a scan over `start..=end`.
    pub(crate) const fn params(
        &self,
        start: u64,
        end: Option<u64>,
        direction: Direction,
    ) -> IterParams {
        IterParams {
            start,
            end,
            epoch_size: self.epoch_size,
            direction,
            reorg_rewind_depth: self.reorg_rewind_depth,
            retry: self.retry,
        }
    }
}
