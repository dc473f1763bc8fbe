use std::{num::ParseIntError, time::Duration};

use clap::Parser;

/// Sync-related configuration options
#[derive(Debug, Clone, Parser)]
pub struct SyncOpts {
    /// Whether to catch up with the latest verified block through the engine P2P sync before
    /// inserting blocks from L1 calldata. Requires `--p2p.checkpoint-url`.
    #[clap(
        long = "p2p.sync-verified-blocks",
        env = "SYNCER_P2P_SYNC_VERIFIED_BLOCKS",
        default_value_t = false
    )]
    pub p2p_sync_verified_blocks: bool,
    /// The time without any P2P sync progress after which the engine is considered out of sync
    /// (in seconds).
    #[clap(
        long = "p2p.sync-timeout",
        env = "SYNCER_P2P_SYNC_TIMEOUT",
        default_value = "3600",
        value_parser = parse_secs
    )]
    pub p2p_sync_timeout: Duration,
    /// The interval between two P2P sync progress checks (in seconds).
    #[clap(
        long = "p2p.sync-check-interval",
        env = "SYNCER_P2P_SYNC_CHECK_INTERVAL",
        default_value = "10",
        value_parser = parse_secs
    )]
    pub p2p_sync_check_interval: Duration,
    /// The interval after which a failed sync cycle is retried if no new L1 head arrives
    /// (in seconds).
    #[clap(
        long = "sync.retry-interval",
        env = "SYNCER_SYNC_RETRY_INTERVAL",
        default_value = "12",
        value_parser = parse_secs
    )]
    pub retry_interval: Duration,
    /// The number of L1 blocks scanned for events in a single batch.
    #[clap(long = "sync.epoch-size", env = "SYNCER_SYNC_EPOCH_SIZE", default_value_t = 1000)]
    pub epoch_size: u64,
    /// How many L1 blocks to rewind when the scan cursor is reorged out.
    #[clap(
        long = "sync.reorg-rewind-depth",
        env = "SYNCER_SYNC_REORG_REWIND_DEPTH",
        default_value_t = 20
    )]
    pub reorg_rewind_depth: u64,
    /// The base delay of the exponential backoff for failed L1 scans (in milliseconds).
    #[clap(
        long = "sync.retry-backoff-ms",
        env = "SYNCER_SYNC_RETRY_BACKOFF_MS",
        default_value_t = 10
    )]
    pub retry_backoff_ms: u64,
    /// The maximum number of retries of a failed L1 scan batch.
    #[clap(long = "sync.max-retries", env = "SYNCER_SYNC_MAX_RETRIES", default_value_t = 10)]
    pub max_retries: usize,
}

/// Parse a number of seconds into a [`Duration`].
fn parse_secs(s: &str) -> Result<Duration, ParseIntError> {
    s.parse().map(Duration::from_secs)
}
