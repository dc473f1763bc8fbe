use std::sync::Arc;

use alloy::transports::TransportError;
use syncer_chainio::taiko::anchor::AnchorTxConstructor;
use syncer_config::Opts;
use syncer_primitives::{summary::Summary, task::CriticalTasks, taiko::tx_list::TxListValidator};
use thiserror::Error;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::{
    beaconsync::BeaconSyncProgressTracker,
    calldata::CalldataSyncer,
    chain_syncer::ChainSyncer,
    config::{RuntimeConfig, RuntimeConfigError},
    metrics::DriverMetrics,
    rpc::RpcClients,
    state::{StateError, StateFeeds, SyncState},
};

/// The errors that can occur while starting the driver.
/// Once the event loop is running, sync errors are logged and retried instead.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Error in runtime configuration: {0}")]
    RuntimeConfig(#[from] RuntimeConfigError),
    #[error("Error while initializing the sync state: {0}")]
    State(#[from] StateError),
}

/// Taiko L2 syncer driver.
///
/// The driver manages the main execution loop: on every new L1 head it runs a sync cycle that
/// either beacon syncs the L2 engine to the latest verified block or inserts the newly proposed
/// blocks, and retries failed cycles after the retry interval.
#[derive(Debug)]
pub struct Driver {
    /// Driver runtime configuration.
    cfg: RuntimeConfig,
    /// Chain state shared with the sync components
    state: Arc<SyncState<RpcClients>>,
    /// Component responsible for keeping the L2 engine in sync with L1.
    syncer: ChainSyncer<RpcClients>,
    /// Long-running tasks manager
    tasks: CriticalTasks,
}

impl Driver {
    /// Create a new [`Driver`] instance.
    pub async fn new(opts: Opts) -> Result<Self, DriverError> {
        let cfg = RuntimeConfig::from_opts(opts).await?;

        info!("{}", cfg.summary());

        let rpc = Arc::new(RpcClients::new(&cfg).await?);
        let state = Arc::new(SyncState::new(Arc::clone(&rpc), cfg.scan_config()).await?);
        let tracker = Arc::new(BeaconSyncProgressTracker::new(
            Arc::clone(&rpc),
            cfg.sync.p2p_sync_timeout,
            cfg.sync.p2p_sync_check_interval,
        ));

        let mut tasks = CriticalTasks::new();
        let feeds = StateFeeds::subscribe(&rpc, cfg.contracts.taiko_l1);
        tasks.spawn("state updates", Arc::clone(&state).run(feeds));
        tasks.spawn("beacon sync progress tracker", Arc::clone(&tracker).run());

        let calldata = CalldataSyncer::new(
            Arc::clone(&rpc),
            Arc::clone(&state),
            Arc::clone(&tracker),
            TxListValidator::new(cfg.tx_list_limits(), cfg.chain_id()),
            AnchorTxConstructor::new(cfg.chain_id(), cfg.contracts.taiko_l2),
            cfg.scan_config(),
        );
        let p2p_sync = cfg.sync.p2p_sync_verified_blocks;
        let syncer = ChainSyncer::new(rpc, Arc::clone(&state), tracker, calldata, p2p_sync);

        Ok(Self { cfg, state, syncer, tasks })
    }

    /// Start the driver event loop.
    ///
    /// This function will run until the driver is stopped.
    pub async fn start(mut self) -> ! {
        DriverMetrics::set_version(env!("CARGO_PKG_VERSION").to_owned());

        let mut l1_heads = self.state.subscribe_l1_head();
        let mut retry_ticker = interval(self.cfg.sync.retry_interval);
        retry_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("🤠 Starting driver event loop");

        let mut failed = !self.sync().await;

        loop {
            tokio::select! {
                biased;

                Some(task_res) = &mut self.tasks => {
                    let name = task_res.name();
                    panic!("Critical task {} failed: {}", name, task_res.reason());
                }

                // Run a sync cycle on every new L1 head
                Ok(()) = l1_heads.changed() => {
                    failed = !self.sync().await;
                }

                // Retry a failed cycle if no new L1 head arrived in the meantime
                _ = retry_ticker.tick(), if failed => {
                    failed = !self.sync().await;
                }
            }
        }
    }

    /// Run a sync cycle up to the current L1 head. Returns `true` on success.
    async fn sync(&mut self) -> bool {
        let l1_end = self.state.l1_head();

        match self.syncer.sync(&l1_end).await {
            Ok(()) => {
                debug!(l1_end = l1_end.number, "Sync cycle completed");
                true
            }
            Err(err) => {
                error!(?err, l1_end = l1_end.number, "Sync cycle failed, retrying");
                DriverMetrics::increment_sync_failures(err.kind());
                false
            }
        }
    }
}
