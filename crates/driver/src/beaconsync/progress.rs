use std::{sync::Arc, time::Duration};

use alloy_primitives::B256;
use syncer_primitives::taiko::{VerifiedBlockInfo, progress::SyncProgress};
use tokio::{
    sync::watch,
    time::{Instant, MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

use crate::rpc::{ChainReader, L2Reader, SyncRpc};

/// The phase of a beacon sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum BeaconSyncStatus {
    /// No beacon sync in progress.
    #[default]
    Idle,
    /// The engine was asked to sync to a verified block.
    Triggered,
    /// The engine made no progress for longer than the timeout.
    OutOfSync,
}

#[derive(Debug, Clone, Copy, Default)]
struct TrackerState {
    status: BeaconSyncStatus,
    /// The verified block the last beacon sync was triggered to.
    last_synced_verified: Option<VerifiedBlockInfo>,
    /// The last progress snapshot reported by `eth_syncing`.
    last_progress: Option<SyncProgress>,
    /// When the engine last made progress.
    last_progressed_at: Option<Instant>,
}

/// Tracks a beacon sync of the L2 engine after it has been triggered, and marks it as out of
/// sync if it doesn't make any progress for `timeout`.
#[derive(Debug)]
pub(crate) struct BeaconSyncProgressTracker<R> {
    rpc: Arc<R>,
    timeout: Duration,
    check_interval: Duration,
    state: watch::Sender<TrackerState>,
}

impl<R: SyncRpc> BeaconSyncProgressTracker<R> {
    pub(crate) fn new(rpc: Arc<R>, timeout: Duration, check_interval: Duration) -> Self {
        Self { rpc, timeout, check_interval, state: watch::Sender::new(TrackerState::default()) }
    }

    /// Poll the engine sync progress every `check_interval`, forever.
    pub(crate) async fn run(self: Arc<Self>) {
        let mut ticker = interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.track().await;
        }
    }

    /// Check the engine sync progress once.
    pub(crate) async fn track(&self) {
        let state = *self.state.borrow();
        if state.status != BeaconSyncStatus::Triggered {
            return;
        }

        let Some(target) = state.last_synced_verified else { return };

        let progress = match self.rpc.l2().sync_progress().await {
            Ok(progress) => progress,
            Err(err) => {
                warn!(?err, "Failed to fetch the L2 sync progress");
                return;
            }
        };

        let Some(progress) = progress else {
            match self.rpc.l2().latest_header().await {
                Ok(head) if head.number >= target.id => {
                    info!(head = head.number, target = target.id, "L2 engine finished beacon sync");
                    self.state.send_modify(|s| {
                        s.last_progress = None;
                        s.last_progressed_at = Some(Instant::now());
                    });
                }
                Ok(head) => {
                    debug!(head = head.number, target = target.id, "Beacon sync not started yet");
                    self.check_timeout(&state);
                }
                Err(err) => warn!(?err, "Failed to fetch the L2 head"),
            }
            return;
        };

        // The first snapshot is only a baseline.
        let progressed = state.last_progress.is_some_and(|prev| progress.has_progressed(&prev));
        self.state.send_modify(|s| {
            s.last_progress = Some(progress);
            if progressed {
                s.last_progressed_at = Some(Instant::now());
            }
        });

        if progressed {
            debug!(
                current = ?progress.current_block,
                highest = ?progress.highest_block,
                "L2 engine beacon sync progressed"
            );
        } else {
            self.check_timeout(&state);
        }
    }

    fn check_timeout(&self, state: &TrackerState) {
        let Some(since) = state.last_progressed_at else { return };

        if since.elapsed() > self.timeout {
            warn!(
                timeout = ?self.timeout,
                target = ?state.last_synced_verified,
                "L2 engine made no beacon sync progress, marking it out of sync"
            );
            self.state.send_modify(|s| s.status = BeaconSyncStatus::OutOfSync);
        }
    }

    /// Record a new beacon sync towards the given verified block.
    pub(crate) fn update_meta(&self, id: u64, hash: B256) {
        self.state.send_modify(|s| {
            s.status = BeaconSyncStatus::Triggered;
            s.last_synced_verified = Some(VerifiedBlockInfo::new(id, hash));
            s.last_progress = None;
            s.last_progressed_at = Some(Instant::now());
        });
    }

    /// Forget the current beacon sync.
    pub(crate) fn clear_meta(&self) {
        debug!("Clearing beacon sync progress tracker meta");
        self.state.send_replace(TrackerState::default());
    }

    /// Returns `true` if `id` differs from the block the last beacon sync was triggered to, or
    /// if no beacon sync was triggered.
    pub(crate) fn head_changed(&self, id: u64) -> bool {
        let state = self.state.borrow();
        state.status != BeaconSyncStatus::Triggered ||
            state.last_synced_verified.is_none_or(|last| last.id != id)
    }

    pub(crate) fn status(&self) -> BeaconSyncStatus {
        self.state.borrow().status
    }

    /// Returns `true` while a beacon sync is in progress or timed out.
    pub(crate) fn triggered(&self) -> bool {
        self.status() != BeaconSyncStatus::Idle
    }

    pub(crate) fn out_of_sync(&self) -> bool {
        self.status() == BeaconSyncStatus::OutOfSync
    }

    /// The verified block the last beacon sync was triggered to.
    pub(crate) fn last_synced_verified_block(&self) -> Option<VerifiedBlockInfo> {
        self.state.borrow().last_synced_verified
    }
}
