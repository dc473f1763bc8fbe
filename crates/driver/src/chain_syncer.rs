use std::sync::Arc;

use alloy::rpc::types::Header;
use tracing::{debug, info, warn};

use crate::{
    beaconsync::{BeaconSyncProgressTracker, BeaconSyncer},
    calldata::CalldataSyncer,
    error::SyncError,
    metrics::DriverMetrics,
    rpc::{ChainReader, L2Reader, SyncRpc},
    state::{HeightOrId, SyncState},
};

/// Keeps the L2 engine in sync with L1, either by beacon syncing to the latest verified block
/// or by inserting the proposed blocks one by one.
#[derive(Debug)]
pub(crate) struct ChainSyncer<R> {
    rpc: Arc<R>,
    state: Arc<SyncState<R>>,
    tracker: Arc<BeaconSyncProgressTracker<R>>,
    beacon: BeaconSyncer<R>,
    calldata: CalldataSyncer<R>,
    /// Whether verified blocks are fetched through the engine P2P sync.
    p2p_sync: bool,
    /// Set once a beacon sync went out of sync. Calldata is the only source from then on.
    p2p_sync_abandoned: bool,
}

impl<R: SyncRpc> ChainSyncer<R> {
    pub(crate) fn new(
        rpc: Arc<R>,
        state: Arc<SyncState<R>>,
        tracker: Arc<BeaconSyncProgressTracker<R>>,
        calldata: CalldataSyncer<R>,
        p2p_sync: bool,
    ) -> Self {
        let beacon = BeaconSyncer::new(Arc::clone(&rpc), Arc::clone(&state), Arc::clone(&tracker));
        Self { rpc, state, tracker, beacon, calldata, p2p_sync, p2p_sync_abandoned: false }
    }

    /// Run one sync cycle up to the given L1 block.
    pub(crate) async fn sync(&mut self, l1_end: &Header) -> Result<(), SyncError> {
        if self.needs_beacon_sync().await? {
            return self.beacon.trigger_beacon_sync().await;
        }

        if self.tracker.triggered() {
            if self.tracker.out_of_sync() {
                warn!("L2 engine went out of sync, falling back to calldata sync");
                self.p2p_sync_abandoned = true;
                self.tracker.clear_meta();
                DriverMetrics::increment_beacon_syncs_abandoned();

                let head_id = self.rpc.l2().head_l1_origin().await?.map_or(0, |origin| origin.id());
                let id = self.state.reset_l1_current(HeightOrId::Id(head_id)).await?;
                self.calldata.set_last_inserted_block_id(id);
            } else {
                let Some(target) = self.tracker.last_synced_verified_block() else {
                    return Ok(());
                };

                let head = self.rpc.l2().latest_header().await?.number;
                if head < target.id {
                    info!(head, target = target.id, "Waiting for the beacon sync to finish");
                    return Ok(());
                }

                self.state.reset_l1_current(HeightOrId::Id(target.id)).await?;
            }
        }

        self.calldata.process_l1_blocks(l1_end).await
    }

    /// Whether the engine should be pointed at the latest verified block instead of replaying
    /// calldata.
    async fn needs_beacon_sync(&self) -> Result<bool, SyncError> {
        if !self.p2p_sync || self.p2p_sync_abandoned || self.tracker.out_of_sync() {
            return Ok(false);
        }

        let verified = self.state.latest_verified();
        if verified.id == 0 || self.rpc.l2().latest_header().await?.number >= verified.id {
            return Ok(false);
        }

        if self.rpc.l2().peer_count().await? == 0 {
            debug!("No L2 peers to beacon sync from");
            return Ok(false);
        }

        Ok(!self.tracker.triggered() || self.tracker.head_changed(verified.id))
    }
}
