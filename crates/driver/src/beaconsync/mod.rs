use std::sync::Arc;

use alloy_rpc_types_engine::{ForkchoiceState, PayloadStatusEnum};
use syncer_clients::execution::block_to_payload_v1;
use tracing::{debug, info};

use crate::{
    error::{EngineError, SyncError},
    metrics::DriverMetrics,
    rpc::{CheckpointReader, L2Engine, SyncRpc},
    state::SyncState,
};

mod progress;
pub(crate) use progress::BeaconSyncProgressTracker;

/// Points the L2 engine at the latest verified block, fetched from a checkpoint node, and lets
/// it download the chain from its peers.
#[derive(Debug)]
pub(crate) struct BeaconSyncer<R> {
    rpc: Arc<R>,
    state: Arc<SyncState<R>>,
    tracker: Arc<BeaconSyncProgressTracker<R>>,
}

impl<R: SyncRpc> BeaconSyncer<R> {
    pub(crate) const fn new(
        rpc: Arc<R>,
        state: Arc<SyncState<R>>,
        tracker: Arc<BeaconSyncProgressTracker<R>>,
    ) -> Self {
        Self { rpc, state, tracker }
    }

    /// Trigger a beacon sync towards the latest verified block, unless one towards the same
    /// block is already in progress.
    pub(crate) async fn trigger_beacon_sync(&self) -> Result<(), SyncError> {
        let verified = self.state.latest_verified();
        let checkpoint = self.rpc.checkpoint().ok_or(SyncError::MissingCheckpoint)?;

        let block = checkpoint
            .block_by_hash(verified.hash)
            .await?
            .ok_or(SyncError::CheckpointBlockNotFound(verified.hash))?;
        let payload = block_to_payload_v1(block);

        if !self.tracker.head_changed(payload.block_number) {
            debug!(id = payload.block_number, "Beacon sync already triggered towards this block");
            return Ok(());
        }

        let engine = self.rpc.engine();

        let status = engine.new_payload(payload.clone()).await.map_err(EngineError::from)?;
        expect_valid_or_syncing("newPayload", status.status)?;

        let fcu_state = ForkchoiceState {
            head_block_hash: payload.block_hash,
            safe_block_hash: payload.block_hash,
            finalized_block_hash: payload.block_hash,
        };
        let res = engine.fork_choice_updated(fcu_state, None).await.map_err(EngineError::from)?;
        expect_valid_or_syncing("forkchoiceUpdated", res.payload_status.status)?;

        self.tracker.update_meta(payload.block_number, payload.block_hash);
        DriverMetrics::increment_beacon_syncs();

        info!(id = payload.block_number, hash = %payload.block_hash, "⛓️ Beacon sync triggered");

        Ok(())
    }
}

fn expect_valid_or_syncing(
    method: &'static str,
    status: PayloadStatusEnum,
) -> Result<(), EngineError> {
    match status {
        PayloadStatusEnum::Valid | PayloadStatusEnum::Syncing => Ok(()),
        status => Err(EngineError::UnexpectedStatus { method, status }),
    }
}
