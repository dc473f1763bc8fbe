use std::{ops::ControlFlow, sync::Arc, time::Instant};

use alloy::rpc::types::{Header, Log};
use alloy_primitives::{B256, Bytes, U64, U256};
use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, PayloadAttributes, PayloadStatusEnum,
};
use syncer_chainio::taiko::{
    anchor::{AnchorInput, AnchorTxConstructor},
    l1::{
        ITaikoL1::{self, BlockProposed},
        ProposeBlockInput,
    },
};
use syncer_primitives::{
    summary::Summary,
    taiko::{
        L1Origin,
        constants::{TAIKO_ANCHOR_GAS_LIMIT, TAIKO_GOLDEN_TOUCH_ACCOUNT},
        payload::{BlockMetadata, TaikoPayloadAttributes},
        tx_list::TxListValidator,
    },
    time::sleep_until_timestamp,
};
use tracing::{debug, info, trace, warn};

use crate::{
    beaconsync::BeaconSyncProgressTracker,
    config::ScanConfig,
    error::{EngineError, SyncError},
    iterator::{Direction, EventHandler, EventIterator},
    metrics::DriverMetrics,
    rpc::{ChainReader, L1Reader, L2Engine, L2Reader, ProtocolReader, SyncRpc},
    state::SyncState,
};

/// An L1 reorg that invalidated some of the inserted L2 blocks. The scan restarts from
/// `l1_current`, skipping the blocks up to `last_inserted_block_id`.
#[derive(Debug, Clone)]
pub(crate) struct ReorgDetected {
    pub(crate) l1_current: Header,
    pub(crate) last_inserted_block_id: Option<u64>,
}

/// Replays the `BlockProposed` events of the protocol into the L2 engine, one block at a time.
#[derive(Debug)]
pub(crate) struct CalldataSyncer<R> {
    rpc: Arc<R>,
    state: Arc<SyncState<R>>,
    tracker: Arc<BeaconSyncProgressTracker<R>>,
    validator: TxListValidator,
    anchor: AnchorTxConstructor,
    scan: ScanConfig,
    /// The ID of the last block inserted by this syncer.
    last_inserted_block_id: Option<u64>,
}

impl<R: SyncRpc> CalldataSyncer<R> {
    pub(crate) const fn new(
        rpc: Arc<R>,
        state: Arc<SyncState<R>>,
        tracker: Arc<BeaconSyncProgressTracker<R>>,
        validator: TxListValidator,
        anchor: AnchorTxConstructor,
        scan: ScanConfig,
    ) -> Self {
        Self { rpc, state, tracker, validator, anchor, scan, last_inserted_block_id: None }
    }

    /// Skip the blocks up to `id` in the next scans.
    pub(crate) const fn set_last_inserted_block_id(&mut self, id: u64) {
        self.last_inserted_block_id = Some(id);
    }

    /// Insert every block proposed between the L1 current cursor and `l1_end`, then move the
    /// cursor to `l1_end`.
    ///
    /// Every scan starts with a reorg check of the local chain. A reorg found during the scan,
    /// either while checking a new block or by the iterator itself, restarts the scan from the
    /// rewound cursor with a fresh check.
    pub(crate) async fn process_l1_blocks(&mut self, l1_end: &Header) -> Result<(), SyncError> {
        let rpc = Arc::clone(&self.rpc);

        loop {
            self.rewind_if_ahead(l1_end).await?;

            if !self.tracker.triggered() {
                let next_id = rpc.l2().latest_header().await?.number + 1;
                if let Some(reorg) = self.check_reorg(next_id).await? {
                    self.apply_reorg(reorg);
                }
            }

            let start = self.state.l1_current().number;
            let params = self.scan.params(start, Some(l1_end.number), Direction::Forward);
            let iter = EventIterator::new(rpc.l1(), params, rpc.protocol().address())?;

            debug!(start, end = l1_end.number, "Scanning L1 for proposed blocks");

            let Some(reorg) = iter.run(self).await? else { break };
            self.apply_reorg(reorg);
        }

        if !self.tracker.triggered() {
            self.state.set_l1_current(l1_end.clone());
        }

        Ok(())
    }

    /// Move the L1 current cursor right below `l1_end` if it is not behind it anymore.
    async fn rewind_if_ahead(&mut self, l1_end: &Header) -> Result<(), SyncError> {
        let l1_current = self.state.l1_current();
        if l1_current.number < l1_end.number || l1_current.hash == l1_end.hash {
            return Ok(());
        }

        let number = l1_end.number.saturating_sub(1);
        let header =
            self.rpc.l1().header_by_number(number).await?.ok_or(SyncError::L1BlockNotFound(number))?;

        warn!(
            l1_current = l1_current.summary(),
            l1_end = l1_end.summary(),
            "L1 current cursor is not behind the L1 end, rewinding"
        );
        self.state.set_l1_current(header);
        self.last_inserted_block_id = None;

        Ok(())
    }

    fn apply_reorg(&mut self, reorg: ReorgDetected) {
        warn!(
            l1_current = reorg.l1_current.summary(),
            last_inserted_block_id = ?reorg.last_inserted_block_id,
            "L1 reorg detected, restarting the scan"
        );
        DriverMetrics::increment_reorgs_detected(reorg.last_inserted_block_id.unwrap_or_default());

        self.state.set_l1_current(reorg.l1_current);
        self.last_inserted_block_id = reorg.last_inserted_block_id;
    }

    /// Check whether the L2 chain built so far still matches L1.
    ///
    /// The local block at the latest verified ID must carry the verified hash. Otherwise, the
    /// L1 origins are walked back from `id - 1` until one whose L1 block is still canonical.
    async fn check_reorg(&self, id: u64) -> Result<Option<ReorgDetected>, SyncError> {
        if self.state.l1_current().number == self.state.genesis_l1_height() {
            return Ok(None);
        }

        let verified = self.state.latest_verified();
        if verified.id > 0 && self.rpc.l2().latest_header().await?.number >= verified.id {
            let local = self
                .rpc
                .l2()
                .header_by_number(verified.id)
                .await?
                .ok_or(SyncError::L2BlockNotFound(verified.id))?;

            if local.hash != verified.hash {
                warn!(
                    id = verified.id,
                    local = %local.hash,
                    verified = %verified.hash,
                    "Local L2 block differs from the verified one, resetting to genesis"
                );
                return Ok(Some(self.reset_to_genesis().await?));
            }
        }

        let mut check_id = id - 1;
        let mut reorged = false;

        while check_id > 0 {
            let Some(origin) = self.rpc.l2().l1_origin_by_id(check_id).await? else {
                debug!(check_id, "L1 origin not found, skipping reorg check");
                return Ok(None);
            };

            let l1_height = origin.l1_height();
            match self.rpc.l1().header_by_number(l1_height).await? {
                Some(header) if header.hash == origin.l1_block_hash => {
                    if !reorged {
                        return Ok(None);
                    }

                    return Ok(Some(ReorgDetected {
                        l1_current: header,
                        last_inserted_block_id: Some(check_id),
                    }));
                }
                _ => {
                    warn!(check_id, l1_height, l1_hash = %origin.l1_block_hash, "L1 origin reorged out");
                    reorged = true;
                    check_id -= 1;
                }
            }
        }

        if reorged { Ok(Some(self.reset_to_genesis().await?)) } else { Ok(None) }
    }

    async fn reset_to_genesis(&self) -> Result<ReorgDetected, SyncError> {
        Ok(ReorgDetected {
            l1_current: self.state.genesis_l1_header().await?,
            last_inserted_block_id: Some(0),
        })
    }

    /// Returns the header of the block the new block `id` is built on.
    async fn parent_header(&self, id: u64, triggered: bool) -> Result<Header, SyncError> {
        let l2 = self.rpc.l2();

        if triggered {
            if let Some(last) = self.tracker.last_synced_verified_block() {
                return l2
                    .header_by_hash(last.hash)
                    .await?
                    .ok_or(SyncError::L2BlockHashNotFound(last.hash));
            }
        }

        let mut parent_id = id - 1;
        while parent_id > 0 {
            let origin =
                l2.l1_origin_by_id(parent_id).await?.ok_or(SyncError::L1OriginNotFound(parent_id))?;

            if origin.throwaway {
                trace!(parent_id, "Skipping throwaway parent block");
                parent_id -= 1;
                continue;
            }

            return l2
                .header_by_hash(origin.l2_block_hash)
                .await?
                .ok_or(SyncError::L2BlockHashNotFound(origin.l2_block_hash));
        }

        l2.header_by_number(0).await?.ok_or(SyncError::L2BlockNotFound(0))
    }

    /// Build the block proposed by `event` on top of `parent` and insert it into the engine.
    async fn insert_block(
        &self,
        id: u64,
        meta: &ITaikoL1::BlockMetadata,
        log: &Log,
        parent: &Header,
    ) -> Result<ExecutionPayloadV1, SyncError> {
        if meta.blobUsed {
            return Err(SyncError::UnsupportedBlob(id));
        }

        let (Some(l1_hash), Some(l1_height), Some(tx_index)) =
            (log.block_hash, log.block_number, log.transaction_index)
        else {
            return Err(SyncError::PendingLog(id));
        };

        let input = self
            .rpc
            .l1()
            .transaction_input(l1_hash, tx_index)
            .await?
            .ok_or(SyncError::ProposalTxNotFound { block_hash: l1_hash, index: tx_index })?;

        let proposal = ProposeBlockInput::decode(&input)
            .inspect_err(|err| warn!(id, ?err, "Failed to decode proposeBlock calldata"))
            .ok();
        let raw = proposal.as_ref().map(|p| p.tx_list_slice(meta.tx_list_range())).unwrap_or_default();

        let validated = self.validator.validate(raw);
        if !validated.hint.is_ok() {
            warn!(id, hint = %validated.hint, "Invalid transaction list, inserting an empty block");
            DriverMetrics::increment_invalid_tx_lists(validated.hint.as_str());
        }

        sleep_until_timestamp(meta.timestamp).await;

        let parent_gas_used = u32::try_from(parent.gas_used)
            .map_err(|_| SyncError::ParentGasUsedOverflow { id, gas_used: parent.gas_used })?;
        let time_since_parent = meta.timestamp.saturating_sub(parent.timestamp);
        let base_fee =
            self.rpc.l2().anchor_base_fee(parent.hash, time_since_parent, parent_gas_used).await?;
        let nonce = self.rpc.l2().nonce_at(TAIKO_GOLDEN_TOUCH_ACCOUNT, parent.hash).await?;

        let anchor_input =
            AnchorInput { l1_hash: meta.l1Hash, l1_height: meta.l1Height, parent_gas_used };
        let max_fee = u128::try_from(base_fee).map_err(|_| SyncError::BaseFeeOverflow(base_fee))?;
        let anchor = self.anchor.assemble(anchor_input, nonce, max_fee)?;

        let tx_count = validated.txs.len();
        let txs: Vec<_> = std::iter::once(anchor).chain(validated.txs).collect();
        DriverMetrics::set_block_tx_count(tx_count);

        let attributes = TaikoPayloadAttributes {
            payload_attributes: PayloadAttributes {
                timestamp: meta.timestamp,
                prev_randao: meta.mixHash,
                suggested_fee_recipient: meta.beneficiary,
                withdrawals: None,
                parent_beacon_block_root: None,
            },
            base_fee_per_gas: base_fee,
            block_metadata: BlockMetadata {
                beneficiary: meta.beneficiary,
                gas_limit: U64::from(u64::from(meta.gasLimit) + TAIKO_ANCHOR_GAS_LIMIT),
                timestamp: U64::from(meta.timestamp),
                tx_list: alloy_rlp::encode(&txs).into(),
                mix_hash: meta.mixHash,
                extra_data: Bytes::copy_from_slice(meta.extraData.as_slice()),
                highest_block_id: U256::from(self.state.head_block_id().max(id)),
            },
            l1_origin: L1Origin {
                block_id: U256::from(id),
                l2_block_hash: B256::ZERO,
                l1_block_height: U256::from(l1_height),
                l1_block_hash: l1_hash,
                throwaway: false,
            },
        };

        Ok(self.insert_payload(parent.hash, attributes).await?)
    }

    /// Run the Engine API handshake that builds a block on `parent_hash` and makes it the new
    /// head.
    async fn insert_payload(
        &self,
        parent_hash: B256,
        attributes: TaikoPayloadAttributes,
    ) -> Result<ExecutionPayloadV1, EngineError> {
        let engine = self.rpc.engine();

        let res = engine.fork_choice_updated(head_state(parent_hash), Some(attributes)).await?;
        expect_valid("forkchoiceUpdated", res.payload_status.status)?;
        let payload_id = res.payload_id.ok_or(EngineError::MissingPayloadId)?;

        let payload = engine.get_payload(payload_id).await?;

        let status = engine.new_payload(payload.clone()).await?;
        expect_valid("newPayload", status.status)?;

        let res = engine.fork_choice_updated(head_state(payload.block_hash), None).await?;
        expect_valid("forkchoiceUpdated", res.payload_status.status)?;

        Ok(payload)
    }
}

impl<R: SyncRpc> EventHandler for CalldataSyncer<R> {
    type Event = BlockProposed;
    type Break = ReorgDetected;
    type Error = SyncError;

    async fn on_event(
        &mut self,
        event: BlockProposed,
        log: &Log,
    ) -> Result<ControlFlow<ReorgDetected>, SyncError> {
        let id = event.blockId.saturating_to::<u64>();
        if id == 0 {
            return Ok(ControlFlow::Continue(()));
        }

        let triggered = self.tracker.triggered();
        if !triggered {
            if let Some(reorg) = self.check_reorg(id).await? {
                return Ok(ControlFlow::Break(reorg));
            }
        }

        if self.last_inserted_block_id.is_some_and(|last| id <= last) {
            trace!(id, "Block already inserted, skipping");
            return Ok(ControlFlow::Continue(()));
        }

        let synced = self.tracker.last_synced_verified_block();
        if triggered && synced.is_some_and(|synced| id <= synced.id) {
            trace!(id, "Block already beacon synced, skipping");
            return Ok(ControlFlow::Continue(()));
        }

        let started = Instant::now();
        let parent = self.parent_header(id, triggered).await?;
        let payload = self.insert_block(id, &event.meta, log, &parent).await?;

        self.last_inserted_block_id = Some(id);
        if triggered {
            self.tracker.clear_meta();
        }

        info!(
            id,
            number = payload.block_number,
            hash = %payload.block_hash,
            parent = %parent.hash,
            l1_height = ?log.block_number,
            txs = payload.transactions.len(),
            "🔗 New L2 block inserted"
        );
        DriverMetrics::increment_blocks_inserted();
        DriverMetrics::record_block_insertion_time(started.elapsed());

        Ok(ControlFlow::Continue(()))
    }

    fn on_rewind(&mut self, cursor: &Header) -> ControlFlow<ReorgDetected> {
        ControlFlow::Break(ReorgDetected {
            l1_current: cursor.clone(),
            last_inserted_block_id: self.last_inserted_block_id,
        })
    }
}

const fn head_state(head: B256) -> ForkchoiceState {
    ForkchoiceState { head_block_hash: head, safe_block_hash: B256::ZERO, finalized_block_hash: B256::ZERO }
}

fn expect_valid(method: &'static str, status: PayloadStatusEnum) -> Result<(), EngineError> {
    match status {
        PayloadStatusEnum::Valid => Ok(()),
        status => Err(EngineError::UnexpectedStatus { method, status }),
    }
}
