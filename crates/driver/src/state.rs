use std::{marker::PhantomData, ops::ControlFlow, sync::Arc};

use alloy::{
    contract::Error as ContractError,
    rpc::types::{Filter, Header, Log},
    transports::TransportError,
};
use alloy_primitives::{Address, B256};
use alloy_sol_types::SolEvent;
use futures::{Stream, StreamExt, stream::BoxStream};
use syncer_chainio::taiko::l1::ITaikoL1::{
    BlockProposed, BlockProven, BlockVerified, CrossChainSynced,
};
use syncer_primitives::{retries::Retryable, summary::Summary, taiko::VerifiedBlockInfo};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    config::ScanConfig,
    iterator::{Direction, EventHandler, EventIterator, IteratorError},
    metrics::DriverMetrics,
    rpc::{ChainReader, L2Reader, ProtocolReader, RpcClients, SyncRpc},
};

/// Errors that can occur while reading or updating the [`SyncState`].
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Iterator(#[from] IteratorError),
    #[error("L1 block {0} not found")]
    L1BlockNotFound(u64),
    #[error("L2 block {0} not found")]
    L2BlockNotFound(u64),
    #[error("no L1 event found for {0:?}")]
    EventNotFound(HeightOrId),
}

impl Retryable for StateError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) | Self::Contract(ContractError::TransportError(err)) => {
                err.is_retryable()
            }
            _ => false,
        }
    }
}

/// Identifies an L2 block either by its height in the L2 engine or by its protocol block ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightOrId {
    Height(u64),
    Id(u64),
}

/// The live subscriptions that keep the [`SyncState`] up to date.
///
/// The subscription tasks are aborted when the feeds are dropped.
pub(crate) struct StateFeeds {
    l1_heads: BoxStream<'static, Header>,
    l2_heads: BoxStream<'static, Header>,
    block_proposed: BoxStream<'static, (Log, BlockProposed)>,
    block_verified: BoxStream<'static, (Log, BlockVerified)>,
    cross_chain_synced: BoxStream<'static, (Log, CrossChainSynced)>,
    subscriptions: Vec<JoinHandle<()>>,
}

impl StateFeeds {
    pub(crate) fn new(
        l1_heads: impl Stream<Item = Header> + Send + 'static,
        l2_heads: impl Stream<Item = Header> + Send + 'static,
        block_proposed: impl Stream<Item = (Log, BlockProposed)> + Send + 'static,
        block_verified: impl Stream<Item = (Log, BlockVerified)> + Send + 'static,
        cross_chain_synced: impl Stream<Item = (Log, CrossChainSynced)> + Send + 'static,
    ) -> Self {
        Self {
            l1_heads: l1_heads.boxed(),
            l2_heads: l2_heads.boxed(),
            block_proposed: block_proposed.boxed(),
            block_verified: block_verified.boxed(),
            cross_chain_synced: cross_chain_synced.boxed(),
            subscriptions: Vec::new(),
        }
    }

    /// Subscribe to new heads of both chains and to the protocol events of `taiko_l1`. Every
    /// subscription resubscribes on its own when the connection drops.
    pub(crate) fn subscribe(rpc: &RpcClients, taiko_l1: Address) -> Self {
        let filter = |signature: B256| Filter::new().address(taiko_l1).event_signature(signature);

        let (l1_heads, l1_heads_task) = rpc.l1.subscribe_headers();
        let (l2_heads, l2_heads_task) = rpc.l2.el.subscribe_headers();
        let (proposed, proposed_task) =
            rpc.l1.subscribe_log_event::<BlockProposed>(filter(BlockProposed::SIGNATURE_HASH));
        let (verified, verified_task) =
            rpc.l1.subscribe_log_event::<BlockVerified>(filter(BlockVerified::SIGNATURE_HASH));
        let (synced, synced_task) = rpc
            .l1
            .subscribe_log_event::<CrossChainSynced>(filter(CrossChainSynced::SIGNATURE_HASH));

        let mut feeds = Self::new(l1_heads, l2_heads, proposed, verified, synced);
        feeds.subscriptions =
            vec![l1_heads_task, l2_heads_task, proposed_task, verified_task, synced_task];
        feeds
    }
}

impl Drop for StateFeeds {
    fn drop(&mut self) {
        for task in &self.subscriptions {
            task.abort();
        }
    }
}

/// The chain state shared by the sync components.
///
/// Every value lives behind a [`watch`] channel: the state update task and the calldata syncer
/// write, everything else reads a snapshot.
#[derive(Debug)]
pub(crate) struct SyncState<R> {
    rpc: Arc<R>,
    scan: ScanConfig,
    /// The L1 height at which the protocol was deployed.
    genesis_l1_height: u64,
    l1_head: watch::Sender<Header>,
    l2_head: watch::Sender<Header>,
    /// The L1 block up to which proposals have been replayed.
    l1_current: watch::Sender<Header>,
    /// The ID of the latest proposed L2 block.
    head_block_id: watch::Sender<u64>,
    /// The latest L2 block verified by the protocol.
    latest_verified: watch::Sender<VerifiedBlockInfo>,
}

impl<R: SyncRpc> SyncState<R> {
    /// Initialize the state from the protocol contract and both chains.
    pub(crate) async fn new(rpc: Arc<R>, scan: ScanConfig) -> Result<Self, StateError> {
        let vars = rpc.protocol().state_variables().await?;
        let genesis_l1_height = vars.genesisHeight;

        let l1_head = rpc.l1().latest_header().await?;
        let l2_head = rpc.l2().latest_header().await?;
        let l1_current = initial_l1_current(rpc.as_ref(), genesis_l1_height).await?;

        let verified_id = vars.lastVerifiedBlockId;
        let verified_hash = rpc.protocol().cross_chain_block_hash(verified_id).await?;
        let latest_verified = VerifiedBlockInfo::new(verified_id, verified_hash);
        let head_block_id = vars.numBlocks.saturating_sub(1);

        info!(
            genesis_l1_height,
            l1_head = l1_head.number,
            l2_head = l2_head.number,
            l1_current = l1_current.number,
            verified_id,
            %verified_hash,
            head_block_id,
            "Initialized sync state"
        );

        DriverMetrics::set_l1_head(l1_head.number);
        DriverMetrics::set_l2_head(l2_head.number);
        DriverMetrics::set_l1_current(l1_current.number);
        DriverMetrics::set_head_block_id(head_block_id);
        DriverMetrics::set_verified_block_id(verified_id);

        Ok(Self {
            rpc,
            scan,
            genesis_l1_height,
            l1_head: watch::Sender::new(l1_head),
            l2_head: watch::Sender::new(l2_head),
            l1_current: watch::Sender::new(l1_current),
            head_block_id: watch::Sender::new(head_block_id),
            latest_verified: watch::Sender::new(latest_verified),
        })
    }

    pub(crate) const fn genesis_l1_height(&self) -> u64 {
        self.genesis_l1_height
    }

    /// Fetch the L1 header at the protocol genesis height.
    pub(crate) async fn genesis_l1_header(&self) -> Result<Header, StateError> {
        self.rpc
            .l1()
            .header_by_number(self.genesis_l1_height)
            .await?
            .ok_or(StateError::L1BlockNotFound(self.genesis_l1_height))
    }

    pub(crate) fn l1_head(&self) -> Header {
        self.l1_head.borrow().clone()
    }

    /// Returns a receiver notified on every new L1 head.
    pub(crate) fn subscribe_l1_head(&self) -> watch::Receiver<Header> {
        self.l1_head.subscribe()
    }

    pub(crate) fn l2_head(&self) -> Header {
        self.l2_head.borrow().clone()
    }

    pub(crate) fn l1_current(&self) -> Header {
        self.l1_current.borrow().clone()
    }

    /// Move the L1 replay cursor.
    pub(crate) fn set_l1_current(&self, header: Header) {
        debug!(number = header.number, hash = %header.hash, "Setting L1 current cursor");
        DriverMetrics::set_l1_current(header.number);
        self.l1_current.send_replace(header);
    }

    pub(crate) fn head_block_id(&self) -> u64 {
        *self.head_block_id.borrow()
    }

    pub(crate) fn latest_verified(&self) -> VerifiedBlockInfo {
        *self.latest_verified.borrow()
    }

    /// Apply the updates of the given feeds until all of them close.
    pub(crate) async fn run(self: Arc<Self>, mut feeds: StateFeeds) {
        info!("Starting sync state updates");

        loop {
            tokio::select! {
                Some(header) = feeds.l1_heads.next() => self.on_l1_head(header),
                Some(header) = feeds.l2_heads.next() => self.on_l2_head(header),
                Some((_, event)) = feeds.block_proposed.next() => self.on_block_proposed(&event),
                Some((_, event)) = feeds.block_verified.next() => on_block_verified(&event),
                Some((_, event)) = feeds.cross_chain_synced.next() => {
                    self.on_cross_chain_synced(&event).await;
                }
                else => {
                    error!("All sync state feeds closed");
                    return;
                }
            }
        }
    }

    fn on_l1_head(&self, header: Header) {
        DriverMetrics::set_l1_head(header.number);

        let prev = self.l1_head.send_replace(header.clone());
        let reorged = if header.number == prev.number + 1 {
            header.parent_hash != prev.hash
        } else {
            header.number <= prev.number && header.hash != prev.hash
        };

        if reorged {
            warn!(old = prev.summary(), new = header.summary(), "L1 reorg detected");
            DriverMetrics::increment_l1_reorgs();
        }
    }

    fn on_l2_head(&self, header: Header) {
        DriverMetrics::set_l2_head(header.number);
        self.l2_head.send_replace(header);
    }

    fn on_block_proposed(&self, event: &BlockProposed) {
        let id = event.blockId.saturating_to::<u64>();

        self.head_block_id.send_if_modified(|head| {
            if id <= *head {
                return false;
            }
            *head = id;
            true
        });

        DriverMetrics::set_head_block_id(self.head_block_id());
    }

    async fn on_cross_chain_synced(&self, event: &CrossChainSynced) {
        let id = event.srcHeight;

        if self.l2_head().number >= id {
            match self.rpc.l2().header_by_number(id).await {
                Ok(Some(header)) if header.hash != event.blockHash => {
                    warn!(
                        id,
                        local = %header.hash,
                        verified = %event.blockHash,
                        "Verified block hash differs from the local L2 chain"
                    );
                }
                Ok(_) => {}
                Err(err) => warn!(?err, id, "Failed to fetch the verified L2 block"),
            }
        }

        debug!(id, hash = %event.blockHash, "New verified L2 block");
        DriverMetrics::set_verified_block_id(id);
        self.latest_verified.send_replace(VerifiedBlockInfo::new(id, event.blockHash));
    }

    /// Move the L1 replay cursor back to the L1 block that proposed the given L2 block, and
    /// return its block ID.
    ///
    /// A [`HeightOrId::Height`] is first resolved to a block ID through the `BlockProven` event
    /// carrying the hash of the L2 block at that height.
    pub(crate) async fn reset_l1_current(&self, target: HeightOrId) -> Result<u64, StateError> {
        let id = match target {
            HeightOrId::Id(id) => id,
            HeightOrId::Height(height) => self.proven_block_id(height).await?,
        };

        let header = if id == 0 {
            self.genesis_l1_header().await?
        } else {
            let (_, log) = self
                .find_event(FindEvent::new(|_: &BlockProposed| true), Some(id))
                .await?
                .ok_or(StateError::EventNotFound(target))?;

            let number = log.block_number.ok_or(StateError::EventNotFound(target))?;
            self.rpc.l1().header_by_number(number).await?.ok_or(StateError::L1BlockNotFound(number))?
        };

        info!(?target, id, l1_current = header.number, "Reset L1 current cursor");
        self.set_l1_current(header);

        Ok(id)
    }

    /// Returns the ID of the L2 block at `height`, looked up from its `BlockProven` event.
    async fn proven_block_id(&self, height: u64) -> Result<u64, StateError> {
        let header = self
            .rpc
            .l2()
            .header_by_number(height)
            .await?
            .ok_or(StateError::L2BlockNotFound(height))?;

        let hash = header.hash;
        let found = self
            .find_event(FindEvent::new(move |e: &BlockProven| e.blockHash == hash), None)
            .await?;

        found
            .map(|(event, _)| event.blockId.saturating_to())
            .ok_or(StateError::EventNotFound(HeightOrId::Height(height)))
    }

    /// Scan L1 backwards from the head to the protocol genesis for the latest matching event.
    async fn find_event<E, F>(
        &self,
        mut handler: FindEvent<E, F>,
        id: Option<u64>,
    ) -> Result<Option<(E, Log)>, StateError>
    where
        E: SolEvent + Send,
        F: Fn(&E) -> bool + Send,
    {
        let end = self.l1_head().number.max(self.genesis_l1_height);
        let params = self.scan.params(self.genesis_l1_height, Some(end), Direction::Reverse);

        let mut iter = EventIterator::new(self.rpc.l1(), params, self.rpc.protocol().address())?;
        if let Some(id) = id {
            iter = iter.with_ids([id]);
        }

        iter.run(&mut handler).await
    }
}

fn on_block_verified(event: &BlockVerified) {
    info!(
        id = %event.blockId,
        hash = %event.blockHash,
        prover = %event.prover,
        "Block verified"
    );
}

/// The L1 block of the head L1 origin of the L2 engine, or the protocol genesis block if there
/// is none.
async fn initial_l1_current<R: SyncRpc>(rpc: &R, genesis_l1_height: u64) -> Result<Header, StateError> {
    if let Some(origin) = rpc.l2().head_l1_origin().await? {
        if let Some(header) = rpc.l1().header_by_hash(origin.l1_block_hash).await? {
            return Ok(header);
        }

        warn!(
            id = origin.id(),
            l1_hash = %origin.l1_block_hash,
            "L1 block of the head L1 origin not found, starting from genesis"
        );
    }

    rpc.l1()
        .header_by_number(genesis_l1_height)
        .await?
        .ok_or(StateError::L1BlockNotFound(genesis_l1_height))
}

/// Stops an event iteration at the first event matching the predicate.
struct FindEvent<E, F> {
    matches: F,
    _event: PhantomData<E>,
}

impl<E, F: Fn(&E) -> bool> FindEvent<E, F> {
    const fn new(matches: F) -> Self {
        Self { matches, _event: PhantomData }
    }
}

impl<E, F> EventHandler for FindEvent<E, F>
where
    E: SolEvent + Send,
    F: Fn(&E) -> bool + Send,
{
    type Event = E;
    type Break = (E, Log);
    type Error = StateError;

    async fn on_event(&mut self, event: E, log: &Log) -> Result<ControlFlow<(E, Log)>, StateError> {
        if (self.matches)(&event) {
            return Ok(ControlFlow::Break((event, log.clone())));
        }
        Ok(ControlFlow::Continue(()))
    }
}
