use std::future::Future;

use alloy::{
    contract::Result as ContractResult,
    providers::Provider,
    rpc::types::{Block, Filter, Header, Log},
    transports::TransportResult,
};
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, ForkchoiceUpdated, PayloadId, PayloadStatus,
};
use syncer_chainio::{
    DefaultProvider, new_default_provider,
    taiko::{
        l1::{ITaikoL1::StateVariables, TaikoL1},
        l2::TaikoL2,
    },
};
use syncer_clients::{
    engine::EngineClient,
    execution::{ExecutionClient, TaikoExecutionClient},
};
use syncer_primitives::taiko::{L1Origin, payload::TaikoPayloadAttributes, progress::SyncProgress};

use crate::config::RuntimeConfig;

/// Read access to the blocks and logs of a chain.
pub(crate) trait ChainReader: Send + Sync {
    /// Returns the header of the chain head.
    fn latest_header(&self) -> impl Future<Output = TransportResult<Header>> + Send;

    /// Returns the canonical header at the given height, if any.
    fn header_by_number(
        &self,
        number: u64,
    ) -> impl Future<Output = TransportResult<Option<Header>>> + Send;

    /// Returns the header with the given hash, if it is known.
    fn header_by_hash(
        &self,
        hash: B256,
    ) -> impl Future<Output = TransportResult<Option<Header>>> + Send;

    /// Returns the logs matching the filter.
    fn logs(&self, filter: &Filter) -> impl Future<Output = TransportResult<Vec<Log>>> + Send;
}

/// The L1 execution client.
pub(crate) trait L1Reader: ChainReader {
    /// Returns the input of the transaction at `index` in the block with the given hash.
    fn transaction_input(
        &self,
        block_hash: B256,
        index: u64,
    ) -> impl Future<Output = TransportResult<Option<Bytes>>> + Send;
}

/// The L2 execution client, including the taiko-geth specific namespaces.
pub(crate) trait L2Reader: ChainReader {
    /// Returns the L1 origin of the L2 block with the given ID.
    fn l1_origin_by_id(
        &self,
        block_id: u64,
    ) -> impl Future<Output = TransportResult<Option<L1Origin>>> + Send;

    /// Returns the L1 origin of the last block inserted from an L1 proposal.
    fn head_l1_origin(&self) -> impl Future<Output = TransportResult<Option<L1Origin>>> + Send;

    /// Returns the P2P sync progress, or `None` if the node isn't syncing.
    fn sync_progress(&self) -> impl Future<Output = TransportResult<Option<SyncProgress>>> + Send;

    /// Returns the number of connected peers.
    fn peer_count(&self) -> impl Future<Output = TransportResult<u64>> + Send;

    /// Returns the nonce of `address` at the state of the block with the given hash.
    fn nonce_at(
        &self,
        address: Address,
        block_hash: B256,
    ) -> impl Future<Output = TransportResult<u64>> + Send;

    /// Returns the base fee of a block built on top of the given parent, as computed by the
    /// `TaikoL2` contract.
    fn anchor_base_fee(
        &self,
        parent_hash: B256,
        time_since_parent: u64,
        parent_gas_used: u32,
    ) -> impl Future<Output = ContractResult<U256>> + Send;
}

/// The `TaikoL1` protocol contract.
pub(crate) trait ProtocolReader: Send + Sync {
    /// The contract address, used to filter its events.
    fn address(&self) -> Address;

    /// Returns the protocol state counters.
    fn state_variables(&self) -> impl Future<Output = ContractResult<StateVariables>> + Send;

    /// Returns the L2 block hash recorded on L1 for the given block ID.
    fn cross_chain_block_hash(
        &self,
        block_id: u64,
    ) -> impl Future<Output = ContractResult<B256>> + Send;
}

/// The Engine API of the L2 execution client.
pub(crate) trait L2Engine: Send + Sync {
    /// `engine_forkchoiceUpdatedV1`
    fn fork_choice_updated(
        &self,
        state: ForkchoiceState,
        attributes: Option<TaikoPayloadAttributes>,
    ) -> impl Future<Output = TransportResult<ForkchoiceUpdated>> + Send;

    /// `engine_getPayloadV1`
    fn get_payload(
        &self,
        payload_id: PayloadId,
    ) -> impl Future<Output = TransportResult<ExecutionPayloadV1>> + Send;

    /// `engine_newPayloadV1`
    fn new_payload(
        &self,
        payload: ExecutionPayloadV1,
    ) -> impl Future<Output = TransportResult<PayloadStatus>> + Send;
}

/// A synced L2 node serving verified blocks to beacon sync from.
pub(crate) trait CheckpointReader: Send + Sync {
    /// Returns the full block with the given hash, if the node has it.
    fn block_by_hash(&self, hash: B256)
    -> impl Future<Output = TransportResult<Option<Block>>> + Send;
}

/// The set of connections the sync components work with.
pub(crate) trait SyncRpc: Send + Sync + 'static {
    /// The L1 execution client.
    type L1: L1Reader;
    /// The L2 execution client.
    type L2: L2Reader;
    /// The L1 protocol contract.
    type Protocol: ProtocolReader;
    /// The L2 Engine API.
    type Engine: L2Engine;
    /// The checkpoint node.
    type Checkpoint: CheckpointReader;

    fn l1(&self) -> &Self::L1;
    fn l2(&self) -> &Self::L2;
    fn protocol(&self) -> &Self::Protocol;
    fn engine(&self) -> &Self::Engine;
    fn checkpoint(&self) -> Option<&Self::Checkpoint>;
}

impl<C: Send + Sync> ChainReader for ExecutionClient<C> {
    async fn latest_header(&self) -> TransportResult<Header> {
        Self::latest_header(self).await
    }

    async fn header_by_number(&self, number: u64) -> TransportResult<Option<Header>> {
        Self::header_by_number(self, Some(number)).await
    }

    async fn header_by_hash(&self, hash: B256) -> TransportResult<Option<Header>> {
        Self::header_by_hash(self, hash).await
    }

    async fn logs(&self, filter: &Filter) -> TransportResult<Vec<Log>> {
        self.get_logs(filter).await
    }
}

impl<C: Send + Sync> L1Reader for ExecutionClient<C> {
    async fn transaction_input(&self, block_hash: B256, index: u64) -> TransportResult<Option<Bytes>> {
        Self::transaction_input(self, block_hash, index).await
    }
}

/// The L2 execution client together with the `TaikoL2` contract deployed on it.
#[derive(Debug, Clone)]
pub(crate) struct L2Client {
    pub(crate) el: TaikoExecutionClient,
    taiko_l2: TaikoL2,
}

impl ChainReader for L2Client {
    async fn latest_header(&self) -> TransportResult<Header> {
        self.el.latest_header().await
    }

    async fn header_by_number(&self, number: u64) -> TransportResult<Option<Header>> {
        self.el.header_by_number(Some(number)).await
    }

    async fn header_by_hash(&self, hash: B256) -> TransportResult<Option<Header>> {
        self.el.header_by_hash(hash).await
    }

    async fn logs(&self, filter: &Filter) -> TransportResult<Vec<Log>> {
        self.el.get_logs(filter).await
    }
}

impl L2Reader for L2Client {
    async fn l1_origin_by_id(&self, block_id: u64) -> TransportResult<Option<L1Origin>> {
        self.el.l1_origin_by_id(block_id).await
    }

    async fn head_l1_origin(&self) -> TransportResult<Option<L1Origin>> {
        self.el.head_l1_origin().await
    }

    async fn sync_progress(&self) -> TransportResult<Option<SyncProgress>> {
        self.el.sync_progress().await
    }

    async fn peer_count(&self) -> TransportResult<u64> {
        self.el.peer_count().await
    }

    async fn nonce_at(&self, address: Address, block_hash: B256) -> TransportResult<u64> {
        self.el.nonce_at(address, block_hash).await
    }

    async fn anchor_base_fee(
        &self,
        parent_hash: B256,
        time_since_parent: u64,
        parent_gas_used: u32,
    ) -> ContractResult<U256> {
        self.taiko_l2.base_fee(parent_hash, time_since_parent, parent_gas_used).await
    }
}

impl ProtocolReader for TaikoL1 {
    fn address(&self) -> Address {
        *(**self).address()
    }

    async fn state_variables(&self) -> ContractResult<StateVariables> {
        Self::state_variables(self).await
    }

    async fn cross_chain_block_hash(&self, block_id: u64) -> ContractResult<B256> {
        Self::cross_chain_block_hash(self, block_id).await
    }
}

impl L2Engine for EngineClient {
    async fn fork_choice_updated(
        &self,
        state: ForkchoiceState,
        attributes: Option<TaikoPayloadAttributes>,
    ) -> TransportResult<ForkchoiceUpdated> {
        self.fork_choice_updated_v1(state, attributes).await
    }

    async fn get_payload(&self, payload_id: PayloadId) -> TransportResult<ExecutionPayloadV1> {
        self.get_payload_v1(payload_id).await
    }

    async fn new_payload(&self, payload: ExecutionPayloadV1) -> TransportResult<PayloadStatus> {
        self.new_payload_v1(payload).await
    }
}

impl CheckpointReader for DefaultProvider {
    async fn block_by_hash(&self, hash: B256) -> TransportResult<Option<Block>> {
        self.client().request("eth_getBlockByHash", (hash, true)).await
    }
}

/// The production connections of the driver.
#[derive(Debug)]
pub(crate) struct RpcClients {
    pub(crate) l1: ExecutionClient,
    pub(crate) l2: L2Client,
    taiko_l1: TaikoL1,
    engine: EngineClient,
    checkpoint: Option<DefaultProvider>,
}

impl RpcClients {
    /// Connect to every endpoint in the configuration.
    pub(crate) async fn new(cfg: &RuntimeConfig) -> TransportResult<Self> {
        let l1 = ExecutionClient::new(cfg.l1.el_url.clone(), cfg.l1.el_ws_url.clone()).await?;
        let el = TaikoExecutionClient::new(cfg.l2.el_url.clone(), cfg.l2.el_ws_url.clone()).await?;
        let taiko_l2 = TaikoL2::new(cfg.l2.el_url.clone(), cfg.contracts.taiko_l2);
        let taiko_l1 = TaikoL1::new(cfg.l1.el_url.clone(), cfg.contracts.taiko_l1);
        let engine = EngineClient::new(cfg.l2.engine_url.clone(), cfg.l2.jwt_secret);
        let checkpoint = cfg.l2.checkpoint_url.clone().map(new_default_provider);

        Ok(Self { l1, l2: L2Client { el, taiko_l2 }, taiko_l1, engine, checkpoint })
    }
}

impl SyncRpc for RpcClients {
    type L1 = ExecutionClient;
    type L2 = L2Client;
    type Protocol = TaikoL1;
    type Engine = EngineClient;
    type Checkpoint = DefaultProvider;

    fn l1(&self) -> &Self::L1 {
        &self.l1
    }

    fn l2(&self) -> &Self::L2 {
        &self.l2
    }

    fn protocol(&self) -> &Self::Protocol {
        &self.taiko_l1
    }

    fn engine(&self) -> &Self::Engine {
        &self.engine
    }

    fn checkpoint(&self) -> Option<&Self::Checkpoint> {
        self.checkpoint.as_ref()
    }
}
