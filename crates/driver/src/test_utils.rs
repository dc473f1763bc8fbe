//! In-memory L1, L2 and engine doubles for the sync tests.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use alloy::{
    consensus::{
        Header as ConsensusHeader, SignableTransaction, Transaction, TxEip1559, TxEnvelope,
    },
    contract::Result as ContractResult,
    eips::eip2718::{Decodable2718, Encodable2718},
    rpc::types::{Block, BlockTransactions, Filter, Header, Log},
    signers::{SignerSync, local::PrivateKeySigner},
    transports::{TransportErrorKind, TransportResult},
};
use alloy_primitives::{
    Address, B64, B256, Bytes, Signature, TxKind, U256, address, aliases::U24, b256, keccak256,
};
use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, ForkchoiceUpdated, PayloadId, PayloadStatus,
    PayloadStatusEnum,
};
use alloy_sol_types::{SolCall, SolEvent};
use syncer_chainio::taiko::l1::ITaikoL1::{
    BlockMetadata, BlockProposed, BlockProven, StateVariables, proposeBlockCall,
};
use syncer_primitives::{
    retries::RetryConfig,
    taiko::{
        L1Origin, payload::TaikoPayloadAttributes, progress::SyncProgress, tx_list::TxListLimits,
    },
};

use crate::{
    config::ScanConfig,
    rpc::{
        ChainReader, CheckpointReader, L1Reader, L2Engine, L2Reader, ProtocolReader, SyncRpc,
    },
    state::SyncState,
};

/// The L1 height at which the mocked protocol was deployed.
pub(crate) const GENESIS_L1_HEIGHT: u64 = 90;

/// The address of the mocked `TaikoL1` contract.
pub(crate) const TAIKO_L1: Address = address!("00000000000000000000000000000000000a11ce");

/// The address of the mocked `TaikoL2` contract.
pub(crate) const TAIKO_L2: Address = address!("1670000000000000000000000000000000010001");

/// The mocked L2 chain ID.
pub(crate) const CHAIN_ID: u64 = 167;

/// The base fee returned by the mocked `TaikoL2.getBasefee`.
pub(crate) const BASE_FEE: u64 = 1_000_000_000;

/// The gas limit of every mocked proposal.
pub(crate) const PROPOSAL_GAS_LIMIT: u32 = 15_000_000;

/// The beneficiary of every mocked proposal.
pub(crate) const BENEFICIARY: Address = address!("beefbeefbeefbeefbeefbeefbeefbeefbeefbeef");

const L1_GENESIS_TIMESTAMP: u64 = 1_000_000;
const L1_BLOCK_TIME: u64 = 12;

fn not_found(what: &str) -> alloy::transports::TransportError {
    TransportErrorKind::custom_str(&format!("{what} not found"))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

// ############################## L1 ############################## //

#[derive(Debug, Default)]
struct L1Inner {
    /// The canonical headers, indexed by number.
    headers: Vec<Header>,
    /// Changed on every reorg so that replaced blocks get new hashes.
    salt: u64,
    logs: Vec<Log>,
    /// Transaction inputs by block hash and index.
    txs: HashMap<(B256, u64), Bytes>,
}

impl L1Inner {
    fn make_header(&self, number: u64) -> Header {
        let parent_hash = match number {
            0 => B256::ZERO,
            n => self.headers[n as usize - 1].hash,
        };

        let inner = ConsensusHeader {
            number,
            parent_hash,
            timestamp: L1_GENESIS_TIMESTAMP + number * L1_BLOCK_TIME,
            nonce: B64::from(self.salt.to_be_bytes()),
            ..Default::default()
        };

        Header { hash: inner.hash_slow(), inner, ..Default::default() }
    }

    fn push(&mut self) -> Header {
        let header = self.make_header(self.headers.len() as u64);
        self.headers.push(header.clone());
        header
    }

    fn add_log(&mut self, l1_number: u64, data: alloy_primitives::LogData, tx_index: u64) {
        let header = &self.headers[l1_number as usize];
        let log_index =
            self.logs.iter().filter(|log| log.block_number == Some(l1_number)).count() as u64;

        self.logs.push(Log {
            inner: alloy_primitives::Log { address: TAIKO_L1, data },
            block_hash: Some(header.hash),
            block_number: Some(l1_number),
            block_timestamp: Some(header.timestamp),
            transaction_hash: Some(keccak256(
                [header.hash.as_slice(), &tx_index.to_be_bytes()].concat(),
            )),
            transaction_index: Some(tx_index),
            log_index: Some(log_index),
            removed: false,
        });
    }
}

/// An action run once, right after the header at `number` was fetched by number.
struct HeaderHook {
    number: u64,
    action: Box<dyn FnOnce(&MockL1) + Send>,
}

impl std::fmt::Debug for HeaderHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderHook").field("number", &self.number).finish_non_exhaustive()
    }
}

/// An L1 execution client with a canonical chain of empty blocks, the protocol logs and the
/// proposing transactions.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockL1 {
    inner: Arc<Mutex<L1Inner>>,
    hook: Arc<Mutex<Option<HeaderHook>>>,
}

impl MockL1 {
    /// A chain with the blocks `0..count`.
    pub(crate) fn with_blocks(count: u64) -> Self {
        let l1 = Self::default();
        for _ in 0..count {
            l1.push_block();
        }
        l1
    }

    /// Append a block to the chain.
    pub(crate) fn push_block(&self) -> Header {
        lock(&self.inner).push()
    }

    /// The canonical header at `number`.
    pub(crate) fn header(&self, number: u64) -> Header {
        lock(&self.inner).headers[number as usize].clone()
    }

    /// Replace every block from `number` onwards with a new one, dropping their logs.
    pub(crate) fn reorg_from(&self, number: u64) {
        let mut inner = lock(&self.inner);
        inner.salt += 1;

        for n in number..inner.headers.len() as u64 {
            let header = inner.make_header(n);
            inner.headers[n as usize] = header;
        }

        inner.logs.retain(|log| log.block_number.is_some_and(|n| n < number));
    }

    /// Run `action` once, right after the header at `number` is next fetched by number.
    pub(crate) fn after_header_fetch(
        &self,
        number: u64,
        action: impl FnOnce(&Self) + Send + 'static,
    ) {
        *lock(&self.hook) = Some(HeaderHook { number, action: Box::new(action) });
    }

    /// Propose block `id` in L1 block `l1_number`, with the default metadata.
    pub(crate) fn propose(&self, id: u64, l1_number: u64, tx_list: Bytes) {
        self.propose_with(id, l1_number, tx_list, |_| {});
    }

    /// Propose block `id` in L1 block `l1_number`. The metadata is anchored to the parent L1
    /// block and can be adjusted with `f`.
    pub(crate) fn propose_with(
        &self,
        id: u64,
        l1_number: u64,
        tx_list: Bytes,
        f: impl FnOnce(&mut BlockMetadata),
    ) {
        let mut inner = lock(&self.inner);
        let header = inner.headers[l1_number as usize].clone();
        let parent = inner.headers[l1_number as usize - 1].clone();

        let mut meta = BlockMetadata {
            id,
            timestamp: header.timestamp,
            l1Height: parent.number,
            l1Hash: parent.hash,
            mixHash: B256::from(U256::from(id)),
            txListHash: keccak256(&tx_list),
            txListByteStart: U24::ZERO,
            txListByteEnd: U24::from(tx_list.len()),
            gasLimit: PROPOSAL_GAS_LIMIT,
            beneficiary: BENEFICIARY,
            extraData: B256::ZERO,
            blobUsed: false,
        };
        f(&mut meta);

        let tx_index =
            inner.txs.keys().filter(|(block_hash, _)| *block_hash == header.hash).count() as u64;
        let input = proposeBlockCall { params: Bytes::new(), txList: tx_list }.abi_encode();
        inner.txs.insert((header.hash, tx_index), input.into());

        let event = BlockProposed { blockId: U256::from(id), meta, ..Default::default() };
        inner.add_log(l1_number, event.encode_log_data(), tx_index);
    }

    /// Emit a `BlockProven` event for block `id` in L1 block `l1_number`.
    pub(crate) fn prove(&self, id: u64, block_hash: B256, l1_number: u64) {
        let event = BlockProven { blockId: U256::from(id), blockHash: block_hash, ..Default::default() };
        lock(&self.inner).add_log(l1_number, event.encode_log_data(), 0);
    }

    /// Mark the logs of block `id` as removed.
    pub(crate) fn mark_removed(&self, id: u64) {
        let topic = B256::from(U256::from(id));
        for log in &mut lock(&self.inner).logs {
            if log.topics().get(1) == Some(&topic) {
                log.removed = true;
            }
        }
    }
}

impl ChainReader for MockL1 {
    async fn latest_header(&self) -> TransportResult<Header> {
        lock(&self.inner).headers.last().cloned().ok_or_else(|| not_found("head"))
    }

    async fn header_by_number(&self, number: u64) -> TransportResult<Option<Header>> {
        let header = lock(&self.inner).headers.get(number as usize).cloned();

        let hook = lock(&self.hook).take_if(|hook| hook.number == number);
        if let Some(hook) = hook {
            (hook.action)(self);
        }

        Ok(header)
    }

    async fn header_by_hash(&self, hash: B256) -> TransportResult<Option<Header>> {
        Ok(lock(&self.inner).headers.iter().find(|h| h.hash == hash).cloned())
    }

    async fn logs(&self, filter: &Filter) -> TransportResult<Vec<Log>> {
        let from = filter.get_from_block().unwrap_or_default();
        let to = filter.get_to_block().unwrap_or(u64::MAX);

        let logs = lock(&self.inner)
            .logs
            .iter()
            .filter(|log| log.block_number.is_some_and(|n| n >= from && n <= to))
            .filter(|log| filter.address.matches(&log.address()))
            .filter(|log| {
                filter.topics.iter().enumerate().all(|(i, topic)| {
                    topic.is_empty() || log.topics().get(i).is_some_and(|t| topic.matches(t))
                })
            })
            .cloned()
            .collect();

        Ok(logs)
    }
}

impl L1Reader for MockL1 {
    async fn transaction_input(&self, block_hash: B256, index: u64) -> TransportResult<Option<Bytes>> {
        Ok(lock(&self.inner).txs.get(&(block_hash, index)).cloned())
    }
}

// ############################## L2 ############################## //

#[derive(Debug, Clone)]
struct L2Block {
    header: Header,
    txs: Vec<Bytes>,
}

impl L2Block {
    fn from_payload(payload: &ExecutionPayloadV1) -> Self {
        let inner = ConsensusHeader {
            parent_hash: payload.parent_hash,
            beneficiary: payload.fee_recipient,
            number: payload.block_number,
            gas_limit: payload.gas_limit,
            gas_used: payload.gas_used,
            timestamp: payload.timestamp,
            extra_data: payload.extra_data.clone(),
            mix_hash: payload.prev_randao,
            base_fee_per_gas: Some(payload.base_fee_per_gas.saturating_to()),
            ..Default::default()
        };

        Self {
            header: Header { hash: payload.block_hash, inner, ..Default::default() },
            txs: payload.transactions.clone(),
        }
    }
}

#[derive(Debug)]
struct L2Inner {
    /// The canonical chain, indexed by number.
    canonical: Vec<B256>,
    /// Every known block, canonical or not.
    blocks: HashMap<B256, L2Block>,
    origins: BTreeMap<u64, L1Origin>,
    head_origin: Option<u64>,
    /// The L1 origins of built blocks, written once they become canonical.
    built_origins: HashMap<B256, L1Origin>,
    pending: HashMap<PayloadId, ExecutionPayloadV1>,
    next_payload_id: u64,
    sync_progress: Option<SyncProgress>,
    peers: u64,
}

impl L2Inner {
    fn head(&self) -> &L2Block {
        let hash = self.canonical.last().expect("genesis is always canonical");
        &self.blocks[hash]
    }

    fn insert(&mut self, block: L2Block) {
        self.blocks.insert(block.header.hash, block);
    }

    /// Make `head` and its ancestors canonical.
    fn set_head(&mut self, head: B256) {
        let mut chain = Vec::new();
        let mut hash = head;
        while let Some(block) = self.blocks.get(&hash) {
            chain.push(hash);
            if block.header.number == 0 {
                break;
            }
            hash = block.header.parent_hash;
        }
        chain.reverse();
        self.canonical = chain;

        for hash in self.canonical.clone() {
            if let Some(mut origin) = self.built_origins.get(&hash).cloned() {
                origin.l2_block_hash = hash;
                let id = origin.id();
                self.origins.insert(id, origin);
                self.head_origin = Some(id);
            }
        }
    }
}

/// A taiko-geth node: the L2 execution client and its Engine API.
///
/// Built blocks get a deterministic hash derived from their parent, transactions and timestamp,
/// so building the same block twice yields the same hash.
#[derive(Debug, Clone)]
pub(crate) struct MockL2 {
    inner: Arc<Mutex<L2Inner>>,
}

impl Default for MockL2 {
    fn default() -> Self {
        Self::new()
    }
}

impl MockL2 {
    /// A chain with only the genesis block.
    pub(crate) fn new() -> Self {
        let inner = ConsensusHeader::default();
        let genesis = L2Block {
            header: Header { hash: keccak256("genesis"), inner, ..Default::default() },
            txs: Vec::new(),
        };
        let hash = genesis.header.hash;

        Self {
            inner: Arc::new(Mutex::new(L2Inner {
                canonical: vec![hash],
                blocks: HashMap::from([(hash, genesis)]),
                origins: BTreeMap::new(),
                head_origin: None,
                built_origins: HashMap::new(),
                pending: HashMap::new(),
                next_payload_id: 0,
                sync_progress: None,
                peers: 0,
            })),
        }
    }

    /// Append an empty block on top of the head. Returns its number and hash.
    pub(crate) fn push_block(&self) -> (u64, B256) {
        let mut inner = lock(&self.inner);
        let parent = inner.head().header.clone();

        let number = parent.number + 1;
        let inner_header = ConsensusHeader {
            number,
            parent_hash: parent.hash,
            timestamp: parent.timestamp + 1,
            ..Default::default()
        };
        let hash = keccak256([parent.hash.as_slice(), b"pushed"].concat());
        inner.insert(L2Block {
            header: Header { hash, inner: inner_header, ..Default::default() },
            txs: Vec::new(),
        });
        inner.canonical.push(hash);

        (number, hash)
    }

    /// The canonical header at `number`.
    pub(crate) fn header(&self, number: u64) -> Header {
        let inner = lock(&self.inner);
        inner.blocks[&inner.canonical[number as usize]].header.clone()
    }

    /// The canonical head.
    pub(crate) fn head(&self) -> Header {
        lock(&self.inner).head().header.clone()
    }

    /// The decoded transactions of the canonical block at `number`.
    pub(crate) fn block_txs(&self, number: u64) -> Vec<TxEnvelope> {
        let inner = lock(&self.inner);
        let block = &inner.blocks[&inner.canonical[number as usize]];
        block
            .txs
            .iter()
            .map(|raw| TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap())
            .collect()
    }

    /// The stored L1 origin of block `id`.
    pub(crate) fn origin(&self, id: u64) -> Option<L1Origin> {
        lock(&self.inner).origins.get(&id).cloned()
    }

    pub(crate) fn set_l1_origin(&self, origin: L1Origin) {
        let mut inner = lock(&self.inner);
        let id = origin.id();
        inner.origins.insert(id, origin);
        inner.head_origin = Some(id);
    }

    pub(crate) fn set_sync_progress(&self, progress: Option<SyncProgress>) {
        lock(&self.inner).sync_progress = progress;
    }

    pub(crate) fn set_peers(&self, peers: u64) {
        lock(&self.inner).peers = peers;
    }

    /// Overwrite the gas used by the canonical block at `number`, keeping its hash.
    pub(crate) fn set_gas_used(&self, number: u64, gas_used: u64) {
        let mut inner = lock(&self.inner);
        let hash = inner.canonical[number as usize];
        if let Some(block) = inner.blocks.get_mut(&hash) {
            block.header.inner.gas_used = gas_used;
        }
    }

    /// Replace the canonical block at `number` with a block of a different hash.
    pub(crate) fn corrupt(&self, number: u64) {
        let mut inner = lock(&self.inner);
        let mut block = inner.blocks[&inner.canonical[number as usize]].clone();
        block.header.hash = keccak256([block.header.hash.as_slice(), b"corrupt"].concat());
        inner.canonical[number as usize] = block.header.hash;
        inner.insert(block);
    }

    /// Import the canonical chain of `remote`, as a finished beacon sync would.
    pub(crate) fn finish_beacon_sync(&self, remote: &Self) {
        let remote = lock(&remote.inner);
        let mut inner = lock(&self.inner);

        for hash in &remote.canonical {
            inner.insert(remote.blocks[hash].clone());
        }
        inner.canonical = remote.canonical.clone();
        inner.sync_progress = None;
    }

    fn block_by_hash(&self, hash: B256) -> Option<L2Block> {
        lock(&self.inner).blocks.get(&hash).cloned()
    }
}

impl ChainReader for MockL2 {
    async fn latest_header(&self) -> TransportResult<Header> {
        Ok(self.head())
    }

    async fn header_by_number(&self, number: u64) -> TransportResult<Option<Header>> {
        let inner = lock(&self.inner);
        Ok(inner.canonical.get(number as usize).map(|hash| inner.blocks[hash].header.clone()))
    }

    async fn header_by_hash(&self, hash: B256) -> TransportResult<Option<Header>> {
        Ok(self.block_by_hash(hash).map(|block| block.header))
    }

    async fn logs(&self, _filter: &Filter) -> TransportResult<Vec<Log>> {
        Ok(Vec::new())
    }
}

impl L2Reader for MockL2 {
    async fn l1_origin_by_id(&self, block_id: u64) -> TransportResult<Option<L1Origin>> {
        Ok(self.origin(block_id))
    }

    async fn head_l1_origin(&self) -> TransportResult<Option<L1Origin>> {
        let inner = lock(&self.inner);
        Ok(inner.head_origin.and_then(|id| inner.origins.get(&id).cloned()))
    }

    async fn sync_progress(&self) -> TransportResult<Option<SyncProgress>> {
        Ok(lock(&self.inner).sync_progress)
    }

    async fn peer_count(&self) -> TransportResult<u64> {
        Ok(lock(&self.inner).peers)
    }

    /// Every block holds exactly one anchor, so the golden touch nonce is the block number.
    async fn nonce_at(&self, _address: Address, block_hash: B256) -> TransportResult<u64> {
        self.block_by_hash(block_hash).map(|block| block.header.number).ok_or_else(|| not_found("block"))
    }

    async fn anchor_base_fee(
        &self,
        _parent_hash: B256,
        _time_since_parent: u64,
        _parent_gas_used: u32,
    ) -> ContractResult<U256> {
        Ok(U256::from(BASE_FEE))
    }
}

impl L2Engine for MockL2 {
    async fn fork_choice_updated(
        &self,
        state: ForkchoiceState,
        attributes: Option<TaikoPayloadAttributes>,
    ) -> TransportResult<ForkchoiceUpdated> {
        let mut inner = lock(&self.inner);

        let Some(parent) = inner.blocks.get(&state.head_block_hash).map(|b| b.header.clone()) else {
            return Ok(ForkchoiceUpdated::from_status(PayloadStatusEnum::Syncing));
        };

        let Some(attrs) = attributes else {
            inner.set_head(parent.hash);
            return Ok(ForkchoiceUpdated::from_status(PayloadStatusEnum::Valid));
        };

        let meta = &attrs.block_metadata;
        let Ok(txs) = alloy_rlp::decode_exact::<Vec<TxEnvelope>>(&meta.tx_list) else {
            let status = PayloadStatusEnum::Invalid { validation_error: "bad tx list".into() };
            return Ok(ForkchoiceUpdated::from_status(status));
        };

        let timestamp = meta.timestamp.to::<u64>();
        let block_hash = keccak256(
            [parent.hash.as_slice(), keccak256(&meta.tx_list).as_slice(), &timestamp.to_be_bytes()]
                .concat(),
        );

        let payload = ExecutionPayloadV1 {
            parent_hash: parent.hash,
            fee_recipient: meta.beneficiary,
            state_root: B256::ZERO,
            receipts_root: B256::ZERO,
            logs_bloom: Default::default(),
            prev_randao: meta.mix_hash,
            block_number: parent.number + 1,
            gas_limit: meta.gas_limit.to(),
            gas_used: txs.iter().map(|tx| tx.gas_limit()).sum(),
            timestamp,
            extra_data: meta.extra_data.clone(),
            base_fee_per_gas: attrs.base_fee_per_gas,
            block_hash,
            transactions: txs.iter().map(|tx| tx.encoded_2718().into()).collect(),
        };

        inner.next_payload_id += 1;
        let payload_id = PayloadId::new(inner.next_payload_id.to_be_bytes());
        inner.pending.insert(payload_id, payload);
        inner.built_origins.insert(block_hash, attrs.l1_origin);

        Ok(ForkchoiceUpdated::from_status(PayloadStatusEnum::Valid).with_payload_id(payload_id))
    }

    async fn get_payload(&self, payload_id: PayloadId) -> TransportResult<ExecutionPayloadV1> {
        lock(&self.inner).pending.remove(&payload_id).ok_or_else(|| not_found("payload"))
    }

    async fn new_payload(&self, payload: ExecutionPayloadV1) -> TransportResult<PayloadStatus> {
        let mut inner = lock(&self.inner);

        if !inner.blocks.contains_key(&payload.parent_hash) {
            return Ok(PayloadStatus::from_status(PayloadStatusEnum::Syncing));
        }

        inner.insert(L2Block::from_payload(&payload));
        Ok(PayloadStatus::new(PayloadStatusEnum::Valid, Some(payload.block_hash)))
    }
}

// ############################## PROTOCOL ############################## //

#[derive(Debug, Clone, Default)]
struct ProtocolInner {
    num_blocks: u64,
    verified_id: u64,
    block_hashes: HashMap<u64, B256>,
}

/// The `TaikoL1` contract state.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockProtocol {
    inner: Arc<Mutex<ProtocolInner>>,
}

impl MockProtocol {
    /// Set the amount of proposed blocks and the latest verified block.
    pub(crate) fn set_state(&self, num_blocks: u64, verified_id: u64, verified_hash: B256) {
        let mut inner = lock(&self.inner);
        inner.num_blocks = num_blocks;
        inner.verified_id = verified_id;
        inner.block_hashes.insert(verified_id, verified_hash);
    }
}

impl ProtocolReader for MockProtocol {
    fn address(&self) -> Address {
        TAIKO_L1
    }

    async fn state_variables(&self) -> ContractResult<StateVariables> {
        let inner = lock(&self.inner);
        Ok(StateVariables {
            genesisHeight: GENESIS_L1_HEIGHT,
            genesisTimestamp: L1_GENESIS_TIMESTAMP + GENESIS_L1_HEIGHT * L1_BLOCK_TIME,
            numBlocks: inner.num_blocks,
            lastVerifiedBlockId: inner.verified_id,
        })
    }

    async fn cross_chain_block_hash(&self, block_id: u64) -> ContractResult<B256> {
        Ok(lock(&self.inner).block_hashes.get(&block_id).copied().unwrap_or_default())
    }
}

// ############################## CHECKPOINT ############################## //

/// A synced L2 node serving the blocks of another [`MockL2`].
#[derive(Debug, Clone)]
pub(crate) struct MockCheckpoint(pub(crate) MockL2);

impl CheckpointReader for MockCheckpoint {
    async fn block_by_hash(&self, hash: B256) -> TransportResult<Option<Block>> {
        let block = self.0.block_by_hash(hash).map(|block| Block {
            header: block.header,
            uncles: vec![],
            transactions: BlockTransactions::Full(vec![]),
            withdrawals: None,
        });
        Ok(block)
    }
}

// ############################## RPC ############################## //

/// The full set of mocked connections.
#[derive(Debug, Clone)]
pub(crate) struct MockRpc {
    pub(crate) l1: MockL1,
    pub(crate) l2: MockL2,
    pub(crate) protocol: MockProtocol,
    pub(crate) checkpoint: Option<MockCheckpoint>,
}

impl MockRpc {
    /// An L1 chain 30 blocks past the protocol genesis, and an L2 chain at genesis.
    pub(crate) fn new() -> Self {
        let l2 = MockL2::new();
        let protocol = MockProtocol::default();
        protocol.set_state(1, 0, l2.head().hash);

        Self { l1: MockL1::with_blocks(GENESIS_L1_HEIGHT + 31), l2, protocol, checkpoint: None }
    }

    /// Serve the chain of `remote` as the checkpoint node.
    pub(crate) fn with_checkpoint(mut self, remote: MockL2) -> Self {
        self.checkpoint = Some(MockCheckpoint(remote));
        self
    }

    /// The scan settings used by the tests.
    pub(crate) const fn scan_config() -> ScanConfig {
        ScanConfig {
            epoch_size: 8,
            reorg_rewind_depth: 4,
            retry: RetryConfig {
                initial_ms: 1,
                max_delay: Duration::from_millis(5),
                max_retries: 3,
            },
        }
    }

    /// Initialize a [`SyncState`] from the mocked chains.
    pub(crate) async fn state(&self) -> SyncState<Self> {
        SyncState::new(Arc::new(self.clone()), Self::scan_config()).await.unwrap()
    }
}

impl SyncRpc for MockRpc {
    type L1 = MockL1;
    type L2 = MockL2;
    type Protocol = MockProtocol;
    type Engine = MockL2;
    type Checkpoint = MockCheckpoint;

    fn l1(&self) -> &Self::L1 {
        &self.l1
    }

    fn l2(&self) -> &Self::L2 {
        &self.l2
    }

    fn protocol(&self) -> &Self::Protocol {
        &self.protocol
    }

    fn engine(&self) -> &Self::Engine {
        &self.l2
    }

    fn checkpoint(&self) -> Option<&Self::Checkpoint> {
        self.checkpoint.as_ref()
    }
}

// ############################## TRANSACTIONS ############################## //

/// The limits the mocked protocol validates transaction lists against.
pub(crate) const fn tx_list_limits() -> TxListLimits {
    TxListLimits {
        max_bytes_per_tx_list: 120_000,
        max_transactions_per_block: 10,
        block_max_gas_limit: PROPOSAL_GAS_LIMIT as u64,
        min_tx_gas_limit: 21_000,
    }
}

fn dev_signer() -> PrivateKeySigner {
    PrivateKeySigner::from_bytes(&b256!(
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
    ))
    .unwrap()
}

fn transfer(nonce: u64, gas_limit: u64) -> TxEip1559 {
    TxEip1559 {
        chain_id: CHAIN_ID,
        nonce,
        gas_limit,
        max_fee_per_gas: 2 * BASE_FEE as u128,
        max_priority_fee_per_gas: 1,
        to: TxKind::Call(Address::repeat_byte(0x11)),
        value: U256::from(1),
        ..Default::default()
    }
}

/// A transfer signed by a well-known dev key.
pub(crate) fn signed_tx(nonce: u64, gas_limit: u64) -> TxEnvelope {
    let tx = transfer(nonce, gas_limit);
    let sig = dev_signer().sign_hash_sync(&tx.signature_hash()).unwrap();
    TxEnvelope::Eip1559(tx.into_signed(sig))
}

/// A transfer carrying a zero signature, from which no sender can be recovered.
pub(crate) fn tx_with_invalid_sig(nonce: u64) -> TxEnvelope {
    let sig = Signature::new(U256::ZERO, U256::ZERO, false);
    TxEnvelope::Eip1559(transfer(nonce, 21_000).into_signed(sig))
}

/// RLP-encode a transaction list as it is posted in calldata.
pub(crate) fn encode_tx_list(txs: &[TxEnvelope]) -> Bytes {
    alloy_rlp::encode(txs.to_vec()).into()
}
