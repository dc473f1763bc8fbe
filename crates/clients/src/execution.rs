use std::{any::type_name, marker::PhantomData, time::Duration};

use alloy::{
    eips::eip2718::Encodable2718,
    network::Ethereum,
    providers::{Provider, ProviderBuilder, WsConnect},
    rpc::{
        client::{ClientBuilder, RpcClient},
        types::{Block, BlockNumberOrTag, Filter, Header, Log, Transaction},
    },
    transports::{TransportErrorKind, TransportResult},
};
use alloy_primitives::{Address, B256, Bytes, U64, U256};
use alloy_rpc_types_engine::ExecutionPayloadV1;
use alloy_sol_types::SolEvent;
use derive_more::derive::{Deref, DerefMut};
use syncer_chainio::DefaultProvider;
use syncer_primitives::{
    retries::{RetryConfig, default_retry_layer},
    taiko::{
        L1Origin,
        constants::NOT_FOUND_ERROR,
        progress::{SyncProgress, SyncingResponse},
    },
};
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::{debug, error, warn};
use url::Url;

/// The backoff applied between subscription attempts. It restarts from the beginning once a
/// subscription is established.
const RESUBSCRIBE_BACKOFF: RetryConfig =
    RetryConfig { initial_ms: 2, max_delay: Duration::from_secs(30), max_retries: usize::MAX };

/// An HTTP-based JSON-RPC execution client provider, with a WS connection for subscriptions.
///
/// This struct is a wrapper over an inner [`DefaultProvider`] and extends it with
/// methods that are relevant to the syncer.
#[derive(Clone, Debug, Deref, DerefMut)]
pub struct ExecutionClient<CHAIN = Ethereum> {
    /// The custom RPC client used for raw requests.
    rpc: RpcClient,
    /// The inner provider that implements all the JSON-RPC methods, that can be
    /// easily used via dereferencing this struct.
    #[deref]
    #[deref_mut]
    inner: DefaultProvider,
    /// The provider connected to the WebSocket endpoint of the execution client.
    ws_provider: DefaultProvider,
    /// The chain type.
    _chain: PhantomData<CHAIN>,
}

/// The chain type for Taiko nodes.
///
/// This is useful to define methods that are available only on taiko-geth clients.
#[derive(Clone, Copy, Debug, Default)]
pub struct Taiko;

/// The type alias for a Taiko execution client.
pub type TaikoExecutionClient = ExecutionClient<Taiko>;

impl TaikoExecutionClient {
    /// TAIKO-SPECIFIC: returns the L1 origin of the block with the given ID, or `None` if the
    /// node has no record of it.
    ///
    /// Ref: <https://github.com/taikoxyz/taiko-geth/blob/v0.1.0/eth/taiko_api_backend.go#L50>
    pub async fn l1_origin_by_id(&self, block_id: u64) -> TransportResult<Option<L1Origin>> {
        not_found_to_none(self.rpc.request("taiko_l1OriginByID", (U256::from(block_id),)).await)
    }

    /// TAIKO-SPECIFIC: returns the L1 origin of the last L2 block inserted from an L1
    /// proposal, or `None` if there is none yet.
    ///
    /// Ref: <https://github.com/taikoxyz/taiko-geth/blob/v0.1.0/eth/taiko_api_backend.go#L27>
    pub async fn head_l1_origin(&self) -> TransportResult<Option<L1Origin>> {
        not_found_to_none(self.rpc.request("taiko_headL1Origin", ()).await)
    }
}

/// taiko-geth reports missing L1 origins as an error rather than `null`.
fn not_found_to_none<T>(res: TransportResult<T>) -> TransportResult<Option<T>> {
    match res {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.to_string().contains(NOT_FOUND_ERROR) => Ok(None),
        Err(e) => Err(e),
    }
}

impl<CHAIN> ExecutionClient<CHAIN> {
    /// Create a new [`ExecutionClient`] with the given HTTP and WS URLs.
    pub async fn new<U: Into<Url>>(http_url: U, ws_url: U) -> TransportResult<Self> {
        let rpc = ClientBuilder::default().layer(default_retry_layer()).http(http_url.into());
        let inner = ProviderBuilder::new().connect_client(rpc.clone());

        let ws_client = ClientBuilder::default()
            .layer(default_retry_layer())
            .ws(WsConnect::new(ws_url.into()))
            .await?;
        let ws_provider = ProviderBuilder::new().connect_client(ws_client);

        Ok(Self { rpc, inner, ws_provider, _chain: PhantomData })
    }

    /// Get the header of the block with the given number, or `None` if it doesn't exist.
    /// If `block_number` is `None`, the latest header is returned.
    pub async fn header_by_number(&self, block_number: Option<u64>) -> TransportResult<Option<Header>> {
        let tag = block_number.map_or(BlockNumberOrTag::Latest, BlockNumberOrTag::Number);

        self.rpc.request("eth_getHeaderByNumber", (tag,)).await
    }

    /// Get the latest header.
    pub async fn latest_header(&self) -> TransportResult<Header> {
        self.header_by_number(None)
            .await?
            .ok_or_else(|| TransportErrorKind::custom_str("latest header not found"))
    }

    /// Get the header of the block with the given hash, or `None` if it is unknown.
    pub async fn header_by_hash(&self, hash: B256) -> TransportResult<Option<Header>> {
        self.rpc.request("eth_getHeaderByHash", (hash,)).await
    }

    /// Get the input of the transaction at `index` in the block with the given hash.
    pub async fn transaction_input(
        &self,
        block_hash: B256,
        index: u64,
    ) -> TransportResult<Option<Bytes>> {
        let tx: Option<Transaction> = self
            .rpc
            .request("eth_getTransactionByBlockHashAndIndex", (block_hash, U64::from(index)))
            .await?;

        Ok(tx.map(|tx| alloy::consensus::Transaction::input(&tx).clone()))
    }

    /// Get the nonce of the given account at the state of the block with the given hash.
    pub async fn nonce_at(&self, address: Address, block_hash: B256) -> TransportResult<u64> {
        self.inner.get_transaction_count(address).block_id(block_hash.into()).await
    }

    /// Returns the `eth_syncing` progress, or `None` if the node is not syncing.
    pub async fn sync_progress(&self) -> TransportResult<Option<SyncProgress>> {
        let res: SyncingResponse = self.rpc.request("eth_syncing", ()).await?;
        Ok(res.into_progress())
    }

    /// Returns the number of peers connected to the node.
    pub async fn peer_count(&self) -> TransportResult<u64> {
        let count: U64 = self.rpc.request("net_peerCount", ()).await?;
        Ok(count.to())
    }

    /// Spawn a background task that subscribes to new headers and keeps resubscribing with an
    /// exponential backoff when the subscription drops. Returns the stream of headers and the
    /// handle of the task.
    pub fn subscribe_headers(&self) -> (ReceiverStream<Header>, JoinHandle<()>) {
        let ws = self.ws_provider.clone();
        let (header_tx, header_rx) = mpsc::channel(64);

        let handle = tokio::spawn(async move {
            let mut backoff = RESUBSCRIBE_BACKOFF.strategy();
            loop {
                let mut sub = match ws.subscribe_blocks().await {
                    Ok(sub) => sub,
                    Err(err) => {
                        let delay = backoff.next().unwrap_or(RESUBSCRIBE_BACKOFF.max_delay);
                        error!(?err, ?delay, "Failed to subscribe to new headers");
                        sleep(delay).await;
                        continue;
                    }
                };

                backoff = RESUBSCRIBE_BACKOFF.strategy();
                debug!("Subscribed to new headers");

                while let Ok(header) = sub.recv().await {
                    if header_tx.send(header).await.is_err() {
                        warn!("Header receiver dropped, stopping subscription");
                        return;
                    }
                }

                warn!("Subscription to new headers closed, retrying...");
            }
        });

        (ReceiverStream::new(header_rx), handle)
    }

    /// Subscribe to new events based on a filter.
    ///
    /// This function will spawn a background task that will handle the subscription and
    /// dispatch events to the returned receiver stream, resubscribing when it drops.
    pub fn subscribe_events(&self, filter: Filter) -> (ReceiverStream<Log>, JoinHandle<()>) {
        let ws = self.ws_provider.clone();
        let (event_tx, event_rx) = mpsc::channel(64);

        let handle = tokio::spawn(async move {
            let mut backoff = RESUBSCRIBE_BACKOFF.strategy();
            loop {
                let mut sub = match ws.subscribe_logs(&filter).await {
                    Ok(sub) => sub,
                    Err(err) => {
                        let delay = backoff.next().unwrap_or(RESUBSCRIBE_BACKOFF.max_delay);
                        error!(?err, ?delay, "Failed to subscribe to new events");
                        sleep(delay).await;
                        continue;
                    }
                };

                backoff = RESUBSCRIBE_BACKOFF.strategy();
                debug!(address = ?filter.address, topic = ?filter.topics.first(), "Subscribed to new events");

                while let Ok(log) = sub.recv().await {
                    if event_tx.send(log).await.is_err() {
                        warn!("Event receiver dropped, stopping subscription");
                        return;
                    }
                }

                warn!("Subscription to new events closed, retrying...");
            }
        });

        (ReceiverStream::new(event_rx), handle)
    }

    /// Subscribe to log events of the given type.
    ///
    /// Returns a stream of the raw log and the decoded event data, alongside the handle of the
    /// subscription task. Logs that fail to decode are skipped.
    pub fn subscribe_log_event<T: SolEvent + Send + 'static>(
        &self,
        filter: Filter,
    ) -> (ReceiverStream<(Log, T)>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(64);

        let (mut stream, sub_handle) = self.subscribe_events(filter);

        let handle = tokio::spawn(async move {
            let event_name = type_name::<T>();
            while let Some(event) = stream.next().await {
                match event.log_decode::<T>() {
                    Ok(decoded_log) => {
                        let data = decoded_log.into_inner().data;
                        if tx.send((event, data)).await.is_err() {
                            warn!("Receiver of {event_name} events dropped");
                            break;
                        }
                    }
                    Err(e) => {
                        let topic0 = event.topic0();
                        error!(?topic0, ?e, "Error while decoding {event_name} event");
                    }
                }
            }

            sub_handle.abort();
        });

        (ReceiverStream::new(rx), handle)
    }
}

/// Convert a full RPC block into an [`ExecutionPayloadV1`], as expected by `engine_newPayloadV1`.
///
/// Transactions are only included if the block was fetched with full transactions.
pub fn block_to_payload_v1(block: Block) -> ExecutionPayloadV1 {
    let header = &block.header;

    let transactions = block
        .transactions
        .txns()
        .map(|tx| Bytes::from(tx.inner.inner().encoded_2718()))
        .collect();

    ExecutionPayloadV1 {
        parent_hash: header.parent_hash,
        fee_recipient: header.beneficiary,
        state_root: header.state_root,
        receipts_root: header.receipts_root,
        logs_bloom: header.logs_bloom,
        prev_randao: header.mix_hash,
        block_number: header.number,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        timestamp: header.timestamp,
        extra_data: header.extra_data.clone(),
        base_fee_per_gas: U256::from(header.base_fee_per_gas.unwrap_or_default()),
        block_hash: header.hash,
        transactions,
    }
}
