use std::{borrow::Cow, time::Duration};

use alloy::{
    providers::{Provider, RootProvider},
    rpc::client::RpcClient,
    transports::{
        RpcError, TransportErrorKind, TransportResult,
        http::{Http, reqwest::Url},
    },
};
use alloy_json_rpc::{RpcRecv, RpcSend};
use alloy_primitives::Bytes;
use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, ForkchoiceUpdated, JwtSecret, PayloadId, PayloadStatus,
};
use alloy_transport_http::{
    AuthLayer, HyperClient,
    hyper_util::{client::legacy::Client, rt::TokioExecutor},
};
use derive_more::derive::Deref;
use http_body_util::Full;
use syncer_primitives::{retries::is_connection_refused, taiko::payload::TaikoPayloadAttributes};
use tokio_retry::{RetryIf, strategy::ExponentialBackoff};
use tower::ServiceBuilder;

const FORKCHOICE_UPDATED_V1: &str = "engine_forkchoiceUpdatedV1";
const GET_PAYLOAD_V1: &str = "engine_getPayloadV1";
const NEW_PAYLOAD_V1: &str = "engine_newPayloadV1";

/// The [`EngineClient`] is responsible for interacting with the engine API via HTTP.
/// The inner transport uses a JWT [`AuthLayer`] to authenticate requests.
#[derive(Debug, Clone, Deref)]
pub struct EngineClient {
    inner: RootProvider,
}

impl EngineClient {
    /// Creates a new [`EngineClient`] from the provided [Url] and [`JwtSecret`].
    pub fn new(url: Url, jwt: JwtSecret) -> Self {
        let hyper_client = Client::builder(TokioExecutor::new()).build_http::<Full<Bytes>>();

        let auth_layer = AuthLayer::new(jwt);
        let service = ServiceBuilder::new().layer(auth_layer).service(hyper_client);

        let layer_transport = HyperClient::<Full<Bytes>, _>::with_service(service);
        let http_hyper = Http::with_client(layer_transport, url);
        let rpc_client = RpcClient::new(http_hyper, true);
        let inner = RootProvider::new(rpc_client);

        Self { inner }
    }

    /// Call `engine_forkchoiceUpdatedV1`. When `attributes` are provided, taiko-geth starts
    /// building a block from the Taiko block metadata and returns its payload ID.
    pub async fn fork_choice_updated_v1(
        &self,
        state: ForkchoiceState,
        attributes: Option<TaikoPayloadAttributes>,
    ) -> TransportResult<ForkchoiceUpdated> {
        self.request(FORKCHOICE_UPDATED_V1, (state, attributes)).await
    }

    /// Call `engine_getPayloadV1` to fetch the block built for the given payload ID.
    pub async fn get_payload_v1(&self, payload_id: PayloadId) -> TransportResult<ExecutionPayloadV1> {
        self.request(GET_PAYLOAD_V1, (payload_id,)).await
    }

    /// Call `engine_newPayloadV1` to import the given payload.
    pub async fn new_payload_v1(&self, payload: ExecutionPayloadV1) -> TransportResult<PayloadStatus> {
        self.request(NEW_PAYLOAD_V1, (payload,)).await
    }

    /// Send an authenticated request, retrying transient failures with an exponential backoff.
    async fn request<P, R>(&self, method: &'static str, params: P) -> TransportResult<R>
    where
        P: RpcSend + Clone,
        R: RpcRecv,
    {
        let retry_strategy =
            ExponentialBackoff::from_millis(10).max_delay(Duration::from_millis(1_000)).take(10);

        let client = self.inner.client();

        // NOTE: the retry layer doesn't compose with the auth layer, so retries are handled
        // manually here.
        RetryIf::spawn(
            retry_strategy,
            || async { client.request::<P, R>(Cow::Borrowed(method), params.clone()).await },
            |res: &RpcError<TransportErrorKind>| {
                if let RpcError::Transport(e) = res {
                    e.is_retry_err() || is_connection_refused(e)
                } else {
                    false
                }
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;
    use alloy_rpc_types_engine::PayloadStatusEnum;

    use super::*;

    /// This test is ignored because it requires a running taiko-geth node with the JWT secret
    /// at `./jwt.hex`.
    #[ignore]
    #[tokio::test]
    async fn test_forkchoice_to_unknown_head() {
        let jwt = JwtSecret::from_file("./jwt.hex".as_ref()).unwrap();
        let client = EngineClient::new(Url::parse("http://localhost:28551").unwrap(), jwt);

        let state = ForkchoiceState {
            head_block_hash: B256::repeat_byte(0x42),
            safe_block_hash: B256::ZERO,
            finalized_block_hash: B256::ZERO,
        };

        let res = client.fork_choice_updated_v1(state, None).await.unwrap();
        assert_eq!(res.payload_status.status, PayloadStatusEnum::Syncing);
    }
}
