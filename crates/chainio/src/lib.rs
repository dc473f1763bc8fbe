#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Chain I/O module to interact with the Taiko protocol contracts.

use alloy::{
    providers::{ProviderBuilder, RootProvider, fillers::FillProvider, utils::JoinedRecommendedFillers},
    rpc::client::ClientBuilder,
};
use syncer_primitives::retries::default_retry_layer;
use url::Url;

/// Taiko contract bindings
pub mod taiko;

/// Alias to the default provider with all recommended fillers (read-only).
pub type DefaultProvider = FillProvider<JoinedRecommendedFillers, RootProvider>;

/// Create a read-only HTTP provider with the default retry layer.
pub fn new_default_provider<U: Into<Url>>(el_client_url: U) -> DefaultProvider {
    let client = ClientBuilder::default().layer(default_retry_layer()).http(el_client_url.into());
    ProviderBuilder::new().connect_client(client)
}
