use alloy::primitives::Address;
use alloy_rpc_types_engine::JwtSecret;
use clap::Parser;
use url::Url;

/// L1-related configuration options
#[derive(Debug, Clone, Parser)]
pub struct L1Opts {
    /// The URL of the L1 execution client HTTP connection
    #[clap(long = "l1.el-url", env = "SYNCER_L1_EXECUTION_URL", id = "l1-el-url")]
    pub el_url: Url,
    /// The URL of the L1 execution client WebSocket connection
    #[clap(long = "l1.el-ws-url", env = "SYNCER_L1_EXECUTION_WS_URL", id = "l1-el-ws-url")]
    pub el_ws_url: Url,
}

/// L2-related configuration options
#[derive(Debug, Clone, Parser)]
pub struct L2Opts {
    /// The URL of the L2 execution client (taiko-geth) HTTP connection
    #[clap(long = "l2.el-url", env = "SYNCER_L2_EXECUTION_URL", id = "l2-el-url")]
    pub el_url: Url,
    /// The URL of the L2 execution client (taiko-geth) WebSocket connection
    #[clap(long = "l2.el-ws-url", env = "SYNCER_L2_EXECUTION_WS_URL", id = "l2-el-ws-url")]
    pub el_ws_url: Url,
    /// The URL of the L2 engine client (taiko-geth) HTTP connection
    #[clap(long = "l2.engine-url", env = "SYNCER_L2_ENGINE_URL")]
    pub engine_url: Url,
    /// The JWT secret to communicate with the L2 engine client
    #[clap(long = "l2.jwt-secret", env = "SYNCER_L2_JWT_SECRET")]
    pub jwt_secret: JwtSecret,
    /// The HTTP URL of a synced L2 node to fetch verified blocks from when beacon syncing
    #[clap(long = "p2p.checkpoint-url", env = "SYNCER_P2P_CHECKPOINT_URL")]
    pub checkpoint_url: Option<Url>,
}

/// The contract addresses required to run the syncer.
#[derive(Debug, Clone, Parser)]
pub struct ContractAddresses {
    /// The address of the L1 `TaikoL1.sol`
    #[clap(long = "contracts.taiko-l1", env = "SYNCER_TAIKO_L1")]
    pub taiko_l1: Address,
    /// The address of the L2 `TaikoL2.sol`
    #[clap(long = "contracts.taiko-l2", env = "SYNCER_TAIKO_L2")]
    pub taiko_l2: Address,
}
