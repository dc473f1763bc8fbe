#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Taiko L2 syncer driver
//!
//! The driver keeps a Taiko L2 execution engine in sync with the L1 protocol contract:
//! - Replaying the blocks proposed on L1 through the Engine API
//! - Beacon syncing the engine to the latest verified block when it is far behind

/// The main driver module with the core event loop.
mod driver;
pub use driver::{Driver, DriverError};

/// The driver configuration.
mod config;
pub use config::RuntimeConfigError;

/// The chain state shared by the sync components.
mod state;
pub use state::StateError;

/// Sync errors.
mod error;

/// Chain iterators that scan L1 in batches, with reorg and retry handling.
mod iterator;

/// The metrics for the driver.
mod metrics;

/// The RPC seams between the sync components and the nodes.
mod rpc;

/// Catching up with the latest verified block through the engine P2P sync.
mod beaconsync;

/// Inserting L2 blocks from the transaction lists proposed on L1.
mod calldata;

/// Choosing between beacon sync and calldata sync on every cycle.
mod chain_syncer;

/// Mocked nodes for the unit tests.
#[cfg(test)]
mod test_utils;
