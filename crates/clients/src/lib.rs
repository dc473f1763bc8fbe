#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Various extensible API client connections

/// `AuthRPC` (engine API) connection
pub mod engine;

/// Execution layer client connection
pub mod execution;
