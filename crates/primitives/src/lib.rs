#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Syncer primitive types, utilities and constants.

/// Taiko chain primitives and constants.
pub mod taiko;

/// Time-related utilities.
pub mod time;

/// Transport retries utilities.
pub mod retries;

/// Utility for summarizing objects into a string for logging purposes.
pub mod summary;

/// Utilities for triggering shutdown signals from active tasks.
pub mod shutdown;

/// Utilities for handling long-running tasks.
pub mod task;
