use std::{iter::Take, time::Duration};

use alloy::transports::{
    RpcError, TransportError, TransportErrorKind,
    layers::{RateLimitRetryPolicy, RetryBackoffLayer, RetryPolicy},
};
use tokio_retry::strategy::ExponentialBackoff;

/// The maximum number of retries for rate-limited requests.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// The initial backoff in milliseconds for rate-limited requests.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;

/// The compute units per second budget assumed for the RPC endpoints.
pub const DEFAULT_COMPUTE_UNITS_PER_SECOND: u64 = 1_000;

/// The retry layer applied to every HTTP and WS client towards the execution nodes.
pub fn default_retry_layer() -> RetryBackoffLayer {
    RetryBackoffLayer::new(
        DEFAULT_MAX_RETRIES,
        DEFAULT_INITIAL_BACKOFF_MS,
        DEFAULT_COMPUTE_UNITS_PER_SECOND,
    )
}

/// Returns `true` if the error was caused by the remote refusing the connection, which happens
/// when a node is restarting.
pub fn is_connection_refused(err: &TransportErrorKind) -> bool {
    let TransportErrorKind::Custom(err) = err else {
        return false;
    };

    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err.as_ref());
    while let Some(err) = source {
        if err.to_string().to_lowercase().contains("connection refused") {
            return true;
        }
        source = err.source();
    }

    false
}

/// Errors that can tell whether the failed operation is worth retrying.
pub trait Retryable {
    /// Returns `true` if the operation that produced this error should be retried.
    fn is_retryable(&self) -> bool;
}

impl Retryable for TransportError {
    fn is_retryable(&self) -> bool {
        if let RpcError::Transport(kind) = self {
            if matches!(kind, TransportErrorKind::BackendGone) || is_connection_refused(kind) {
                return true;
            }
        }

        RateLimitRetryPolicy::default().should_retry(self)
    }
}

/// Exponential backoff settings for operations retried at the application level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// The base delay in milliseconds. The n-th attempt waits `initial_ms^n` milliseconds.
    pub initial_ms: u64,
    /// The upper bound of a single delay.
    pub max_delay: Duration,
    /// The maximum number of retries. Zero disables retries.
    pub max_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { initial_ms: 10, max_delay: Duration::from_secs(1), max_retries: 10 }
    }
}

impl RetryConfig {
    /// Returns the sequence of delays to wait between attempts.
    pub fn strategy(&self) -> Take<ExponentialBackoff> {
        ExponentialBackoff::from_millis(self.initial_ms).max_delay(self.max_delay).take(self.max_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_gone_is_retryable() {
        assert!(TransportErrorKind::backend_gone().is_retryable());
    }

    #[test]
    fn connection_refused_is_detected() {
        let err = TransportErrorKind::custom_str("error sending request: Connection refused (os error 111)");
        assert!(err.is_retryable());
    }

    #[test]
    fn deserialization_errors_are_not_retryable() {
        let err = serde_json::from_str::<u64>("\"nope\"").unwrap_err();
        let err = TransportError::deser_err(err, "\"nope\"");
        assert!(!err.is_retryable());
    }

    #[test]
    fn strategy_is_bounded() {
        let config =
            RetryConfig { initial_ms: 10, max_delay: Duration::from_millis(500), max_retries: 4 };

        let delays: Vec<_> = config.strategy().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(100),
                Duration::from_millis(500),
                Duration::from_millis(500)
            ]
        );
    }
}
