use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{FutureExt, future::BoxFuture};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};

/// A future that resolves when the process receives `SIGINT` or `SIGTERM`.
pub struct ShutdownSignal {
    inner: BoxFuture<'static, ()>,
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal").finish_non_exhaustive()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Creates a new shutdown signal listening for `SIGINT` and `SIGTERM`.
    pub fn new() -> Self {
        let inner = async {
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(err) => {
                    error!(?err, "Failed to install SIGTERM handler, listening for SIGINT only");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        };

        Self { inner: inner.boxed() }
    }

    /// Creates a shutdown signal from an arbitrary future. Useful in tests.
    pub fn from_future<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self { inner: fut.boxed() }
    }
}

impl Future for ShutdownSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

/// Run the given future until it completes or the shutdown signal fires, whichever comes first.
///
/// The `on_shutdown` callback runs in both cases, before returning. Dropping the future is how
/// in-flight work gets cancelled.
pub async fn run_until_shutdown<F, T, E>(
    fut: F,
    shutdown_signal: ShutdownSignal,
    on_shutdown: impl FnOnce(),
) -> Result<(), E>
where
    F: Future<Output = Result<T, E>>,
{
    let res = tokio::select! {
        res = fut => res.map(|_| ()),
        _ = shutdown_signal => Ok(()),
    };

    on_shutdown();
    res
}
