use std::future::Future;

use procpool::StopHandle;

/// Turn the first signal into a graceful pool stop. Returns on the second
/// signal, when the caller should exit without waiting for tasks.
pub async fn escalate<S, F>(mut next_signal: S, stop: StopHandle)
where
    S: FnMut() -> F,
    F: Future<Output = ()>,
{
    next_signal().await;
    tracing::info!("shutdown signal received, stopping tasks (signal again to force exit)");
    stop.request_stop();

    next_signal().await;
    tracing::warn!("second shutdown signal, exiting without waiting for tasks");
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl_c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
                ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}
