//! Signal handling for graceful shutdown.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Wait for a shutdown signal (SIGINT or SIGTERM on Unix, Ctrl-C elsewhere).
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigint, mut sigterm) =
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            (Err(err), _) | (_, Err(err)) => {
                warn!(error = %err, "failed to install unix signal handlers; using ctrl-c");
                ctrl_c().await;
                return;
            }
        };

    tokio::select! {
        _ = sigint.recv() => {
            info!(signal = "SIGINT", "signal received");
        }
        _ = sigterm.recv() => {
            info!(signal = "SIGTERM", "signal received");
        }
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(signal = "ctrl-c", "signal received"),
        Err(err) => {
            warn!(error = %err, "failed to listen for ctrl-c; logging runs until the transport closes");
            std::future::pending::<()>().await;
        }
    }
}

/// Cancels `shutdown` on the first shutdown signal.
pub fn spawn_signal_listener(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => shutdown.cancel(),
            _ = shutdown.cancelled() => {}
        }
    })
}
