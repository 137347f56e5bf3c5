//! Graceful-shutdown signal handling (spec §5 "Shutdown on SIGINT/SIGTERM":
//! cancel the root context, stop the reaper, close all sessions, then stop
//! accepting new connections). Grounded on `turbomcp-server`'s
//! `run_with_transport` signal block - `ctrl_c` plus a `SIGTERM` listener
//! spawned only on unix, racing against whichever fires first.

use tokio_util::sync::CancellationToken;

/// Resolves once either Ctrl+C or (on unix) SIGTERM arrives, then cancels
/// `token` so every task selecting on it unwinds together.
pub async fn wait_for_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Ctrl+C received, shutting down"),
        () = sigterm => tracing::info!("SIGTERM received, shutting down"),
    }
    token.cancel();
}
