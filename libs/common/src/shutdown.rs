//! Graceful shutdown signal handling.

use tracing::warn;

/// Wait until the process receives a termination request.
///
/// Resolves on Ctrl+C (SIGINT) everywhere and additionally on SIGTERM on
/// Unix, so the service shuts down cleanly under both interactive use and
/// process supervisors.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}; Ctrl+C only");
                None
            },
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                match sigterm {
                    Some(mut sig) => { sig.recv().await; },
                    None => std::future::pending::<()>().await,
                }
            } => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
