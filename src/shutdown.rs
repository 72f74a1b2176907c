//! Signal handling and ordered teardown.

use std::future::Future;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info, warn};

use crate::store::TokenStore;

/// Waits for SIGTERM or SIGINT
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}

/// Stop the token sweep, then release the pool, all within `timeout`.
///
/// Returns `false` if the deadline passed before teardown finished.
pub async fn drain<F>(store: &TokenStore, close_pool: F, timeout: Duration) -> bool
where
    F: Future<Output = ()>,
{
    let teardown = async {
        store.shutdown().await;
        close_pool.await;
    };

    match tokio::time::timeout(timeout, teardown).await {
        Ok(()) => {
            info!("Shutdown complete");
            true
        }
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs_f64(), "Shutdown timeout reached");
            false
        }
    }
}
