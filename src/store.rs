//! Issued-token store and the expired-token sweep.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::metrics;
use crate::models::Token;
use crate::storage::{with_timeout, TokenRepository};

struct Sweeper {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Durable store of issued tokens.
///
/// When built with [`TokenStore::start`] a background task deletes expired
/// rows every sweep interval until [`TokenStore::shutdown`] is called.
pub struct TokenStore {
    repository: Arc<dyn TokenRepository>,
    operation_timeout: Duration,
    sweeper: Mutex<Option<Sweeper>>,
}

impl TokenStore {
    /// Store without a background sweep.
    pub fn new(repository: Arc<dyn TokenRepository>, operation_timeout: Duration) -> Self {
        Self {
            repository,
            operation_timeout,
            sweeper: Mutex::new(None),
        }
    }

    /// Store with the sweep running every `sweep_interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        repository: Arc<dyn TokenRepository>,
        operation_timeout: Duration,
        sweep_interval: Duration,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_sweeper(
            Arc::clone(&repository),
            operation_timeout,
            sweep_interval,
            stop_rx,
        ));

        info!(interval_secs = sweep_interval.as_secs_f64(), "token sweep started");

        Self {
            repository,
            operation_timeout,
            sweeper: Mutex::new(Some(Sweeper { stop_tx, handle })),
        }
    }

    /// Persist a newly issued token.
    pub async fn create(&self, token: &Token) -> Result<(), StoreError> {
        with_timeout(
            "token_create",
            self.operation_timeout,
            self.repository.create(token),
        )
        .await
    }

    /// Look up a token by its signed string.
    pub async fn get_by_access(&self, access: &str) -> Result<Token, StoreError> {
        with_timeout(
            "token_get",
            self.operation_timeout,
            self.repository.get_by_access(access),
        )
        .await
    }

    /// Delete expired tokens now, outside the regular schedule.
    pub async fn sweep_once(&self) -> Result<u64, StoreError> {
        sweep(self.repository.as_ref(), self.operation_timeout).await
    }

    /// Stop the sweep and wait for its current iteration to finish.
    ///
    /// Calling this more than once, or on a store built with
    /// [`TokenStore::new`], is a no-op.
    pub async fn shutdown(&self) {
        let Some(sweeper) = self.sweeper.lock().await.take() else {
            return;
        };

        let _ = sweeper.stop_tx.send(true);
        if let Err(e) = sweeper.handle.await {
            error!(error = %e, "token sweep task failed");
            return;
        }

        info!("token sweep stopped");
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

async fn sweep(repository: &dyn TokenRepository, limit: Duration) -> Result<u64, StoreError> {
    with_timeout(
        "token_delete_expired",
        limit,
        repository.delete_expired(Utc::now()),
    )
    .await
}

async fn run_sweeper(
    repository: Arc<dyn TokenRepository>,
    operation_timeout: Duration,
    sweep_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match sweep(repository.as_ref(), operation_timeout).await {
                    Ok(reclaimed) => {
                        metrics::record_sweep("success", reclaimed);
                        if reclaimed > 0 {
                            debug!(reclaimed, "expired tokens reclaimed");
                        }
                    }
                    Err(e) => {
                        metrics::record_sweep("error", 0);
                        warn!(error = %e, "token sweep failed; retrying next tick");
                    }
                }
            }
            changed = stop_rx.changed() => {
                // A dropped sender means the store itself is gone.
                if changed.is_err() || *stop_rx.borrow() {
                    debug!("token sweep received shutdown signal");
                    break;
                }
            }
        }
    }
}
