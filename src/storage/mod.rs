//! Persistence for clients and issued tokens.
//!
//! Two backends implement the repository traits: Postgres via `sqlx` for
//! production, and an in-memory map for tests and local development.

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryClientRepository, InMemoryTokenRepository};
pub use postgres::{PgClientRepository, PgTokenRepository};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{Client, Token};

/// Durable client records.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Insert a new client; an existing id is [`StoreError::Conflict`].
    async fn create(&self, client: &Client) -> Result<(), StoreError>;

    /// Look up a client; [`StoreError::NotFound`] if absent.
    async fn get_by_id(&self, id: &str) -> Result<Client, StoreError>;
}

/// Durable token records.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Insert a new token; an existing `access` is [`StoreError::Conflict`].
    async fn create(&self, token: &Token) -> Result<(), StoreError>;

    /// Look up a token; [`StoreError::NotFound`] if never issued or reclaimed.
    async fn get_by_access(&self, access: &str) -> Result<Token, StoreError>;

    /// Delete every token with `expires_at < now` and return how many went.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Run a store call under `limit`, recording its latency.
///
/// An elapsed deadline drops the call and yields [`StoreError::Timeout`].
pub(crate) async fn with_timeout<T, F>(
    operation: &'static str,
    limit: std::time::Duration,
    call: F,
) -> Result<T, StoreError>
where
    F: std::future::Future<Output = Result<T, StoreError>>,
{
    let started = std::time::Instant::now();
    let result = tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(StoreError::Timeout(limit)));
    crate::metrics::record_store_latency(operation, started.elapsed().as_secs_f64());
    result
}
