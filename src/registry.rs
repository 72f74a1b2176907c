//! Client registration and lookup.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::StoreError;
use crate::metrics;
use crate::models::{Client, RegisteredClient};
use crate::storage::{with_timeout, ClientRepository};

/// Entropy of a generated client secret.
pub const SECRET_BYTES: usize = 32;

/// Stored form of a client secret: SHA-256, base64url without padding.
pub fn hash_secret(secret: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(secret.as_bytes()))
}

fn generate_secret() -> String {
    let mut bytes = Zeroizing::new([0u8; SECRET_BYTES]);
    OsRng.fill_bytes(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(&bytes[..])
}

/// Registered API clients.
#[derive(Clone)]
pub struct ClientRegistry {
    repository: Arc<dyn ClientRepository>,
    operation_timeout: Duration,
}

impl ClientRegistry {
    pub fn new(repository: Arc<dyn ClientRepository>, operation_timeout: Duration) -> Self {
        Self {
            repository,
            operation_timeout,
        }
    }

    /// Register a new client with a generated id and secret.
    ///
    /// The plaintext secret exists only in the returned value.
    pub async fn create(&self) -> Result<RegisteredClient, StoreError> {
        let id = Uuid::new_v4().to_string();
        let secret = generate_secret();
        let client = Client {
            id: id.clone(),
            secret_hash: hash_secret(&secret),
            created_at: Utc::now(),
        };

        let result = with_timeout(
            "client_create",
            self.operation_timeout,
            self.repository.create(&client),
        )
        .await;

        match result {
            Ok(()) => {
                metrics::record_client_registered("success");
                info!(client_id = %id, "client registered");
                Ok(RegisteredClient { id, secret })
            }
            Err(e) => {
                metrics::record_client_registered("error");
                error!(client_id = %id, error = %e, "failed to persist client");
                Err(e)
            }
        }
    }

    /// Look up a client by id.
    pub async fn get_by_id(&self, id: &str) -> Result<Client, StoreError> {
        with_timeout(
            "client_get",
            self.operation_timeout,
            self.repository.get_by_id(id),
        )
        .await
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}
