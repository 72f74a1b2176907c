//! Shared fixtures for integration tests.

#![allow(dead_code)]

use oauth_service::engine::{AuthorizationEngine, EngineOptions};
use oauth_service::keys::RsaKeyMaterial;
use oauth_service::registry::ClientRegistry;
use oauth_service::storage::{InMemoryClientRepository, InMemoryTokenRepository};
use oauth_service::store::TokenStore;
use std::sync::Arc;
use std::time::Duration;

pub const PKCS1_KEY: &[u8] = include_bytes!("../fixtures/rsa_pkcs1.pem");
pub const PKCS8_KEY: &[u8] = include_bytes!("../fixtures/rsa_pkcs8.pem");
pub const EC_KEY: &[u8] = include_bytes!("../fixtures/ec_p256.pem");

pub fn fixture_path(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// An engine over in-memory repositories.
pub struct TestService {
    pub engine: Arc<AuthorizationEngine>,
    pub store: Arc<TokenStore>,
    pub tokens: Arc<InMemoryTokenRepository>,
    pub clients: Arc<InMemoryClientRepository>,
    pub keys: Arc<RsaKeyMaterial>,
}

pub struct TestServiceBuilder {
    options: EngineOptions,
    sweep_interval: Option<Duration>,
    operation_timeout: Duration,
}

impl TestServiceBuilder {
    pub fn new() -> Self {
        Self {
            options: EngineOptions::default(),
            sweep_interval: None,
            operation_timeout: Duration::from_secs(2),
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.options.token_ttl = ttl;
        self
    }

    pub fn store_presence(mut self, enabled: bool) -> Self {
        self.options.validate_store_presence = enabled;
        self
    }

    pub fn sweep_every(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Must run inside a tokio runtime when a sweep interval is set.
    pub fn build(self) -> TestService {
        let keys = Arc::new(RsaKeyMaterial::from_pem(PKCS1_KEY).expect("fixture key loads"));
        let tokens = Arc::new(InMemoryTokenRepository::new());
        let clients = Arc::new(InMemoryClientRepository::new());

        let store = Arc::new(match self.sweep_interval {
            Some(interval) => TokenStore::start(tokens.clone(), self.operation_timeout, interval),
            None => TokenStore::new(tokens.clone(), self.operation_timeout),
        });
        let registry = ClientRegistry::new(clients.clone(), self.operation_timeout);

        let engine = Arc::new(AuthorizationEngine::new(
            keys.clone(),
            registry,
            store.clone(),
            self.options,
        )
        .expect("valid engine options"));

        TestService {
            engine,
            store,
            tokens,
            clients,
            keys,
        }
    }
}

pub fn service() -> TestService {
    TestServiceBuilder::new().build()
}
