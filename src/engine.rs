//! Client-credentials authorization flow.
//!
//! The engine is the only component that talks in [`AuthError`]: storage and
//! signing failures are logged here and collapse to [`AuthError::Internal`].

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::{AuthError, ConfigError, StoreError, ValidationError};
use crate::issuer::{TokenIssuer, DEFAULT_TOKEN_TTL};
use crate::keys::{Jwks, TokenSigner};
use crate::metrics;
use crate::models::{Client, RegisteredClient, Token};
use crate::registry::ClientRegistry;
use crate::store::TokenStore;
use crate::validator::TokenValidator;

/// The only grant this service implements.
pub const CLIENT_CREDENTIALS: &str = "client_credentials";

/// Compared against when the client id is unknown, so both paths hash and
/// compare the presented secret.
const UNKNOWN_CLIENT_HASH: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Token endpoint parameters.
///
/// Missing fields deserialize as empty strings and fail authentication.
#[derive(Clone, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl TokenRequest {
    pub fn client_credentials(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            grant_type: CLIENT_CREDENTIALS.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Issuance and validation policy.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// `iss` claim of issued tokens
    pub issuer: String,
    /// Access token lifetime
    pub token_ttl: Duration,
    /// Reject tokens that verify but are no longer stored
    pub validate_store_presence: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            issuer: "oauth-service".to_string(),
            token_ttl: DEFAULT_TOKEN_TTL,
            validate_store_presence: true,
        }
    }
}

/// Registration, issuance, validation and key distribution.
///
/// Holds no state of its own; everything persistent lives behind the
/// registry and the token store.
#[derive(Clone)]
pub struct AuthorizationEngine {
    signer: Arc<dyn TokenSigner>,
    registry: ClientRegistry,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl AuthorizationEngine {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `options.token_ttl` is out of range.
    pub fn new(
        signer: Arc<dyn TokenSigner>,
        registry: ClientRegistry,
        store: Arc<TokenStore>,
        options: EngineOptions,
    ) -> Result<Self, ConfigError> {
        let issuer = TokenIssuer::new(
            Arc::clone(&signer),
            Arc::clone(&store),
            options.issuer,
            options.token_ttl,
        )?;
        let validator =
            TokenValidator::new(signer.as_ref(), store, options.validate_store_presence);

        Ok(Self {
            signer,
            registry,
            issuer,
            validator,
        })
    }

    /// Register a new client and hand out its credentials once.
    pub async fn register_client(&self) -> Result<RegisteredClient, AuthError> {
        self.registry.create().await.map_err(|_| AuthError::Internal)
    }

    /// Handle a token request: grant type first, then credentials.
    pub async fn issue_token(&self, request: &TokenRequest) -> Result<Token, AuthError> {
        if request.grant_type != CLIENT_CREDENTIALS {
            metrics::record_token_issued("unsupported_grant_type");
            debug!(grant_type = %request.grant_type, "unsupported grant type");
            return Err(AuthError::UnsupportedGrantType);
        }

        self.generate_token(&request.client_id, &request.client_secret)
            .await
    }

    /// Authenticate a client and mint a token for it.
    pub async fn generate_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Token, AuthError> {
        let client = match self.authenticate(client_id, client_secret).await {
            Ok(client) => client,
            Err(e) => {
                let status = match e {
                    AuthError::InvalidClient => "invalid_client",
                    _ => "error",
                };
                metrics::record_token_issued(status);
                return Err(e);
            }
        };

        match self.issuer.issue(&client).await {
            Ok(token) => {
                metrics::record_token_issued("success");
                Ok(token)
            }
            Err(e) => {
                metrics::record_token_issued("error");
                error!(client_id = %client.id, error = %e, "failed to issue token");
                Err(AuthError::Internal)
            }
        }
    }

    async fn authenticate(&self, client_id: &str, client_secret: &str) -> Result<Client, AuthError> {
        if client_id.is_empty() {
            reject_unknown_client(client_secret);
            return Err(AuthError::InvalidClient);
        }

        let client = match self.registry.get_by_id(client_id).await {
            Ok(client) => client,
            Err(StoreError::NotFound) => {
                reject_unknown_client(client_secret);
                debug!(client_id = %client_id, "unknown client");
                return Err(AuthError::InvalidClient);
            }
            Err(e) => {
                error!(client_id = %client_id, error = %e, "client lookup failed");
                return Err(AuthError::Internal);
            }
        };

        if !client.verify_secret(client_secret) {
            debug!(client_id = %client_id, "client secret mismatch");
            return Err(AuthError::InvalidClient);
        }

        Ok(client)
    }

    /// Whether `access` is currently a valid token. Never fails.
    pub async fn validate_token(&self, access: &str) -> bool {
        match self.validator.validate(access).await {
            Ok(claims) => {
                metrics::record_token_validation("valid");
                debug!(client_id = %claims.aud, "token valid");
                true
            }
            Err(e) => {
                metrics::record_token_validation(e.kind());
                match &e {
                    ValidationError::Storage(reason) => {
                        warn!(reason = %reason, "token store unavailable during validation");
                    }
                    _ => debug!(reason = e.kind(), "token rejected"),
                }
                false
            }
        }
    }

    /// Public key as PEM.
    pub fn public_key(&self) -> Result<Vec<u8>, AuthError> {
        self.signer.public_key_pem().map_err(|e| {
            error!(error = %e, "failed to encode public key");
            AuthError::Internal
        })
    }

    /// Public key set for JWKS consumers.
    pub fn jwks(&self) -> Jwks {
        Jwks::single(self.signer.jwk())
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("key_id", &self.signer.key_id())
            .field("registry", &self.registry)
            .field("issuer", &self.issuer)
            .field("validator", &self.validator)
            .finish()
    }
}

fn reject_unknown_client(client_secret: &str) {
    let placeholder = Client {
        id: String::new(),
        secret_hash: UNKNOWN_CLIENT_HASH.to_string(),
        created_at: Utc::now(),
    };
    let _ = std::hint::black_box(placeholder.verify_secret(client_secret));
}
