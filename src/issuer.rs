//! Access token minting.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, IssueError};
use crate::jwt::Claims;
use crate::keys::TokenSigner;
use crate::models::{Client, Token};
use crate::store::TokenStore;

/// Default access token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(600);

/// Longest access token lifetime accepted.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Check that `ttl` is a usable token lifetime.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for a zero TTL or one above
/// [`MAX_TOKEN_TTL`].
pub fn token_ttl(name: &str, ttl: Duration) -> Result<chrono::Duration, ConfigError> {
    if ttl.is_zero() || ttl > MAX_TOKEN_TTL {
        return Err(ConfigError::invalid(
            name,
            format!("must be between 1 and {} seconds", MAX_TOKEN_TTL.as_secs()),
        ));
    }
    chrono::Duration::from_std(ttl).map_err(|e| ConfigError::invalid(name, e.to_string()))
}

/// Signs and persists access tokens for authenticated clients.
#[derive(Clone)]
pub struct TokenIssuer {
    signer: Arc<dyn TokenSigner>,
    store: Arc<TokenStore>,
    issuer: String,
    ttl: chrono::Duration,
}

impl TokenIssuer {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `ttl` is outside
    /// `1s..=`[`MAX_TOKEN_TTL`].
    pub fn new(
        signer: Arc<dyn TokenSigner>,
        store: Arc<TokenStore>,
        issuer: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            signer,
            store,
            issuer: issuer.into(),
            ttl: token_ttl("token_ttl", ttl)?,
        })
    }

    /// Mint a token for `client` and persist it.
    ///
    /// Every call produces a distinct token; nothing is reused.
    pub async fn issue(&self, client: &Client) -> Result<Token, IssueError> {
        let now = Utc::now();
        // exp is carried in whole seconds; keep the stored row in step with it
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(IssueError::ExpiryOutOfRange)?;

        let claims = Claims::new(&self.issuer, &client.id, issued_at, expires_at);
        let access = self.signer.sign(&claims)?;

        let token = Token {
            access,
            expires_at,
            created_at: issued_at,
        };
        self.store.create(&token).await?;

        debug!(client_id = %client.id, jti = %claims.jti, expires_at = %expires_at, "access token issued");
        Ok(token)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::jwt::Jwt;
    use crate::keys::RsaKeyMaterial;
    use crate::storage::InMemoryTokenRepository;

    const KEY: &[u8] = include_bytes!("../tests/fixtures/rsa_pkcs1.pem");

    fn client() -> Client {
        Client {
            id: "client-1".to_string(),
            secret_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    fn issuer(ttl: Duration) -> (TokenIssuer, Arc<RsaKeyMaterial>, Arc<TokenStore>) {
        let keys = Arc::new(RsaKeyMaterial::from_pem(KEY).unwrap());
        let store = Arc::new(TokenStore::new(
            Arc::new(InMemoryTokenRepository::new()),
            std::time::Duration::from_secs(1),
        ));
        let issuer = TokenIssuer::new(keys.clone(), store.clone(), "oauth-service", ttl).unwrap();
        (issuer, keys, store)
    }

    #[tokio::test]
    async fn test_issue_persists_signed_token() {
        let (issuer, keys, store) = issuer(DEFAULT_TOKEN_TTL);

        let token = issuer.issue(&client()).await.unwrap();

        assert_eq!(store.get_by_access(&token.access).await.unwrap(), token);
        assert_eq!((token.expires_at - token.created_at).num_seconds(), 600);
        assert_eq!(token.expires_at.timestamp_subsec_nanos(), 0);

        let claims = Jwt::parse(&token.access)
            .unwrap()
            .verify_signature(keys.decoding_key())
            .unwrap()
            .check_expiry(Utc::now())
            .unwrap()
            .into_claims();
        assert_eq!(claims.aud, "client-1");
        assert_eq!(claims.iss, "oauth-service");
        assert_eq!(claims.exp, token.expires_at.timestamp());
        assert_eq!(claims.iat, token.created_at.timestamp());
    }

    #[tokio::test]
    async fn test_issue_is_not_idempotent() {
        let (issuer, _, _) = issuer(DEFAULT_TOKEN_TTL);

        let a = issuer.issue(&client()).await.unwrap();
        let b = issuer.issue(&client()).await.unwrap();
        assert_ne!(a.access, b.access);
    }

    struct RejectingRepository;

    #[async_trait::async_trait]
    impl crate::storage::TokenRepository for RejectingRepository {
        async fn create(&self, _token: &Token) -> Result<(), StoreError> {
            Err(StoreError::storage("disk full"))
        }

        async fn get_by_access(&self, _access: &str) -> Result<Token, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn delete_expired(&self, _now: DateTime<Utc>) -> Result<u64, StoreError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let keys = Arc::new(RsaKeyMaterial::from_pem(KEY).unwrap());
        let store = Arc::new(TokenStore::new(
            Arc::new(RejectingRepository),
            Duration::from_secs(1),
        ));
        let issuer = TokenIssuer::new(keys, store, "iss", Duration::from_secs(60)).unwrap();

        let result = issuer.issue(&client()).await;
        assert!(matches!(
            result,
            Err(IssueError::Storage(StoreError::Storage(_)))
        ));
    }

    #[test]
    fn test_ttl_bounds() {
        assert!(token_ttl("ttl", Duration::from_secs(1)).is_ok());
        assert_eq!(
            token_ttl("ttl", MAX_TOKEN_TTL).unwrap().num_seconds(),
            86_400
        );
        assert!(token_ttl("ttl", Duration::ZERO).is_err());
        assert!(token_ttl("ttl", MAX_TOKEN_TTL + Duration::from_secs(1)).is_err());
        assert!(token_ttl("ttl", Duration::from_secs(10_000_000_000_000)).is_err());
    }

    #[test]
    fn test_new_rejects_unrepresentable_ttl() {
        let keys = Arc::new(RsaKeyMaterial::from_pem(KEY).unwrap());
        let store = Arc::new(TokenStore::new(
            Arc::new(InMemoryTokenRepository::new()),
            Duration::from_secs(1),
        ));

        let result = TokenIssuer::new(keys, store, "iss", Duration::MAX);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
