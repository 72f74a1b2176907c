//! Access token validation.

use chrono::Utc;
use jsonwebtoken::DecodingKey;
use std::sync::Arc;

use crate::error::{KeyError, ValidationError};
use crate::jwt::{Claims, Jwt, Validated};
use crate::keys::TokenSigner;
use crate::store::TokenStore;

/// Verifies presented access tokens.
///
/// Checks run in order: structure, algorithm, signature, expiry, and then,
/// when a store is attached, that the token is still on record.
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    store: Option<Arc<TokenStore>>,
}

impl TokenValidator {
    /// Validator for tokens issued by `signer`.
    ///
    /// With `check_store_presence` set, a token that verifies but is no
    /// longer in `store` is rejected.
    pub fn new(signer: &dyn TokenSigner, store: Arc<TokenStore>, check_store_presence: bool) -> Self {
        Self {
            decoding_key: signer.decoding_key().clone(),
            store: check_store_presence.then_some(store),
        }
    }

    /// Standalone validator built from a published public key, with no store.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeyLoad`] if `pem` is not an RSA public key.
    pub fn from_public_key_pem(pem: &[u8]) -> Result<Self, KeyError> {
        let decoding_key = DecodingKey::from_rsa_pem(pem)
            .map_err(|e| KeyError::KeyLoad(format!("invalid public key: {e}")))?;

        Ok(Self {
            decoding_key,
            store: None,
        })
    }

    pub fn checks_store_presence(&self) -> bool {
        self.store.is_some()
    }

    /// Run every check and return the verified token.
    pub async fn validate_token(&self, raw: &str) -> Result<Jwt<Validated>, ValidationError> {
        let validated = Jwt::parse(raw)?
            .verify_signature(&self.decoding_key)?
            .check_expiry(Utc::now())?;

        if let Some(store) = &self.store {
            store.get_by_access(raw).await?;
        }

        Ok(validated)
    }

    /// Run every check and return the verified claims.
    pub async fn validate(&self, raw: &str) -> Result<Claims, ValidationError> {
        self.validate_token(raw).await.map(Jwt::into_claims)
    }
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("check_store_presence", &self.checks_store_presence())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::RsaKeyMaterial;
    use crate::models::Token;
    use crate::storage::InMemoryTokenRepository;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use chrono::Duration;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::Duration as StdDuration;

    const KEY: &[u8] = include_bytes!("../tests/fixtures/rsa_pkcs1.pem");
    const OTHER_KEY: &[u8] = include_bytes!("../tests/fixtures/rsa_pkcs8.pem");

    struct Fixture {
        keys: RsaKeyMaterial,
        store: Arc<TokenStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                keys: RsaKeyMaterial::from_pem(KEY).unwrap(),
                store: Arc::new(TokenStore::new(
                    Arc::new(InMemoryTokenRepository::new()),
                    StdDuration::from_secs(1),
                )),
            }
        }

        fn validator(&self, check_store_presence: bool) -> TokenValidator {
            TokenValidator::new(&self.keys, self.store.clone(), check_store_presence)
        }

        /// Sign and persist a token expiring `ttl` from now.
        async fn token(&self, ttl: Duration) -> String {
            let now = Utc::now();
            let claims = Claims::new("iss", "client-1", now - Duration::minutes(20), now + ttl);
            let access = self.keys.sign(&claims).unwrap();
            self.store
                .create(&Token {
                    access: access.clone(),
                    expires_at: claims.expires_at(),
                    created_at: now - Duration::minutes(20),
                })
                .await
                .unwrap();
            access
        }
    }

    #[tokio::test]
    async fn test_valid_token() {
        let fixture = Fixture::new();
        let access = fixture.token(Duration::minutes(10)).await;

        let claims = fixture.validator(true).validate(&access).await.unwrap();
        assert_eq!(claims.aud, "client-1");
    }

    #[tokio::test]
    async fn test_expired_token_rejected_while_still_stored() {
        let fixture = Fixture::new();
        let access = fixture.token(Duration::seconds(-1)).await;
        let stored = fixture.store.get_by_access(&access).await.unwrap();

        let result = fixture.validator(true).validate(&access).await;
        match result {
            Err(ValidationError::Expired { expired_at }) => {
                assert_eq!(expired_at, stored.expires_at);
            }
            other => panic!("expected expiry rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_token_rejected_by_store_policy() {
        let fixture = Fixture::new();
        let now = Utc::now();
        let access = fixture
            .keys
            .sign(&Claims::new("iss", "client-1", now, now + Duration::minutes(5)))
            .unwrap();

        let result = fixture.validator(true).validate(&access).await;
        assert!(matches!(result, Err(ValidationError::NotFound)));

        // signature-only policy accepts it
        assert!(fixture.validator(false).validate(&access).await.is_ok());
    }

    #[tokio::test]
    async fn test_tampered_payload_rejected() {
        let fixture = Fixture::new();
        let access = fixture.token(Duration::minutes(10)).await;

        let forged_payload = URL_SAFE_NO_PAD.encode(
            r#"{"iss":"iss","sub":"admin","aud":"admin","exp":4102444800,"iat":0,"jti":"x"}"#,
        );
        let mut parts: Vec<&str> = access.split('.').collect();
        parts[1] = &forged_payload;
        let forged = parts.join(".");

        let result = fixture.validator(false).validate(&forged).await;
        assert!(matches!(result, Err(ValidationError::InvalidSignature)));
    }

    #[tokio::test]
    async fn test_hs256_signed_with_public_key_rejected() {
        let fixture = Fixture::new();
        let public_pem = fixture.keys.public_key_pem().unwrap();
        let now = Utc::now();
        let claims = Claims::new("iss", "client-1", now, now + Duration::minutes(5));

        // classic key confusion: public key used as an HMAC secret
        let forged = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&public_pem),
        )
        .unwrap();

        let result = fixture.validator(false).validate(&forged).await;
        assert!(matches!(result, Err(ValidationError::InvalidSignature)));
    }

    #[tokio::test]
    async fn test_standalone_validator_from_published_key() {
        let fixture = Fixture::new();
        let access = fixture.token(Duration::minutes(10)).await;

        let pem = fixture.keys.public_key_pem().unwrap();
        let standalone = TokenValidator::from_public_key_pem(&pem).unwrap();
        assert!(!standalone.checks_store_presence());
        assert!(standalone.validate(&access).await.is_ok());

        let other = RsaKeyMaterial::from_pem(OTHER_KEY).unwrap();
        let foreign = TokenValidator::from_public_key_pem(&other.public_key_pem().unwrap()).unwrap();
        assert!(matches!(
            foreign.validate(&access).await,
            Err(ValidationError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_malformed_input() {
        let validator = Fixture::new().validator(true);

        for raw in ["", "abc", "a.b", "not.a.jwt"] {
            assert!(matches!(
                validator.validate(raw).await,
                Err(ValidationError::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_from_public_key_pem_rejects_garbage() {
        assert!(matches!(
            TokenValidator::from_public_key_pem(b"not a key"),
            Err(KeyError::KeyLoad(_))
        ));
    }
}
