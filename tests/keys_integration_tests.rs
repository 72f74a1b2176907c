//! Key loading and cross-key verification through the public API.

mod common;

use chrono::{Duration, Utc};
use common::{fixture_path, EC_KEY, PKCS1_KEY, PKCS8_KEY};
use oauth_service::error::{KeyError, ValidationError};
use oauth_service::jwt::Claims;
use oauth_service::keys::{RsaKeyMaterial, TokenSigner};
use oauth_service::validator::TokenValidator;

fn claims() -> Claims {
    let now = Utc::now();
    Claims::new("oauth-service", "client-1", now, now + Duration::minutes(10))
}

#[test]
fn test_from_file_loads_both_encodings() {
    let pkcs1 = RsaKeyMaterial::from_file(fixture_path("rsa_pkcs1.pem")).unwrap();
    let pkcs8 = RsaKeyMaterial::from_file(fixture_path("rsa_pkcs8.pem")).unwrap();

    assert_eq!(pkcs1.key_id(), RsaKeyMaterial::from_pem(PKCS1_KEY).unwrap().key_id());
    assert_ne!(pkcs1.key_id(), pkcs8.key_id());
}

#[test]
fn test_missing_file_is_key_load_error() {
    let result = RsaKeyMaterial::from_file(fixture_path("does-not-exist.pem"));
    assert!(matches!(result, Err(KeyError::KeyLoad(_))));
}

#[test]
fn test_ec_key_rejected() {
    assert!(matches!(
        RsaKeyMaterial::from_file(fixture_path("ec_p256.pem")),
        Err(KeyError::KeyLoad(_))
    ));
    assert!(matches!(
        RsaKeyMaterial::from_pem(EC_KEY),
        Err(KeyError::KeyLoad(_))
    ));
}

#[test]
fn test_public_key_pem_byte_identical_across_instances() {
    let a = RsaKeyMaterial::from_pem(PKCS1_KEY).unwrap();
    let b = RsaKeyMaterial::from_pem(PKCS1_KEY).unwrap();

    assert_eq!(a.public_key_pem().unwrap(), a.public_key_pem().unwrap());
    assert_eq!(a.public_key_pem().unwrap(), b.public_key_pem().unwrap());
}

#[tokio::test]
async fn test_token_verifies_only_against_its_own_key() {
    let key_a = RsaKeyMaterial::from_pem(PKCS1_KEY).unwrap();
    let key_b = RsaKeyMaterial::from_pem(PKCS8_KEY).unwrap();
    let token = key_a.sign(&claims()).unwrap();

    let verifier_a = TokenValidator::from_public_key_pem(&key_a.public_key_pem().unwrap()).unwrap();
    let verifier_b = TokenValidator::from_public_key_pem(&key_b.public_key_pem().unwrap()).unwrap();

    assert!(verifier_a.validate(&token).await.is_ok());
    assert!(matches!(
        verifier_b.validate(&token).await,
        Err(ValidationError::InvalidSignature)
    ));
}

#[tokio::test]
async fn test_alg_none_token_rejected() {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    let key = RsaKeyMaterial::from_pem(PKCS1_KEY).unwrap();
    let verifier = TokenValidator::from_public_key_pem(&key.public_key_pem().unwrap()).unwrap();

    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims()).unwrap());
    let unsigned = format!("{header}.{payload}.");

    assert!(matches!(
        verifier.validate(&unsigned).await,
        Err(ValidationError::InvalidSignature)
    ));
}
