//! Signing key material and public key distribution.

pub mod jwks;
pub mod material;

pub use jwks::{Jwk, Jwks};
pub use material::RsaKeyMaterial;

use crate::error::KeyError;
use crate::jwt::Claims;
use jsonwebtoken::DecodingKey;

/// Signer for access tokens.
///
/// Implementations own the private key; callers only ever see signed tokens
/// and public material.
pub trait TokenSigner: Send + Sync {
    /// Sign a claim set and return the compact JWT.
    fn sign(&self, claims: &Claims) -> Result<String, KeyError>;

    /// Public key as SubjectPublicKeyInfo PEM.
    fn public_key_pem(&self) -> Result<Vec<u8>, KeyError>;

    /// Key used to verify tokens produced by [`TokenSigner::sign`].
    fn decoding_key(&self) -> &DecodingKey;

    /// Public key as a JWK.
    fn jwk(&self) -> Jwk;

    /// Get the key ID for JWT header.
    fn key_id(&self) -> &str;
}
