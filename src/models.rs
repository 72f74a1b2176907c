//! Records owned by the client registry and the token store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use subtle::ConstantTimeEq;

use crate::registry::hash_secret;

/// A registered client as persisted by the registry.
///
/// Only the SHA-256 of the secret is kept; the plaintext is handed out once
/// in [`RegisteredClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Checks a presented secret against the stored hash in constant time.
    #[must_use]
    pub fn verify_secret(&self, presented: &str) -> bool {
        let presented_hash = hash_secret(presented);
        let expected = self.secret_hash.as_bytes();
        let actual = presented_hash.as_bytes();

        if expected.len() != actual.len() {
            return false;
        }

        expected.ct_eq(actual).into()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Credentials returned once from registration.
#[derive(Clone, Serialize)]
pub struct RegisteredClient {
    pub id: String,
    pub secret: String,
}

impl fmt::Debug for RegisteredClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredClient")
            .field("id", &self.id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// An issued access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    /// Signed JWT
    pub access: String,
    /// Instant from which the token is no longer valid
    pub expires_at: DateTime<Utc>,
    /// Issuance instant
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// Whether the token is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}
