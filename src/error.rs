//! Error types for the authorization service.
//!
//! Every layer owns its own error enum. Only [`AuthError`] is allowed to cross
//! the external boundary; storage and signing failures are logged where they
//! happen and collapse to [`AuthError::Internal`].

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the client and token stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record matches the requested key.
    #[error("record not found")]
    NotFound,

    /// A record with the same unique key already exists.
    #[error("record already exists")]
    Conflict,

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The store did not answer within the operation deadline.
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Create a storage error with the given message.
    #[must_use]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict,
            _ => Self::Storage(err.to_string()),
        }
    }
}

/// Errors raised by the signing key material.
#[derive(Error, Debug)]
pub enum KeyError {
    /// The private key could not be read or is not an RSA key.
    #[error("key load error: {0}")]
    KeyLoad(String),

    /// The claim set could not be signed.
    #[error("signing error: {0}")]
    Signing(String),

    /// The public key could not be marshaled.
    #[error("public key encoding error: {0}")]
    Encoding(String),
}

/// Reasons a presented access token is rejected.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The token is not a well-formed JWT.
    #[error("token malformed: {0}")]
    Malformed(String),

    /// The signature does not verify or the algorithm is not RS256.
    #[error("token signature invalid")]
    InvalidSignature,

    /// The token is past its expiry.
    #[error("token expired at {expired_at}")]
    Expired {
        /// When the token expired
        expired_at: DateTime<Utc>,
    },

    /// The token verifies but is no longer present in the store.
    #[error("token not found in store")]
    NotFound,

    /// The store could not be consulted.
    #[error("token store unavailable: {0}")]
    Storage(String),
}

impl ValidationError {
    /// Short label used for metrics and debug logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired { .. } => "expired",
            Self::NotFound => "not_found",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ValidationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidKeyFormat => Self::InvalidSignature,
            _ => Self::Malformed(err.to_string()),
        }
    }
}

impl From<StoreError> for ValidationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Failures while minting an access token.
#[derive(Error, Debug)]
pub enum IssueError {
    /// Signing the claim set failed.
    #[error(transparent)]
    Signing(#[from] KeyError),

    /// Persisting the token failed.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// `iat + ttl` does not fit in a timestamp.
    #[error("token expiry out of range")]
    ExpiryOutOfRange,
}

/// Errors surfaced to external callers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown client id or wrong secret.
    #[error("invalid client")]
    InvalidClient,

    /// The request asked for a grant other than `client_credentials`.
    #[error("unsupported grant_type")]
    UnsupportedGrantType,

    /// Anything the caller cannot fix; details stay in the logs.
    #[error("internal server issue")]
    Internal,
}

/// Stable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidClient,
    UnsupportedGrantType,
    Internal,
}

impl ErrorCode {
    /// OAuth2 error string (RFC 6749 section 5.2).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidClient => "invalid_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::Internal => "server_error",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidClient => StatusCode::UNAUTHORIZED,
            Self::UnsupportedGrantType => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AuthError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidClient => ErrorCode::InvalidClient,
            Self::UnsupportedGrantType => ErrorCode::UnsupportedGrantType,
            Self::Internal => ErrorCode::Internal,
        }
    }
}

/// Invalid or unreadable startup configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable is present but cannot be used.
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// Environment variable name
        name: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Create an invalid-value error.
    #[must_use]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
