//! OAuth2 client-credentials authorization service.
//!
//! Registers API clients, issues short-lived RS256 access tokens, validates
//! bearer tokens and publishes the verification key for third parties.

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod issuer;
pub mod jwt;
pub mod keys;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod registry;
pub mod shutdown;
pub mod storage;
pub mod store;
pub mod validator;

// Re-exports for convenience
pub use config::Config;
pub use engine::{AuthorizationEngine, EngineOptions, TokenRequest};
pub use error::{AuthError, ErrorCode};
pub use keys::{RsaKeyMaterial, TokenSigner};
pub use registry::ClientRegistry;
pub use store::TokenStore;
pub use validator::TokenValidator;
