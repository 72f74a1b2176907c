//! Response bodies and error rendering.

use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AuthError;
use crate::models::Token;

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = self.code();
        let body = ErrorBody {
            code: code.as_str(),
            message: self.to_string(),
        };
        (code.http_status(), Json(body)).into_response()
    }
}

/// Successful token endpoint response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        let expires_in = (token.expires_at - Utc::now()).num_seconds().max(0);
        Self {
            access_token: token.access,
            token_type: "Bearer",
            expires_in,
            expires_at: token.expires_at,
        }
    }
}

/// `{message, data}` envelope used by the public key endpoint.
#[derive(Debug, Serialize)]
pub struct MessageResponse<T: Serialize> {
    pub message: &'static str,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
