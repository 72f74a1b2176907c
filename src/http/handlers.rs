//! Endpoint handlers.

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use tracing::error;

use crate::engine::TokenRequest;
use crate::error::AuthError;
use crate::http::response::{HealthResponse, MessageResponse, TokenResponse};
use crate::http::AppState;
use crate::keys::Jwks;
use crate::metrics;
use crate::models::RegisteredClient;

const BEARER_PREFIX: &str = "Bearer ";

/// `POST /v1/register`
pub async fn register(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<RegisteredClient>), AuthError> {
    let client = state.engine.register_client().await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// `GET|POST /v1/token`
///
/// Parameters come from the form body, falling back to the query string
/// field by field.
pub async fn token(
    State(state): State<AppState>,
    query: Result<Query<TokenRequest>, QueryRejection>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<Json<TokenResponse>, AuthError> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let request = merge(form, query);

    let token = state.engine.issue_token(&request).await?;
    Ok(Json(token.into()))
}

/// `GET /v1/validate`
pub async fn validate(State(state): State<AppState>, headers: HeaderMap) -> Json<bool> {
    let valid = match bearer_token(&headers) {
        Some(token) => state.engine.validate_token(token).await,
        None => false,
    };
    Json(valid)
}

/// `GET /v1/key`
pub async fn public_key(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse<String>>, AuthError> {
    let pem = state.engine.public_key()?;
    let pem = String::from_utf8(pem).map_err(|e| {
        error!(error = %e, "public key PEM is not UTF-8");
        AuthError::Internal
    })?;

    Ok(Json(MessageResponse {
        message: "Public Key",
        data: pem,
    }))
}

/// `GET /.well-known/jwks.json`
pub async fn jwks(State(state): State<AppState>) -> Json<Jwks> {
    Json(state.engine.jwks())
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// `GET /metrics`
pub async fn metrics() -> Response {
    match metrics::gather_text() {
        Ok(body) => ([(CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            AuthError::Internal.into_response()
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn merge(primary: TokenRequest, fallback: TokenRequest) -> TokenRequest {
    fn pick(a: String, b: String) -> String {
        if a.is_empty() {
            b
        } else {
            a
        }
    }

    TokenRequest {
        grant_type: pick(primary.grant_type, fallback.grant_type),
        client_id: pick(primary.client_id, fallback.client_id),
        client_secret: pick(primary.client_secret, fallback.client_secret),
    }
}
