use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use oauth_service::engine::{AuthorizationEngine, EngineOptions};
use oauth_service::http::{self, AppState};
use oauth_service::keys::{RsaKeyMaterial, TokenSigner};
use oauth_service::observability::init_tracing;
use oauth_service::registry::ClientRegistry;
use oauth_service::shutdown::{drain, wait_for_signal};
use oauth_service::storage::{PgClientRepository, PgTokenRepository};
use oauth_service::store::TokenStore;
use oauth_service::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.tracing())?;

    info!(service = %config.service_name, "starting");

    let keys = RsaKeyMaterial::from_file(&config.private_key_path).with_context(|| {
        format!(
            "loading signing key from {}",
            config.private_key_path.display()
        )
    })?;
    info!(key_id = keys.key_id(), "signing key loaded");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.store_operation_timeout)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;

    let clients = PgClientRepository::new(pool.clone());
    clients.init_schema().await.context("creating client table")?;
    let tokens = PgTokenRepository::new(pool.clone());
    tokens.init_schema().await.context("creating token table")?;

    let store = Arc::new(TokenStore::start(
        Arc::new(tokens),
        config.store_operation_timeout,
        config.token_sweep_interval,
    ));
    let registry = ClientRegistry::new(Arc::new(clients), config.store_operation_timeout);

    let engine = AuthorizationEngine::new(
        Arc::new(keys),
        registry,
        Arc::clone(&store),
        EngineOptions {
            issuer: config.jwt_issuer.clone(),
            token_ttl: config.access_token_ttl,
            validate_store_presence: config.validate_store_presence,
        },
    )?;

    let app = http::router(AppState::new(Arc::new(engine)), config.request_timeout);
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("binding {}", config.bind_address()))?;

    info!(address = %config.bind_address(), "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await
        .context("serving HTTP")?;

    drain(&store, pool.close(), config.shutdown_timeout).await;

    Ok(())
}
