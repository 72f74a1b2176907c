//! Postgres repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::StoreError;
use crate::models::{Client, Token};
use crate::storage::{ClientRepository, TokenRepository};

const CREATE_CLIENT_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS oauth_client (
        id          TEXT PRIMARY KEY,
        secret_hash TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL
    )
"#;

const CREATE_TOKEN_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS oauth_token (
        access     TEXT PRIMARY KEY,
        expires_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
"#;

const CREATE_TOKEN_EXPIRY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_oauth_token_expires_at ON oauth_token (expires_at)";

/// Client records in the `oauth_client` table.
#[derive(Debug, Clone)]
pub struct PgClientRepository {
    pool: PgPool,
}

impl PgClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the table if it does not exist yet.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_CLIENT_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    fn row_to_client(row: &PgRow) -> Result<Client, StoreError> {
        Ok(Client {
            id: row.try_get("id")?,
            secret_hash: row.try_get("secret_hash")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }
}

#[async_trait]
impl ClientRepository for PgClientRepository {
    async fn create(&self, client: &Client) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO oauth_client (id, secret_hash, created_at) VALUES ($1, $2, $3)")
            .bind(&client.id)
            .bind(&client.secret_hash)
            .bind(client.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Client, StoreError> {
        let row = sqlx::query("SELECT id, secret_hash, created_at FROM oauth_client WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_client(&row),
            None => Err(StoreError::NotFound),
        }
    }
}

/// Token records in the `oauth_token` table.
#[derive(Debug, Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the table and its expiry index if they do not exist yet.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TOKEN_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_TOKEN_EXPIRY_INDEX)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_token(row: &PgRow) -> Result<Token, StoreError> {
        Ok(Token {
            access: row.try_get("access")?,
            expires_at: row.try_get::<DateTime<Utc>, _>("expires_at")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn create(&self, token: &Token) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO oauth_token (access, expires_at, created_at) VALUES ($1, $2, $3)")
            .bind(&token.access)
            .bind(token.expires_at)
            .bind(token.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_by_access(&self, access: &str) -> Result<Token, StoreError> {
        let row =
            sqlx::query("SELECT access, expires_at, created_at FROM oauth_token WHERE access = $1")
                .bind(access)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Self::row_to_token(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM oauth_token WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
