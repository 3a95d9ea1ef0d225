use async_trait::async_trait;
use chrono::{DateTime, Utc};
use latchkey_core::{
    Error,
    error::utilities::DatabaseResultExt,
    repositories::PasswordlessTokenRepository,
    token::{NewPasswordlessToken, PasswordlessToken, PasswordlessTokenId},
};
use sqlx::PgPool;

use crate::map_write_err;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostgresPasswordlessToken {
    pub id: String,
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<PostgresPasswordlessToken> for PasswordlessToken {
    fn from(row: PostgresPasswordlessToken) -> Self {
        PasswordlessToken {
            id: PasswordlessTokenId::new(&row.id),
            email: row.email,
            token: row.token,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

pub struct PostgresPasswordlessTokenRepository {
    pool: PgPool,
}

impl PostgresPasswordlessTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordlessTokenRepository for PostgresPasswordlessTokenRepository {
    async fn create(&self, token: NewPasswordlessToken) -> Result<PasswordlessToken, Error> {
        let row = sqlx::query_as::<_, PostgresPasswordlessToken>(
            r#"
            INSERT INTO passwordless_tokens (id, email, token, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(token.id.as_str())
        .bind(&token.email)
        .bind(&token.token)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(row.into())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PasswordlessToken>, Error> {
        let row = sqlx::query_as::<_, PostgresPasswordlessToken>(
            "SELECT * FROM passwordless_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_db_err()?;

        Ok(row.map(PasswordlessToken::from))
    }

    async fn delete(&self, id: &PasswordlessTokenId) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM passwordless_tokens WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete magic link token")?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_expired(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM passwordless_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete expired magic link tokens")?;

        Ok(result.rows_affected())
    }
}
