use async_trait::async_trait;
use latchkey_core::{
    Error,
    error::utilities::DatabaseResultExt,
    repositories::PasswordlessTokenRepository,
    token::{NewPasswordlessToken, PasswordlessToken, PasswordlessTokenId},
};
use sqlx::SqlitePool;

use crate::{from_unix, map_write_err};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SqlitePasswordlessToken {
    pub id: String,
    pub email: String,
    pub token: String,
    pub expires_at: i64,
    pub created_at: i64,
}

impl TryFrom<SqlitePasswordlessToken> for PasswordlessToken {
    type Error = Error;

    fn try_from(row: SqlitePasswordlessToken) -> Result<Self, Self::Error> {
        Ok(PasswordlessToken {
            id: PasswordlessTokenId::new(&row.id),
            email: row.email,
            token: row.token,
            expires_at: from_unix(row.expires_at)?,
            created_at: from_unix(row.created_at)?,
        })
    }
}

pub struct SqlitePasswordlessTokenRepository {
    pool: SqlitePool,
}

impl SqlitePasswordlessTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordlessTokenRepository for SqlitePasswordlessTokenRepository {
    async fn create(&self, token: NewPasswordlessToken) -> Result<PasswordlessToken, Error> {
        let row = sqlx::query_as::<_, SqlitePasswordlessToken>(
            r#"
            INSERT INTO passwordless_tokens (id, email, token, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(token.id.as_str())
        .bind(&token.email)
        .bind(&token.token)
        .bind(token.expires_at.timestamp())
        .bind(chrono::Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)?;

        row.try_into()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PasswordlessToken>, Error> {
        let row = sqlx::query_as::<_, SqlitePasswordlessToken>(
            "SELECT * FROM passwordless_tokens WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_db_err()?;

        row.map(PasswordlessToken::try_from).transpose()
    }

    async fn delete(&self, id: &PasswordlessTokenId) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM passwordless_tokens WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete magic link token")?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_expired(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM passwordless_tokens WHERE expires_at <= ?1")
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete expired magic link tokens")?;

        Ok(result.rows_affected())
    }
}
