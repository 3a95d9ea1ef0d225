use std::str::FromStr;

use async_trait::async_trait;
use latchkey_core::{
    Error, UserId,
    error::utilities::DatabaseResultExt,
    repositories::TokenRepository,
    token::{NewToken, Token, TokenId, TokenType},
};
use sqlx::SqlitePool;

use crate::{decode_metadata, encode_metadata, from_unix, map_write_err};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SqliteToken {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub token_type: String,
    pub expires_at: i64,
    pub created_at: i64,
    pub revoked: bool,
    pub metadata: String,
}

impl TryFrom<SqliteToken> for Token {
    type Error = Error;

    fn try_from(row: SqliteToken) -> Result<Self, Self::Error> {
        Ok(Token {
            id: TokenId::new(&row.id),
            user_id: UserId::new(&row.user_id),
            token: row.token,
            token_type: TokenType::from_str(&row.token_type)?,
            expires_at: from_unix(row.expires_at)?,
            created_at: from_unix(row.created_at)?,
            revoked: row.revoked,
            metadata: decode_metadata(&row.metadata)?,
        })
    }
}

pub struct SqliteTokenRepository {
    pool: SqlitePool,
}

impl SqliteTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for SqliteTokenRepository {
    async fn create(&self, token: NewToken) -> Result<Token, Error> {
        let row = sqlx::query_as::<_, SqliteToken>(
            r#"
            INSERT INTO tokens (id, user_id, token, token_type, expires_at, created_at, revoked, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
            RETURNING *
            "#,
        )
        .bind(token.id.as_str())
        .bind(token.user_id.as_str())
        .bind(&token.token)
        .bind(token.token_type.as_str())
        .bind(token.expires_at.timestamp())
        .bind(chrono::Utc::now().timestamp())
        .bind(encode_metadata(&token.metadata)?)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)?;

        row.try_into()
    }

    async fn find_by_id(&self, id: &TokenId) -> Result<Option<Token>, Error> {
        let row = sqlx::query_as::<_, SqliteToken>("SELECT * FROM tokens WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_db_err()?;

        row.map(Token::try_from).transpose()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Token>, Error> {
        let row = sqlx::query_as::<_, SqliteToken>("SELECT * FROM tokens WHERE token = ?1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_db_err()?;

        row.map(Token::try_from).transpose()
    }

    async fn revoke(&self, id: &TokenId) -> Result<bool, Error> {
        let result = sqlx::query("UPDATE tokens SET revoked = 1 WHERE id = ?1 AND revoked = 0")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to revoke token")?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &TokenId) -> Result<(), Error> {
        sqlx::query("DELETE FROM tokens WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete token")?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM tokens WHERE expires_at <= ?1")
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete expired tokens")?;

        Ok(result.rows_affected())
    }
}
