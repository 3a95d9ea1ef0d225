use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use latchkey_core::{
    Error, Metadata, UserId,
    error::utilities::DatabaseResultExt,
    repositories::TokenRepository,
    token::{NewToken, Token, TokenId, TokenType},
};
use sqlx::{PgPool, types::Json};

use crate::map_write_err;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostgresToken {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
    pub metadata: Json<Metadata>,
}

impl TryFrom<PostgresToken> for Token {
    type Error = Error;

    fn try_from(row: PostgresToken) -> Result<Self, Self::Error> {
        Ok(Token {
            id: TokenId::new(&row.id),
            user_id: UserId::new(&row.user_id),
            token: row.token,
            token_type: TokenType::from_str(&row.token_type)?,
            expires_at: row.expires_at,
            created_at: row.created_at,
            revoked: row.revoked,
            metadata: row.metadata.0,
        })
    }
}

pub struct PostgresTokenRepository {
    pool: PgPool,
}

impl PostgresTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn create(&self, token: NewToken) -> Result<Token, Error> {
        let row = sqlx::query_as::<_, PostgresToken>(
            r#"
            INSERT INTO tokens (id, user_id, token, token_type, expires_at, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(token.id.as_str())
        .bind(token.user_id.as_str())
        .bind(&token.token)
        .bind(token.token_type.as_str())
        .bind(token.expires_at)
        .bind(Json(&token.metadata))
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)?;

        row.try_into()
    }

    async fn find_by_id(&self, id: &TokenId) -> Result<Option<Token>, Error> {
        let row = sqlx::query_as::<_, PostgresToken>("SELECT * FROM tokens WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_db_err()?;

        row.map(Token::try_from).transpose()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Token>, Error> {
        let row = sqlx::query_as::<_, PostgresToken>("SELECT * FROM tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_db_err()?;

        row.map(Token::try_from).transpose()
    }

    async fn revoke(&self, id: &TokenId) -> Result<bool, Error> {
        let result =
            sqlx::query("UPDATE tokens SET revoked = TRUE WHERE id = $1 AND revoked = FALSE")
                .bind(id.as_str())
                .execute(&self.pool)
                .await
                .map_db_err_with_context("Failed to revoke token")?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &TokenId) -> Result<(), Error> {
        sqlx::query("DELETE FROM tokens WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete token")?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete expired tokens")?;

        Ok(result.rows_affected())
    }
}
