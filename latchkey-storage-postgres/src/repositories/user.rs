use async_trait::async_trait;
use chrono::{DateTime, Utc};
use latchkey_core::{
    Error, Metadata, User, UserId,
    error::{StorageError, utilities::DatabaseResultExt},
    repositories::UserRepository,
    user::NewUser,
};
use sqlx::{PgPool, types::Json};

use crate::map_write_err;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostgresUser {
    pub id: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub provider: String,
    pub provider_id: Option<String>,
    pub email_verified: bool,
    pub app_metadata: Json<Metadata>,
    pub user_metadata: Json<Metadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostgresUser> for User {
    fn from(row: PostgresUser) -> Self {
        User {
            id: UserId::new(&row.id),
            email: row.email,
            password_hash: row.password_hash,
            provider: row.provider,
            provider_id: row.provider_id,
            email_verified: row.email_verified,
            app_metadata: row.app_metadata.0,
            user_metadata: row.user_metadata.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        let row = sqlx::query_as::<_, PostgresUser>(
            r#"
            INSERT INTO users (id, email, password_hash, provider, provider_id, email_verified,
                               app_metadata, user_metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.provider)
        .bind(&user.provider_id)
        .bind(user.email_verified)
        .bind(Json(&user.app_metadata))
        .bind(Json(&user.user_metadata))
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        let row = sqlx::query_as::<_, PostgresUser>("SELECT * FROM users WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_db_err()?;

        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let row = sqlx::query_as::<_, PostgresUser>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_db_err()?;

        Ok(row.map(User::from))
    }

    async fn find_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, Error> {
        let row = sqlx::query_as::<_, PostgresUser>(
            "SELECT * FROM users WHERE provider = $1 AND provider_id = $2",
        )
        .bind(provider)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
        .map_db_err()?;

        Ok(row.map(User::from))
    }

    async fn update(&self, user: &User) -> Result<User, Error> {
        let row = sqlx::query_as::<_, PostgresUser>(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, provider = $4, provider_id = $5,
                email_verified = $6, app_metadata = $7, user_metadata = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.provider)
        .bind(&user.provider_id)
        .bind(user.email_verified)
        .bind(Json(&user.app_metadata))
        .bind(Json(&user.user_metadata))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_err)?;

        row.map(User::from).ok_or_else(|| StorageError::NotFound.into())
    }

    async fn delete(&self, id: &UserId) -> Result<(), Error> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete user")?;

        Ok(())
    }
}
