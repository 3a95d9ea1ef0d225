use async_trait::async_trait;
use latchkey_core::{
    Error, User, UserId,
    error::{StorageError, utilities::DatabaseResultExt},
    repositories::UserRepository,
    user::NewUser,
};
use sqlx::SqlitePool;

use crate::{decode_metadata, encode_metadata, from_unix, map_write_err};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SqliteUser {
    pub id: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub provider: String,
    pub provider_id: Option<String>,
    pub email_verified: bool,
    pub app_metadata: String,
    pub user_metadata: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<SqliteUser> for User {
    type Error = Error;

    fn try_from(row: SqliteUser) -> Result<Self, Self::Error> {
        User::builder()
            .id(UserId::new(&row.id))
            .email(row.email)
            .password_hash(row.password_hash)
            .provider(row.provider)
            .provider_id(row.provider_id)
            .email_verified(row.email_verified)
            .app_metadata(decode_metadata(&row.app_metadata)?)
            .user_metadata(decode_metadata(&row.user_metadata)?)
            .created_at(from_unix(row.created_at)?)
            .updated_at(from_unix(row.updated_at)?)
            .build()
    }
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, binds: &[&str]) -> Result<Option<User>, Error> {
        let sql = format!("SELECT * FROM users WHERE {clause}");
        let mut query = sqlx::query_as::<_, SqliteUser>(&sql);
        for value in binds {
            query = query.bind(*value);
        }
        let row = query.fetch_optional(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to look up user");
            Error::Storage(StorageError::Database(e.to_string()))
        })?;
        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        let now = chrono::Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteUser>(
            r#"
            INSERT INTO users (id, email, password_hash, provider, provider_id, email_verified,
                               app_metadata, user_metadata, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING *
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.provider)
        .bind(&user.provider_id)
        .bind(user.email_verified)
        .bind(encode_metadata(&user.app_metadata)?)
        .bind(encode_metadata(&user.user_metadata)?)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)?;

        row.try_into()
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.fetch_one_where("id = ?1", &[id.as_str()]).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.fetch_one_where("email = ?1", &[email]).await
    }

    async fn find_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, Error> {
        self.fetch_one_where("provider = ?1 AND provider_id = ?2", &[provider, provider_id])
            .await
    }

    async fn update(&self, user: &User) -> Result<User, Error> {
        let now = chrono::Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteUser>(
            r#"
            UPDATE users
            SET email = ?2, password_hash = ?3, provider = ?4, provider_id = ?5,
                email_verified = ?6, app_metadata = ?7, user_metadata = ?8, updated_at = ?9
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.provider)
        .bind(&user.provider_id)
        .bind(user.email_verified)
        .bind(encode_metadata(&user.app_metadata)?)
        .bind(encode_metadata(&user.user_metadata)?)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_err)?;

        match row {
            Some(row) => row.try_into(),
            None => Err(StorageError::NotFound.into()),
        }
    }

    async fn delete(&self, id: &UserId) -> Result<(), Error> {
        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Failed to delete user")?;

        Ok(())
    }
}
