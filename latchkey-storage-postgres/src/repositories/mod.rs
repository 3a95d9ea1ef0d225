//! Repository implementations for Postgres storage

pub mod passwordless;
pub mod token;
pub mod user;

pub use passwordless::PostgresPasswordlessTokenRepository;
pub use token::PostgresTokenRepository;
pub use user::PostgresUserRepository;

use async_trait::async_trait;
use latchkey_core::{
    Error,
    error::StorageError,
    repositories::{
        PasswordlessTokenRepositoryProvider, RepositoryProvider, TokenRepositoryProvider,
        UserRepositoryProvider,
    },
};
use latchkey_migration::MigrationManager;
use sqlx::PgPool;
use std::sync::Arc;

use crate::migrations::{self, PostgresMigrationManager};

/// Repository provider implementation for Postgres
pub struct PostgresRepositoryProvider {
    pool: PgPool,
    user: Arc<PostgresUserRepository>,
    token: Arc<PostgresTokenRepository>,
    passwordless: Arc<PostgresPasswordlessTokenRepository>,
}

impl PostgresRepositoryProvider {
    pub fn new(pool: PgPool) -> Self {
        let user = Arc::new(PostgresUserRepository::new(pool.clone()));
        let token = Arc::new(PostgresTokenRepository::new(pool.clone()));
        let passwordless = Arc::new(PostgresPasswordlessTokenRepository::new(pool.clone()));

        Self {
            pool,
            user,
            token,
            passwordless,
        }
    }

    /// Connect to `database_url` and wrap the resulting pool.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = PgPool::connect(database_url).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to Postgres");
            Error::Storage(StorageError::Connection(e.to_string()))
        })?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl UserRepositoryProvider for PostgresRepositoryProvider {
    type UserRepo = PostgresUserRepository;

    fn user(&self) -> &Self::UserRepo {
        &self.user
    }
}

impl TokenRepositoryProvider for PostgresRepositoryProvider {
    type TokenRepo = PostgresTokenRepository;

    fn token(&self) -> &Self::TokenRepo {
        &self.token
    }
}

impl PasswordlessTokenRepositoryProvider for PostgresRepositoryProvider {
    type PasswordlessRepo = PostgresPasswordlessTokenRepository;

    fn passwordless(&self) -> &Self::PasswordlessRepo {
        &self.passwordless
    }
}

#[async_trait]
impl RepositoryProvider for PostgresRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = PostgresMigrationManager::new(self.pool.clone());
        manager.migrate(&migrations::all()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::from(e)
        })
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Connection(e.to_string())))?;
        Ok(())
    }
}
