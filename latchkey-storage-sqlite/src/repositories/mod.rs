//! Repository implementations for SQLite storage

pub mod passwordless;
pub mod token;
pub mod user;

pub use passwordless::SqlitePasswordlessTokenRepository;
pub use token::SqliteTokenRepository;
pub use user::SqliteUserRepository;

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
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::migrations::{self, SqliteMigrationManager};

/// Repository provider implementation for SQLite
///
/// Every repository shares the one pool, so a single `sqlite::memory:` pool
/// behaves as one database.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    user: Arc<SqliteUserRepository>,
    token: Arc<SqliteTokenRepository>,
    passwordless: Arc<SqlitePasswordlessTokenRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let user = Arc::new(SqliteUserRepository::new(pool.clone()));
        let token = Arc::new(SqliteTokenRepository::new(pool.clone()));
        let passwordless = Arc::new(SqlitePasswordlessTokenRepository::new(pool.clone()));

        Self {
            pool,
            user,
            token,
            passwordless,
        }
    }

    /// Connect to `database_url` and wrap the resulting pool.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(database_url).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            Error::Storage(StorageError::Connection(e.to_string()))
        })?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl UserRepositoryProvider for SqliteRepositoryProvider {
    type UserRepo = SqliteUserRepository;

    fn user(&self) -> &Self::UserRepo {
        &self.user
    }
}

impl TokenRepositoryProvider for SqliteRepositoryProvider {
    type TokenRepo = SqliteTokenRepository;

    fn token(&self) -> &Self::TokenRepo {
        &self.token
    }
}

impl PasswordlessTokenRepositoryProvider for SqliteRepositoryProvider {
    type PasswordlessRepo = SqlitePasswordlessTokenRepository;

    fn passwordless(&self) -> &Self::PasswordlessRepo {
        &self.passwordless
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
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
