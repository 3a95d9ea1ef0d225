//! Versioned schema migrations shared by the SQL storage backends
//!
//! Each backend implements [`MigrationManager`] for its database and lists
//! its [`Migration`]s in version order. Applied versions are recorded in a
//! tracking table so `up` only runs what is missing.
use async_trait::async_trait;
use latchkey_core::error::StorageError;
use sqlx::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<MigrationError> for latchkey_core::Error {
    fn from(e: MigrationError) -> Self {
        latchkey_core::Error::Storage(StorageError::Migration(e.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Ordering key, unique per backend
    fn version(&self) -> i64;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// Unix seconds, the one timestamp type every backend agrees on
    pub applied_at: i64,
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        "_latchkey_migrations"
    }

    /// Create the tracking table if needed
    async fn initialize(&self) -> Result<()>;

    /// Apply every migration that is not yet recorded, in slice order
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Roll back every recorded migration in the slice, in slice order
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    async fn is_applied(&self, version: i64) -> Result<bool>;

    /// Initialize tracking and apply everything pending
    async fn migrate(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()> {
        self.initialize().await?;
        self.up(migrations).await?;
        tracing::info!(
            table = self.get_migration_table_name(),
            count = migrations.len(),
            "Schema is up to date"
        );
        Ok(())
    }
}
