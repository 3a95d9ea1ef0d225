//! SQLite storage backend
//!
//! Timestamps are stored as unix seconds and metadata maps as JSON text.
//!
//! ```rust,no_run
//! use latchkey_core::RepositoryProvider;
//! use latchkey_storage_sqlite::SqliteRepositoryProvider;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = sqlx::SqlitePool::connect("sqlite://latchkey.db?mode=rwc").await?;
//! let repositories = SqliteRepositoryProvider::new(pool);
//! repositories.migrate().await?;
//! # Ok(())
//! # }
//! ```
mod migrations;
pub mod repositories;

pub use repositories::{
    SqlitePasswordlessTokenRepository, SqliteRepositoryProvider, SqliteTokenRepository,
    SqliteUserRepository,
};

use chrono::{DateTime, Utc};
use latchkey_core::{Error, Metadata, error::StorageError};

pub(crate) fn from_unix(timestamp: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
        StorageError::Database(format!("timestamp out of range: {timestamp}")).into()
    })
}

pub(crate) fn decode_metadata(raw: &str) -> Result<Metadata, Error> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Database(format!("corrupt metadata: {e}")).into())
}

pub(crate) fn encode_metadata(metadata: &Metadata) -> Result<String, Error> {
    serde_json::to_string(metadata)
        .map_err(|e| StorageError::Database(format!("unencodable metadata: {e}")).into())
}

/// Classify a failed write. Unique violations on `users.email` become
/// `EmailAlreadyExists`; other unique violations become constraint errors.
pub(crate) fn map_write_err(e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            if db.message().contains("users.email") {
                return latchkey_core::error::AuthError::EmailAlreadyExists.into();
            }
            return StorageError::Constraint(db.message().to_string()).into();
        }
        if db.is_foreign_key_violation() {
            return StorageError::Constraint(db.message().to_string()).into();
        }
    }
    tracing::error!(error = %e, "SQLite write failed");
    StorageError::Database(e.to_string()).into()
}
