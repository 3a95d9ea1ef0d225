//! Postgres storage backend
//!
//! Timestamps are `TIMESTAMPTZ` and metadata maps are `JSONB`. Uniqueness is
//! enforced by named constraints so write failures can be classified.
mod migrations;
pub mod repositories;

pub use repositories::{
    PostgresPasswordlessTokenRepository, PostgresRepositoryProvider, PostgresTokenRepository,
    PostgresUserRepository,
};

use latchkey_core::{
    Error,
    error::{AuthError, StorageError},
};

const USERS_EMAIL_KEY: &str = "users_email_key";

/// Classify a failed write by the constraint it tripped.
pub(crate) fn map_write_err(e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            if db.constraint() == Some(USERS_EMAIL_KEY) {
                return AuthError::EmailAlreadyExists.into();
            }
            return StorageError::Constraint(db.message().to_string()).into();
        }
        if db.is_foreign_key_violation() {
            return StorageError::Constraint(db.message().to_string()).into();
        }
    }
    tracing::error!(error = %e, "Postgres write failed");
    StorageError::Database(e.to_string()).into()
}
