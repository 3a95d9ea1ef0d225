//! Repository traits for the persistence layer
//!
//! - Individual `*Repository` traits define the operations for each record type
//! - Individual `*RepositoryProvider` traits expose each repository
//! - [`RepositoryProvider`] combines the provider traits with lifecycle methods
//!
//! Lookups that miss return `Ok(None)`. Storage failures are
//! `Error::Storage`. Services never branch on the backing dialect.

pub mod adapter;
pub mod memory;
pub mod passwordless;
pub mod token;
pub mod user;

pub use adapter::{
    PasswordlessTokenRepositoryAdapter, TokenRepositoryAdapter, UserRepositoryAdapter,
};
pub use memory::MemoryRepositoryProvider;
pub use passwordless::PasswordlessTokenRepository;
pub use token::TokenRepository;
pub use user::UserRepository;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for user repository access.
pub trait UserRepositoryProvider: Send + Sync + 'static {
    type UserRepo: UserRepository;

    fn user(&self) -> &Self::UserRepo;
}

/// Provider trait for refresh and password reset token access.
pub trait TokenRepositoryProvider: Send + Sync + 'static {
    type TokenRepo: TokenRepository;

    fn token(&self) -> &Self::TokenRepo;
}

/// Provider trait for magic link token access.
pub trait PasswordlessTokenRepositoryProvider: Send + Sync + 'static {
    type PasswordlessRepo: PasswordlessTokenRepository;

    fn passwordless(&self) -> &Self::PasswordlessRepo;
}

/// Everything the engine needs from a storage backend.
#[async_trait]
pub trait RepositoryProvider:
    UserRepositoryProvider + TokenRepositoryProvider + PasswordlessTokenRepositoryProvider
{
    /// Create or upgrade the schema.
    async fn migrate(&self) -> Result<(), Error>;

    /// Verify the backend is reachable.
    async fn health_check(&self) -> Result<(), Error>;
}
