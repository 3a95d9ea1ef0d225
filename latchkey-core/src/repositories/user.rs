use crate::{Error, User, UserId, user::NewUser};
use async_trait::async_trait;

/// Repository for user records
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Insert a user.
    ///
    /// Fails with `AuthError::EmailAlreadyExists` when the email is taken. The
    /// unique constraint in storage decides, not a prior lookup.
    async fn create(&self, user: NewUser) -> Result<User, Error>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    /// Find the user linked to a federated account
    async fn find_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, Error>;

    /// Persist every mutable field of `user` and bump `updated_at`.
    ///
    /// Fails with `StorageError::NotFound` if the user does not exist.
    async fn update(&self, user: &User) -> Result<User, Error>;

    /// Delete a user and, through cascading, its tokens.
    async fn delete(&self, id: &UserId) -> Result<(), Error>;
}
