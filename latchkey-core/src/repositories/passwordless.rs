use crate::{
    Error,
    token::{NewPasswordlessToken, PasswordlessToken, PasswordlessTokenId},
};
use async_trait::async_trait;

/// Repository for magic link tokens
#[async_trait]
pub trait PasswordlessTokenRepository: Send + Sync + 'static {
    async fn create(&self, token: NewPasswordlessToken) -> Result<PasswordlessToken, Error>;

    async fn find_by_token(&self, token: &str) -> Result<Option<PasswordlessToken>, Error>;

    /// Delete a token. Returns `true` only for the call that removed the row.
    async fn delete(&self, id: &PasswordlessTokenId) -> Result<bool, Error>;

    async fn delete_expired(&self) -> Result<u64, Error>;
}
