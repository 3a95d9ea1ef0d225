use crate::{
    Error,
    token::{NewToken, Token, TokenId},
};
use async_trait::async_trait;

/// Repository for refresh and password reset tokens
#[async_trait]
pub trait TokenRepository: Send + Sync + 'static {
    async fn create(&self, token: NewToken) -> Result<Token, Error>;

    async fn find_by_id(&self, id: &TokenId) -> Result<Option<Token>, Error>;

    /// Look up a token by its secret value
    async fn find_by_token(&self, token: &str) -> Result<Option<Token>, Error>;

    /// Mark a token revoked.
    ///
    /// Returns `true` only for the call that moved the row from unrevoked to
    /// revoked, so concurrent consumers can tell who won. Revoking an already
    /// revoked or missing token returns `false`.
    async fn revoke(&self, id: &TokenId) -> Result<bool, Error>;

    async fn delete(&self, id: &TokenId) -> Result<(), Error>;

    /// Delete every token whose expiry has passed, returning how many went.
    async fn delete_expired(&self) -> Result<u64, Error>;
}
