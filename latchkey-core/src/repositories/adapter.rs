use crate::{
    Error, User, UserId,
    repositories::{
        PasswordlessTokenRepository, RepositoryProvider, TokenRepository, UserRepository,
    },
    token::{NewPasswordlessToken, NewToken, PasswordlessToken, PasswordlessTokenId, Token, TokenId},
    user::NewUser,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Adapter that wraps a RepositoryProvider and implements UserRepository
pub struct UserRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> UserRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> UserRepository for UserRepositoryAdapter<R> {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        self.provider.user().create(user).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.provider.user().find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.provider.user().find_by_email(email).await
    }

    async fn find_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, Error> {
        self.provider
            .user()
            .find_by_provider(provider, provider_id)
            .await
    }

    async fn update(&self, user: &User) -> Result<User, Error> {
        self.provider.user().update(user).await
    }

    async fn delete(&self, id: &UserId) -> Result<(), Error> {
        self.provider.user().delete(id).await
    }
}

pub struct TokenRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> TokenRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> TokenRepository for TokenRepositoryAdapter<R> {
    async fn create(&self, token: NewToken) -> Result<Token, Error> {
        self.provider.token().create(token).await
    }

    async fn find_by_id(&self, id: &TokenId) -> Result<Option<Token>, Error> {
        self.provider.token().find_by_id(id).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Token>, Error> {
        self.provider.token().find_by_token(token).await
    }

    async fn revoke(&self, id: &TokenId) -> Result<bool, Error> {
        self.provider.token().revoke(id).await
    }

    async fn delete(&self, id: &TokenId) -> Result<(), Error> {
        self.provider.token().delete(id).await
    }

    async fn delete_expired(&self) -> Result<u64, Error> {
        self.provider.token().delete_expired().await
    }
}

pub struct PasswordlessTokenRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> PasswordlessTokenRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> PasswordlessTokenRepository for PasswordlessTokenRepositoryAdapter<R> {
    async fn create(&self, token: NewPasswordlessToken) -> Result<PasswordlessToken, Error> {
        self.provider.passwordless().create(token).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PasswordlessToken>, Error> {
        self.provider.passwordless().find_by_token(token).await
    }

    async fn delete(&self, id: &PasswordlessTokenId) -> Result<bool, Error> {
        self.provider.passwordless().delete(id).await
    }

    async fn delete_expired(&self) -> Result<u64, Error> {
        self.provider.passwordless().delete_expired().await
    }
}
