//! In-process repository backend
//!
//! All three repositories share one lock, so every operation is atomic and
//! deleting a user removes its tokens. Nothing survives a restart.
use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    Error, User, UserId,
    error::{AuthError, StorageError},
    repositories::{
        PasswordlessTokenRepository, PasswordlessTokenRepositoryProvider, RepositoryProvider,
        TokenRepository, TokenRepositoryProvider, UserRepository, UserRepositoryProvider,
    },
    token::{NewPasswordlessToken, NewToken, PasswordlessToken, PasswordlessTokenId, Token, TokenId},
    user::NewUser,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    tokens: HashMap<TokenId, Token>,
    passwordless: HashMap<PasswordlessTokenId, PasswordlessToken>,
}

impl MemoryState {
    fn email_taken(&self, email: &str, except: Option<&UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(&u.id) != except)
    }

    fn provider_taken(&self, provider: &str, provider_id: &str, except: Option<&UserId>) -> bool {
        self.users.values().any(|u| {
            u.provider == provider
                && u.provider_id.as_deref() == Some(provider_id)
                && Some(&u.id) != except
        })
    }
}

type SharedState = Arc<Mutex<MemoryState>>;

pub struct MemoryUserRepository {
    state: SharedState,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        let mut state = self.state.lock().await;
        if state.email_taken(&user.email, None) {
            return Err(AuthError::EmailAlreadyExists.into());
        }
        if let Some(provider_id) = &user.provider_id {
            if state.provider_taken(&user.provider, provider_id, None) {
                return Err(StorageError::Constraint(format!(
                    "{} account {provider_id} is already linked",
                    user.provider
                ))
                .into());
            }
        }

        let now = Utc::now();
        let user = User {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            provider: user.provider,
            provider_id: user.provider_id,
            email_verified: user.email_verified,
            app_metadata: user.app_metadata,
            user_metadata: user.user_metadata,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.provider == provider && u.provider_id.as_deref() == Some(provider_id))
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<User, Error> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&user.id) {
            return Err(StorageError::NotFound.into());
        }
        if state.email_taken(&user.email, Some(&user.id)) {
            return Err(AuthError::EmailAlreadyExists.into());
        }
        if let Some(provider_id) = &user.provider_id {
            if state.provider_taken(&user.provider, provider_id, Some(&user.id)) {
                return Err(StorageError::Constraint(format!(
                    "{} account {provider_id} is already linked",
                    user.provider
                ))
                .into());
            }
        }

        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        state.users.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: &UserId) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.users.remove(id);
        state.tokens.retain(|_, t| &t.user_id != id);
        Ok(())
    }
}

pub struct MemoryTokenRepository {
    state: SharedState,
}

#[async_trait]
impl TokenRepository for MemoryTokenRepository {
    async fn create(&self, token: NewToken) -> Result<Token, Error> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&token.user_id) {
            return Err(StorageError::Constraint(format!("unknown user {}", token.user_id)).into());
        }
        if state.tokens.values().any(|t| t.token == token.token) {
            return Err(StorageError::Constraint("duplicate token value".to_string()).into());
        }

        let token = Token {
            id: token.id,
            user_id: token.user_id,
            token: token.token,
            token_type: token.token_type,
            expires_at: token.expires_at,
            created_at: Utc::now(),
            revoked: false,
            metadata: token.metadata,
        };
        state.tokens.insert(token.id.clone(), token.clone());
        Ok(token)
    }

    async fn find_by_id(&self, id: &TokenId) -> Result<Option<Token>, Error> {
        Ok(self.state.lock().await.tokens.get(id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Token>, Error> {
        let state = self.state.lock().await;
        Ok(state.tokens.values().find(|t| t.token == token).cloned())
    }

    async fn revoke(&self, id: &TokenId) -> Result<bool, Error> {
        let mut state = self.state.lock().await;
        match state.tokens.get_mut(id) {
            Some(token) if !token.revoked => {
                token.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: &TokenId) -> Result<(), Error> {
        self.state.lock().await.tokens.remove(id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, Error> {
        let mut state = self.state.lock().await;
        let before = state.tokens.len();
        state.tokens.retain(|_, t| !t.is_expired());
        Ok((before - state.tokens.len()) as u64)
    }
}

pub struct MemoryPasswordlessTokenRepository {
    state: SharedState,
}

#[async_trait]
impl PasswordlessTokenRepository for MemoryPasswordlessTokenRepository {
    async fn create(&self, token: NewPasswordlessToken) -> Result<PasswordlessToken, Error> {
        let mut state = self.state.lock().await;
        if state.passwordless.values().any(|t| t.token == token.token) {
            return Err(StorageError::Constraint("duplicate token value".to_string()).into());
        }

        let token = PasswordlessToken {
            id: token.id,
            email: token.email,
            token: token.token,
            expires_at: token.expires_at,
            created_at: Utc::now(),
        };
        state.passwordless.insert(token.id.clone(), token.clone());
        Ok(token)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PasswordlessToken>, Error> {
        let state = self.state.lock().await;
        Ok(state.passwordless.values().find(|t| t.token == token).cloned())
    }

    async fn delete(&self, id: &PasswordlessTokenId) -> Result<bool, Error> {
        Ok(self.state.lock().await.passwordless.remove(id).is_some())
    }

    async fn delete_expired(&self) -> Result<u64, Error> {
        let mut state = self.state.lock().await;
        let before = state.passwordless.len();
        state.passwordless.retain(|_, t| !t.is_expired());
        Ok((before - state.passwordless.len()) as u64)
    }
}

/// Repository provider that keeps everything in memory
///
/// ```rust
/// use std::sync::Arc;
/// use latchkey_core::repositories::MemoryRepositoryProvider;
///
/// let repositories = Arc::new(MemoryRepositoryProvider::new());
/// ```
pub struct MemoryRepositoryProvider {
    user: MemoryUserRepository,
    token: MemoryTokenRepository,
    passwordless: MemoryPasswordlessTokenRepository,
}

impl MemoryRepositoryProvider {
    pub fn new() -> Self {
        let state = SharedState::default();
        Self {
            user: MemoryUserRepository {
                state: state.clone(),
            },
            token: MemoryTokenRepository {
                state: state.clone(),
            },
            passwordless: MemoryPasswordlessTokenRepository { state },
        }
    }
}

impl Default for MemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl UserRepositoryProvider for MemoryRepositoryProvider {
    type UserRepo = MemoryUserRepository;

    fn user(&self) -> &Self::UserRepo {
        &self.user
    }
}

impl TokenRepositoryProvider for MemoryRepositoryProvider {
    type TokenRepo = MemoryTokenRepository;

    fn token(&self) -> &Self::TokenRepo {
        &self.token
    }
}

impl PasswordlessTokenRepositoryProvider for MemoryRepositoryProvider {
    type PasswordlessRepo = MemoryPasswordlessTokenRepository;

    fn passwordless(&self) -> &Self::PasswordlessRepo {
        &self.passwordless
    }
}

#[async_trait]
impl RepositoryProvider for MemoryRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;
    use chrono::Duration;

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repos = MemoryRepositoryProvider::new();
        repos
            .user()
            .create(NewUser::local("u@test.com").unwrap())
            .await
            .unwrap();

        let result = repos
            .user()
            .create(NewUser::local("u@test.com").unwrap())
            .await;
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::EmailAlreadyExists))
        ));
    }

    #[tokio::test]
    async fn test_revoke_reports_the_winner_once() {
        let repos = MemoryRepositoryProvider::new();
        let user = repos
            .user()
            .create(NewUser::local("u@test.com").unwrap())
            .await
            .unwrap();
        let token = repos
            .token()
            .create(
                NewToken::new(
                    user.id.clone(),
                    "value".to_string(),
                    TokenType::Refresh,
                    Utc::now() + Duration::days(1),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        assert!(repos.token().revoke(&token.id).await.unwrap());
        assert!(!repos.token().revoke(&token.id).await.unwrap());
        assert!(repos.token().find_by_token("value").await.unwrap().unwrap().revoked);
    }

    #[tokio::test]
    async fn test_deleting_user_removes_tokens() {
        let repos = MemoryRepositoryProvider::new();
        let user = repos
            .user()
            .create(NewUser::local("u@test.com").unwrap())
            .await
            .unwrap();
        repos
            .token()
            .create(
                NewToken::new(
                    user.id.clone(),
                    "value".to_string(),
                    TokenType::Refresh,
                    Utc::now() + Duration::days(1),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        repos.user().delete(&user.id).await.unwrap();
        assert!(repos.token().find_by_token("value").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_passwordless_delete_is_single_shot() {
        let repos = MemoryRepositoryProvider::new();
        let token = repos
            .passwordless()
            .create(
                NewPasswordlessToken::new(
                    "new@test.com",
                    "magic".to_string(),
                    Utc::now() + Duration::minutes(15),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        assert!(repos.passwordless().delete(&token.id).await.unwrap());
        assert!(!repos.passwordless().delete(&token.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let repos = MemoryRepositoryProvider::new();
        repos
            .passwordless()
            .create(
                NewPasswordlessToken::new(
                    "old@test.com",
                    "stale".to_string(),
                    Utc::now() - Duration::minutes(1),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        repos
            .passwordless()
            .create(
                NewPasswordlessToken::new(
                    "new@test.com",
                    "fresh".to_string(),
                    Utc::now() + Duration::minutes(15),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(repos.passwordless().delete_expired().await.unwrap(), 1);
        assert!(repos.passwordless().find_by_token("fresh").await.unwrap().is_some());
    }
}
