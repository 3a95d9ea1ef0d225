use crate::{
    Error, User,
    crypto::generate_opaque_token,
    error::{AuthError, TokenError},
    mailer::{MailMessage, MailSender},
    password::hash_password,
    repositories::{TokenRepository, UserRepository},
    token::{NewToken, TokenType},
    validation::validate_password,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Password reset tokens: spent by revoking the row, which is kept
pub struct PasswordResetService<U: UserRepository, T: TokenRepository> {
    user_repository: Arc<U>,
    token_repository: Arc<T>,
    mailer: Arc<dyn MailSender>,
    token_ttl: Duration,
    min_password_length: usize,
}

impl<U: UserRepository, T: TokenRepository> PasswordResetService<U, T> {
    pub fn new(
        user_repository: Arc<U>,
        token_repository: Arc<T>,
        mailer: Arc<dyn MailSender>,
        token_ttl: Duration,
        min_password_length: usize,
    ) -> Self {
        Self {
            user_repository,
            token_repository,
            mailer,
            token_ttl,
            min_password_length,
        }
    }

    /// Mail a reset token to `email`.
    ///
    /// Succeeds without doing anything when no user has that email, so the
    /// caller cannot learn whether an account exists.
    pub async fn request(&self, email: &str) -> Result<(), Error> {
        let Some(user) = self.user_repository.find_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = NewToken::new(
            user.id.clone(),
            generate_opaque_token()?,
            TokenType::PasswordReset,
            Utc::now() + self.token_ttl,
        )?;
        let token = self.token_repository.create(token).await?;

        MailMessage::password_reset(&user.email, &token.token)
            .send_with(self.mailer.as_ref())
            .await?;
        tracing::info!(user_id = %user.id, token_id = %token.id, "Sent password reset token");
        Ok(())
    }

    /// Spend a reset token and set a new password.
    ///
    /// Only the caller that revokes the token applies the new password.
    pub async fn confirm(&self, token: &str, new_password: &str) -> Result<User, Error> {
        validate_password(new_password, self.min_password_length)?;

        let record = self
            .token_repository
            .find_by_token(token)
            .await?
            .filter(|t| t.token_type == TokenType::PasswordReset)
            .ok_or(TokenError::InvalidToken)?;

        if record.revoked {
            return Err(TokenError::TokenRevoked.into());
        }
        if record.is_expired() {
            return Err(TokenError::TokenExpired.into());
        }

        let password_hash = hash_password(new_password).await?;

        if !self.token_repository.revoke(&record.id).await? {
            tracing::debug!(token_id = %record.id, "Password reset token already used");
            return Err(TokenError::TokenRevoked.into());
        }

        let mut user = self
            .user_repository
            .find_by_id(&record.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        user.password_hash = Some(password_hash);
        let user = self.user_repository.update(&user).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ValidationError,
        mailer::RecordingMailSender,
        password::verify_password,
        repositories::{
            MemoryRepositoryProvider, TokenRepositoryAdapter, TokenRepositoryProvider,
            UserRepositoryAdapter, UserRepositoryProvider,
        },
        user::NewUser,
    };

    type Service = PasswordResetService<
        UserRepositoryAdapter<MemoryRepositoryProvider>,
        TokenRepositoryAdapter<MemoryRepositoryProvider>,
    >;

    async fn setup() -> (Arc<MemoryRepositoryProvider>, RecordingMailSender, Service, User) {
        let provider = Arc::new(MemoryRepositoryProvider::new());
        let mailer = RecordingMailSender::new();
        let service = PasswordResetService::new(
            Arc::new(UserRepositoryAdapter::new(provider.clone())),
            Arc::new(TokenRepositoryAdapter::new(provider.clone())),
            Arc::new(mailer.clone()),
            Duration::hours(1),
            1,
        );
        let user = provider
            .user()
            .create(
                NewUser::local("u@test.com")
                    .unwrap()
                    .with_password_hash(hash_password("old").await.unwrap()),
            )
            .await
            .unwrap();
        (provider, mailer, service, user)
    }

    fn token_from(body: &str) -> String {
        body.rsplit(": ").next().unwrap().to_string()
    }

    async fn stored_hash(provider: &MemoryRepositoryProvider, user: &User) -> String {
        provider
            .user()
            .find_by_id(&user.id)
            .await
            .unwrap()
            .unwrap()
            .password_hash
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_email_is_silent() {
        let (_, mailer, service, _) = setup().await;
        service.request("ghost@test.com").await.unwrap();
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_request_persists_reset_token() {
        let (provider, mailer, service, user) = setup().await;
        service.request("u@test.com").await.unwrap();

        let message = mailer.last().await.unwrap();
        assert_eq!(message.subject, "Password Reset Request");
        let stored = provider
            .token()
            .find_by_token(&token_from(&message.body))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, user.id);
        assert_eq!(stored.token_type, TokenType::PasswordReset);
        assert!(stored.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_is_exactly_once() {
        let (provider, mailer, service, user) = setup().await;
        service.request("u@test.com").await.unwrap();
        let token = token_from(&mailer.last().await.unwrap().body);

        service.confirm(&token, "first").await.unwrap();
        let second = service.confirm(&token, "second").await;
        assert!(matches!(second, Err(Error::Token(TokenError::TokenRevoked))));

        let hash = stored_hash(&provider, &user).await;
        assert!(verify_password(&hash, "first").await);
        assert!(!verify_password(&hash, "second").await);

        // Spent reset tokens are kept, marked revoked.
        let record = provider.token().find_by_token(&token).await.unwrap().unwrap();
        assert!(record.revoked);
    }

    #[tokio::test]
    async fn test_confirm_rejects_unknown_and_expired_tokens() {
        let (provider, _, service, user) = setup().await;
        assert!(matches!(
            service.confirm("nope", "new").await,
            Err(Error::Token(TokenError::InvalidToken))
        ));

        provider
            .token()
            .create(
                NewToken::new(
                    user.id.clone(),
                    "stale".to_string(),
                    TokenType::PasswordReset,
                    Utc::now() - Duration::minutes(1),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        assert!(matches!(
            service.confirm("stale", "new").await,
            Err(Error::Token(TokenError::TokenExpired))
        ));
        assert!(verify_password(&stored_hash(&provider, &user).await, "old").await);
    }

    #[tokio::test]
    async fn test_refresh_token_cannot_reset_password() {
        let (provider, _, service, user) = setup().await;
        provider
            .token()
            .create(
                NewToken::new(
                    user.id.clone(),
                    "refresh".to_string(),
                    TokenType::Refresh,
                    Utc::now() + Duration::days(1),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        assert!(matches!(
            service.confirm("refresh", "new").await,
            Err(Error::Token(TokenError::InvalidToken))
        ));
    }

    #[tokio::test]
    async fn test_invalid_password_does_not_spend_token() {
        let (_, mailer, service, _) = setup().await;
        service.request("u@test.com").await.unwrap();
        let token = token_from(&mailer.last().await.unwrap().body);

        assert!(matches!(
            service.confirm(&token, "").await,
            Err(Error::Validation(ValidationError::MissingField(_)))
        ));
        assert!(service.confirm(&token, "new").await.is_ok());
    }
}
