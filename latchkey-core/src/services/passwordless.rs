use crate::{
    Error,
    crypto::generate_opaque_token,
    error::TokenError,
    mailer::{MailMessage, MailSender},
    repositories::PasswordlessTokenRepository,
    token::NewPasswordlessToken,
    validation::validate_email,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Magic link tokens: requested by email, spent by deleting the row
pub struct PasswordlessService<P: PasswordlessTokenRepository> {
    passwordless_repository: Arc<P>,
    mailer: Arc<dyn MailSender>,
    base_url: String,
    token_ttl: Duration,
}

impl<P: PasswordlessTokenRepository> PasswordlessService<P> {
    pub fn new(
        passwordless_repository: Arc<P>,
        mailer: Arc<dyn MailSender>,
        base_url: String,
        token_ttl: Duration,
    ) -> Self {
        Self {
            passwordless_repository,
            mailer,
            base_url,
            token_ttl,
        }
    }

    /// Create a magic link token for `email` and mail it.
    ///
    /// The user does not need to exist yet.
    pub async fn request(&self, email: &str) -> Result<(), Error> {
        validate_email(email)?;

        let token = NewPasswordlessToken::new(
            email,
            generate_opaque_token()?,
            Utc::now() + self.token_ttl,
        )?;
        let token = self.passwordless_repository.create(token).await?;

        MailMessage::magic_link(email, &self.base_url, &token.token)
            .send_with(self.mailer.as_ref())
            .await?;
        tracing::info!(token_id = %token.id.as_str(), "Sent magic link");
        Ok(())
    }

    /// Spend a magic link token, returning the email it was issued for.
    ///
    /// Only one caller can spend a token; every later attempt fails with
    /// [`TokenError::InvalidToken`].
    pub async fn consume(&self, token: &str) -> Result<String, Error> {
        let record = self
            .passwordless_repository
            .find_by_token(token)
            .await?
            .ok_or(TokenError::InvalidToken)?;

        if record.is_expired() {
            self.passwordless_repository.delete(&record.id).await?;
            return Err(TokenError::TokenExpired.into());
        }

        if !self.passwordless_repository.delete(&record.id).await? {
            tracing::debug!(token_id = %record.id.as_str(), "Magic link already consumed");
            return Err(TokenError::InvalidToken.into());
        }

        Ok(record.email)
    }

    pub async fn cleanup_expired_tokens(&self) -> Result<u64, Error> {
        self.passwordless_repository.delete_expired().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mailer::RecordingMailSender,
        repositories::{
            MemoryRepositoryProvider, PasswordlessTokenRepositoryAdapter,
            PasswordlessTokenRepositoryProvider, UserRepository, UserRepositoryProvider,
        },
    };

    fn setup() -> (
        Arc<MemoryRepositoryProvider>,
        RecordingMailSender,
        PasswordlessService<PasswordlessTokenRepositoryAdapter<MemoryRepositoryProvider>>,
    ) {
        let provider = Arc::new(MemoryRepositoryProvider::new());
        let mailer = RecordingMailSender::new();
        let service = PasswordlessService::new(
            Arc::new(PasswordlessTokenRepositoryAdapter::new(provider.clone())),
            Arc::new(mailer.clone()),
            "https://auth.example.com".to_string(),
            Duration::minutes(15),
        );
        (provider, mailer, service)
    }

    fn token_from(body: &str) -> String {
        body.rsplit("token=").next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_request_mails_token_without_creating_user() {
        let (provider, mailer, service) = setup();
        service.request("new@test.com").await.unwrap();

        let message = mailer.last().await.unwrap();
        assert_eq!(message.to, "new@test.com");
        assert_eq!(message.subject, "Magic Link Login");
        assert!(
            message
                .body
                .contains("https://auth.example.com/auth/passwordless/login?token=")
        );

        let token = token_from(&message.body);
        let stored = provider
            .passwordless()
            .find_by_token(&token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.email, "new@test.com");
        let ttl = stored.expires_at - Utc::now();
        assert!(ttl > Duration::minutes(14) && ttl <= Duration::minutes(15));

        assert!(
            provider
                .user()
                .find_by_email("new@test.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_consume_is_exactly_once() {
        let (_, mailer, service) = setup();
        service.request("new@test.com").await.unwrap();
        let token = token_from(&mailer.last().await.unwrap().body);

        assert_eq!(service.consume(&token).await.unwrap(), "new@test.com");
        assert!(matches!(
            service.consume(&token).await,
            Err(Error::Token(TokenError::InvalidToken))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_is_deleted() {
        let (provider, _, service) = setup();
        provider
            .passwordless()
            .create(
                NewPasswordlessToken::new(
                    "late@test.com",
                    "stale".to_string(),
                    Utc::now() - Duration::seconds(1),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        assert!(matches!(
            service.consume("stale").await,
            Err(Error::Token(TokenError::TokenExpired))
        ));
        assert!(
            provider
                .passwordless()
                .find_by_token("stale")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_request_rejects_invalid_email() {
        let (_, mailer, service) = setup();
        assert!(service.request("not-an-email").await.is_err());
        assert!(mailer.sent().await.is_empty());
    }
}
