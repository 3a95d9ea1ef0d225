use crate::{
    Error, User,
    crypto::generate_opaque_token,
    error::{AuthError, TokenError},
    jwt::{AccessTokenClaims, AccessTokenCodec},
    repositories::{TokenRepository, UserRepository},
    token::{NewToken, TokenResponse, TokenType},
};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Issues, refreshes and revokes access/refresh token pairs
///
/// Refresh tokens are not rotated: a refresh returns a new access token
/// together with the refresh token that was presented.
pub struct TokenService<U: UserRepository, T: TokenRepository> {
    user_repository: Arc<U>,
    token_repository: Arc<T>,
    codec: AccessTokenCodec,
    refresh_token_ttl: Duration,
}

impl<U: UserRepository, T: TokenRepository> TokenService<U, T> {
    pub fn new(
        user_repository: Arc<U>,
        token_repository: Arc<T>,
        codec: AccessTokenCodec,
        refresh_token_ttl: Duration,
    ) -> Self {
        Self {
            user_repository,
            token_repository,
            codec,
            refresh_token_ttl,
        }
    }

    /// Mint an access token and persist a fresh refresh token for `user`.
    pub async fn issue(&self, user: &User) -> Result<TokenResponse, Error> {
        let (access_token, _) = self.codec.issue_access_token(user)?;

        let refresh = NewToken::new(
            user.id.clone(),
            generate_opaque_token()?,
            TokenType::Refresh,
            Utc::now() + self.refresh_token_ttl,
        )?;
        let refresh = self.token_repository.create(refresh).await?;

        tracing::info!(user_id = %user.id, token_id = %refresh.id, "Issued token pair");
        Ok(TokenResponse::bearer(
            access_token,
            refresh.token,
            self.codec.lifetime().num_seconds(),
        ))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Checks, in order: the token exists and is a refresh token, it is not
    /// revoked, it has not expired.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        let token = self
            .token_repository
            .find_by_token(refresh_token)
            .await?
            .filter(|t| t.token_type == TokenType::Refresh)
            .ok_or(TokenError::InvalidRefreshToken)?;

        if token.revoked {
            tracing::debug!(token_id = %token.id, "Refresh with revoked token");
            return Err(TokenError::TokenRevoked.into());
        }
        if token.is_expired() {
            tracing::debug!(token_id = %token.id, "Refresh with expired token");
            return Err(TokenError::TokenExpired.into());
        }

        let user = self
            .user_repository
            .find_by_id(&token.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let (access_token, _) = self.codec.issue_access_token(&user)?;

        Ok(TokenResponse::bearer(
            access_token,
            token.token,
            self.codec.lifetime().num_seconds(),
        ))
    }

    /// Revoke a refresh token. Revoking twice is not an error.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), Error> {
        let token = self
            .token_repository
            .find_by_token(refresh_token)
            .await?
            .filter(|t| t.token_type == TokenType::Refresh)
            .ok_or(TokenError::InvalidRefreshToken)?;

        if self.token_repository.revoke(&token.id).await? {
            tracing::info!(user_id = %token.user_id, token_id = %token.id, "Revoked refresh token");
        }
        Ok(())
    }

    pub fn validate_access_token(&self, access_token: &str) -> Result<AccessTokenClaims, Error> {
        self.codec.validate_access_token(access_token)
    }

    /// Delete refresh and password reset tokens past their expiry.
    pub async fn cleanup_expired_tokens(&self) -> Result<u64, Error> {
        self.token_repository.delete_expired().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jwt::JwtConfig,
        repositories::{
            MemoryRepositoryProvider, TokenRepositoryAdapter, TokenRepositoryProvider,
            UserRepositoryAdapter, UserRepositoryProvider,
        },
        user::NewUser,
    };

    type Service = TokenService<
        UserRepositoryAdapter<MemoryRepositoryProvider>,
        TokenRepositoryAdapter<MemoryRepositoryProvider>,
    >;

    async fn setup() -> (Arc<MemoryRepositoryProvider>, Service, User) {
        let provider = Arc::new(MemoryRepositoryProvider::new());
        let codec = AccessTokenCodec::new(
            &JwtConfig::new(b"token-service-test-secret".to_vec()),
            Duration::hours(1),
        )
        .unwrap();
        let service = TokenService::new(
            Arc::new(UserRepositoryAdapter::new(provider.clone())),
            Arc::new(TokenRepositoryAdapter::new(provider.clone())),
            codec,
            Duration::days(30),
        );
        let user = provider
            .user()
            .create(NewUser::local("u@test.com").unwrap())
            .await
            .unwrap();
        (provider, service, user)
    }

    #[tokio::test]
    async fn test_issue_persists_refresh_token() {
        let (provider, service, user) = setup().await;
        let response = service.issue(&user).await.unwrap();

        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 3600);

        let stored = provider
            .token()
            .find_by_token(&response.refresh_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, user.id);
        assert_eq!(stored.token_type, TokenType::Refresh);
        assert!(!stored.revoked);
        let ttl = stored.expires_at - Utc::now();
        assert!(ttl > Duration::days(29) && ttl <= Duration::days(30));

        let claims = service.validate_access_token(&response.access_token).unwrap();
        assert_eq!(claims.sub, user.id.as_str());
    }

    #[tokio::test]
    async fn test_refresh_returns_same_refresh_token() {
        let (_, service, user) = setup().await;
        let issued = service.issue(&user).await.unwrap();

        let refreshed = service.refresh(&issued.refresh_token).await.unwrap();
        assert_eq!(refreshed.refresh_token, issued.refresh_token);
        let claims = service.validate_access_token(&refreshed.access_token).unwrap();
        assert_eq!(claims.sub, user.id.as_str());
    }

    #[tokio::test]
    async fn test_refresh_unknown_token() {
        let (_, service, _) = setup().await;
        let result = service.refresh("does-not-exist").await;
        assert!(matches!(
            result,
            Err(Error::Token(TokenError::InvalidRefreshToken))
        ));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent_and_final() {
        let (_, service, user) = setup().await;
        let issued = service.issue(&user).await.unwrap();

        service.revoke(&issued.refresh_token).await.unwrap();
        service.revoke(&issued.refresh_token).await.unwrap();

        let result = service.refresh(&issued.refresh_token).await;
        assert!(matches!(result, Err(Error::Token(TokenError::TokenRevoked))));
    }

    #[tokio::test]
    async fn test_revoked_is_reported_before_expired() {
        let (provider, service, user) = setup().await;
        let stale = provider
            .token()
            .create(
                NewToken::new(
                    user.id.clone(),
                    "stale".to_string(),
                    TokenType::Refresh,
                    Utc::now() - Duration::minutes(1),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        let result = service.refresh("stale").await;
        assert!(matches!(result, Err(Error::Token(TokenError::TokenExpired))));

        provider.token().revoke(&stale.id).await.unwrap();
        let result = service.refresh("stale").await;
        assert!(matches!(result, Err(Error::Token(TokenError::TokenRevoked))));
    }

    #[tokio::test]
    async fn test_reset_token_is_not_a_refresh_token() {
        let (provider, service, user) = setup().await;
        provider
            .token()
            .create(
                NewToken::new(
                    user.id.clone(),
                    "reset".to_string(),
                    TokenType::PasswordReset,
                    Utc::now() + Duration::hours(1),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        assert!(matches!(
            service.refresh("reset").await,
            Err(Error::Token(TokenError::InvalidRefreshToken))
        ));
        assert!(matches!(
            service.revoke("reset").await,
            Err(Error::Token(TokenError::InvalidRefreshToken))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_both_succeed() {
        let (_, service, user) = setup().await;
        let issued = service.issue(&user).await.unwrap();

        let (a, b) = tokio::join!(
            service.refresh(&issued.refresh_token),
            service.refresh(&issued.refresh_token)
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_expired_tokens() {
        let (provider, service, user) = setup().await;
        provider
            .token()
            .create(
                NewToken::new(
                    user.id.clone(),
                    "stale".to_string(),
                    TokenType::Refresh,
                    Utc::now() - Duration::minutes(1),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        let live = service.issue(&user).await.unwrap();

        assert_eq!(service.cleanup_expired_tokens().await.unwrap(), 1);
        assert!(service.refresh(&live.refresh_token).await.is_ok());
    }
}
