//! # Latchkey
//!
//! Latchkey is an embeddable token and identity lifecycle engine. It turns
//! an email/password pair, a magic link, or an OAuth2 callback into a user
//! record and an access/refresh token pair, and owns the single-use tokens
//! behind passwordless login and password reset.
//!
//! Latchkey is a library, not a server: HTTP routing, sessions and
//! middleware belong to the application embedding it.
//!
//! ## Collaborators
//!
//! - Storage: any [`RepositoryProvider`]. SQLite and Postgres backends ship
//!   behind the `sqlite` and `postgres` features; an in-memory provider is
//!   always available for tests.
//! - Mail: any [`MailSender`]. SMTP and file delivery ship behind the
//!   `mailer` feature.
//! - OAuth2: any number of [`OAuthProvider`]s. Google, GitHub and Facebook
//!   ship behind the `oauth` feature.
//!
//! ## Accepted risks
//!
//! Access tokens cannot be revoked before they expire, and refresh tokens
//! are not rotated on use. Shorten `access_token_ttl` or add a denylist in
//! the embedding layer if that matters.
//!
//! ## Example
//!
//! ```rust,no_run
//! use latchkey::{AuthConfig, JwtConfig, Latchkey, RecordingMailSender};
//! use latchkey::SqliteRepositoryProvider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), latchkey::Error> {
//!     let repositories = Arc::new(SqliteRepositoryProvider::connect("sqlite::memory:").await?);
//!     let config = AuthConfig::new(JwtConfig::new(b"change-me".to_vec()));
//!     let latchkey = Latchkey::new(repositories, config, Arc::new(RecordingMailSender::new()))?;
//!     latchkey.migrate().await?;
//!
//!     latchkey.signup("u@test.com", "pw1").await?;
//!     let (_user, tokens) = latchkey.login("u@test.com", "pw1").await?;
//!     println!("{}", tokens.access_token);
//!     Ok(())
//! }
//! ```
use std::collections::HashMap;
use std::sync::Arc;

use latchkey_core::{
    AccessTokenCodec,
    error::AuthError,
    repositories::{
        PasswordlessTokenRepository, PasswordlessTokenRepositoryAdapter, TokenRepository,
        TokenRepositoryAdapter, UserRepositoryAdapter,
    },
    services::{IdentityService, PasswordResetService, PasswordlessService, TokenService},
};

/// Re-export core types from latchkey_core
///
/// These types are commonly used when working with the Latchkey API.
pub use latchkey_core::{
    AccessTokenClaims, AuthConfig, AuthorizationUrl, Error, FederatedIdentity, JwtAlgorithm,
    JwtConfig, MailSender, Metadata, OAuthProvider, RecordingMailSender, RepositoryProvider,
    TokenResponse, User, UserId, error, repositories::MemoryRepositoryProvider,
    services::SignupRequest,
};

/// Re-export storage backends
///
/// These storage implementations are available when the corresponding feature is enabled.
#[cfg(feature = "sqlite")]
pub use latchkey_storage_sqlite::SqliteRepositoryProvider;

#[cfg(feature = "postgres")]
pub use latchkey_storage_postgres::PostgresRepositoryProvider;

#[cfg(feature = "mailer")]
pub use latchkey_mailer::{FileMailer, MailerConfig, SmtpMailer};

#[cfg(feature = "oauth")]
pub use latchkey_oauth::{Facebook, Github, Google, OAuthConfig, ProviderConfig};

/// How many expired rows a cleanup pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub tokens: u64,
    pub passwordless_tokens: u64,
}

/// Delete expired refresh, password reset and magic link tokens.
///
/// Expiry is always enforced when a token is presented, so this only
/// reclaims space. It needs nothing but storage, which lets the CLI run it
/// without signing configuration.
pub async fn cleanup_expired<R: RepositoryProvider>(
    repositories: &R,
) -> Result<CleanupReport, Error> {
    let report = CleanupReport {
        tokens: repositories.token().delete_expired().await?,
        passwordless_tokens: repositories.passwordless().delete_expired().await?,
    };
    tracing::info!(
        tokens = report.tokens,
        passwordless_tokens = report.passwordless_tokens,
        "Removed expired tokens"
    );
    Ok(report)
}

type Users<R> = UserRepositoryAdapter<R>;
type Tokens<R> = TokenRepositoryAdapter<R>;

/// The main entry point for Latchkey
///
/// Every operation returns [`latchkey_core::Error`] unchanged, so callers can
/// match on the precise failure (`InvalidCredentials`, `TokenRevoked`, ...).
/// Storage and mail failures pass through without retries.
///
/// # Example
///
/// ```rust,no_run
/// use latchkey::{AuthConfig, JwtConfig, Latchkey, MemoryRepositoryProvider, RecordingMailSender};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), latchkey::Error> {
/// let latchkey = Latchkey::new(
///     Arc::new(MemoryRepositoryProvider::new()),
///     AuthConfig::new(JwtConfig::new(b"secret".to_vec())),
///     Arc::new(RecordingMailSender::new()),
/// )?;
///
/// latchkey.request_passwordless("new@test.com").await?;
/// # Ok(())
/// # }
/// ```
pub struct Latchkey<R: RepositoryProvider> {
    repositories: Arc<R>,
    config: AuthConfig,
    identity_service: IdentityService<Users<R>>,
    token_service: TokenService<Users<R>, Tokens<R>>,
    passwordless_service: PasswordlessService<PasswordlessTokenRepositoryAdapter<R>>,
    password_reset_service: PasswordResetService<Users<R>, Tokens<R>>,
    oauth_providers: HashMap<String, Arc<dyn OAuthProvider>>,
}

impl<R: RepositoryProvider> Latchkey<R> {
    /// Create a new Latchkey instance
    ///
    /// # Arguments
    ///
    /// * `repositories` - The repository provider implementation
    /// * `config` - Signing secret, lifetimes and link base URL
    /// * `mailer` - Delivers magic link and password reset messages
    ///
    /// # Returns
    ///
    /// Fails with `CryptoError::Signing` when the signing configuration is
    /// unusable, so misconfiguration surfaces at startup rather than on the
    /// first login.
    pub fn new(
        repositories: Arc<R>,
        config: AuthConfig,
        mailer: Arc<dyn MailSender>,
    ) -> Result<Self, Error> {
        let codec = AccessTokenCodec::new(&config.jwt, config.access_token_ttl)?;

        let user_repo = Arc::new(UserRepositoryAdapter::new(repositories.clone()));
        let token_repo = Arc::new(TokenRepositoryAdapter::new(repositories.clone()));
        let passwordless_repo = Arc::new(PasswordlessTokenRepositoryAdapter::new(
            repositories.clone(),
        ));

        Ok(Self {
            identity_service: IdentityService::new(user_repo.clone(), config.min_password_length),
            token_service: TokenService::new(
                user_repo.clone(),
                token_repo.clone(),
                codec,
                config.refresh_token_ttl,
            ),
            passwordless_service: PasswordlessService::new(
                passwordless_repo,
                mailer.clone(),
                config.base_url.clone(),
                config.passwordless_token_ttl,
            ),
            password_reset_service: PasswordResetService::new(
                user_repo,
                token_repo,
                mailer,
                config.password_reset_token_ttl,
                config.min_password_length,
            ),
            oauth_providers: HashMap::new(),
            repositories,
            config,
        })
    }

    /// Register an OAuth2 provider under its [`OAuthProvider::name`].
    ///
    /// Registering a second provider with the same name replaces the first.
    pub fn with_oauth_provider(mut self, provider: Arc<dyn OAuthProvider>) -> Self {
        self.oauth_providers
            .insert(provider.name().to_string(), provider);
        self
    }

    /// Register several OAuth2 providers at once.
    pub fn with_oauth_providers(
        self,
        providers: impl IntoIterator<Item = Arc<dyn OAuthProvider>>,
    ) -> Self {
        providers
            .into_iter()
            .fold(self, |latchkey, provider| latchkey.with_oauth_provider(provider))
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Run migrations for all repositories
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    /// Health check for all repositories
    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// Register a local user
    ///
    /// # Arguments
    ///
    /// * `email`: The email of the user to register
    /// * `password`: The password of the user to register
    ///
    /// # Returns
    ///
    /// The new user, unverified and with `provider = "local"`. Fails with
    /// `EmailAlreadyExists` if the email is taken.
    pub async fn signup(&self, email: &str, password: &str) -> Result<User, Error> {
        self.identity_service
            .signup(SignupRequest::new(email, password))
            .await
    }

    /// Register a local user with metadata attached
    pub async fn signup_with(&self, request: SignupRequest) -> Result<User, Error> {
        self.identity_service.signup(request).await
    }

    /// Log a user in with a password
    ///
    /// # Arguments
    ///
    /// * `email`: The email of the user to login
    /// * `password`: The password of the user to login
    ///
    /// # Returns
    ///
    /// The user and a fresh token pair. An unknown email and a wrong
    /// password both fail with `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenResponse), Error> {
        let user = self.identity_service.authenticate(email, password).await?;
        let tokens = self.token_service.issue(&user).await?;
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new access token
    ///
    /// The refresh token is returned unchanged; it is not rotated.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        self.token_service.refresh(refresh_token).await
    }

    /// Revoke a refresh token. Revoking it again is not an error.
    pub async fn revoke_token(&self, refresh_token: &str) -> Result<(), Error> {
        self.token_service.revoke(refresh_token).await
    }

    /// Log out by revoking the session's refresh token
    pub async fn logout(&self, refresh_token: &str) -> Result<(), Error> {
        self.revoke_token(refresh_token).await
    }

    /// Verify an access token's signature and expiry
    ///
    /// Every failure is reported as `TokenError::InvalidToken`.
    pub fn validate_access_token(&self, access_token: &str) -> Result<AccessTokenClaims, Error> {
        self.token_service.validate_access_token(access_token)
    }

    /// Mail a magic link to `email`
    ///
    /// The token is created whether or not a user with that email exists;
    /// the user is created when the link is used.
    pub async fn request_passwordless(&self, email: &str) -> Result<(), Error> {
        self.passwordless_service.request(email).await
    }

    /// Log in with a magic link token
    ///
    /// # Arguments
    ///
    /// * `token`: The token from the magic link
    ///
    /// # Returns
    ///
    /// The user, created on first use and marked verified, and a fresh token
    /// pair. The token is consumed; presenting it again fails.
    pub async fn passwordless_login(&self, token: &str) -> Result<(User, TokenResponse), Error> {
        let email = self.passwordless_service.consume(token).await?;
        let user = self.identity_service.resolve_magic_link(&email).await?;
        let tokens = self.token_service.issue(&user).await?;
        Ok((user, tokens))
    }

    /// Mail a password reset token to `email`
    ///
    /// Succeeds silently when no user has that email.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), Error> {
        self.password_reset_service.request(email).await
    }

    /// Set a new password using a reset token
    ///
    /// # Arguments
    ///
    /// * `token`: The token from the reset message
    /// * `new_password`: The password to set
    ///
    /// # Returns
    ///
    /// The updated user. The token is spent exactly once; a second confirm
    /// with the same token fails and leaves the first password in place.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<User, Error> {
        self.password_reset_service
            .confirm(token, new_password)
            .await
    }

    /// Change a user's password after checking the current one
    ///
    /// # Arguments
    ///
    /// * `user_id`: The ID of the user to change the password for
    /// * `old_password`: The current password for verification
    /// * `new_password`: The new password to set for the user
    pub async fn change_password(
        &self,
        user_id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<User, Error> {
        self.identity_service
            .change_password(user_id, old_password, new_password)
            .await
    }

    fn oauth_provider(&self, provider: &str) -> Result<&Arc<dyn OAuthProvider>, Error> {
        self.oauth_providers
            .get(provider)
            .ok_or_else(|| AuthError::UnsupportedProvider(provider.to_string()).into())
    }

    /// Build the URL that starts an OAuth2 login
    ///
    /// Keep `csrf_state` and `pkce_verifier` from the result until the
    /// callback; the verifier is needed by [`Latchkey::oauth_login`].
    pub fn oauth_authorization_url(&self, provider: &str) -> Result<AuthorizationUrl, Error> {
        self.oauth_provider(provider)?.authorization_url()
    }

    /// Finish an OAuth2 login
    ///
    /// # Arguments
    ///
    /// * `provider`: The registered provider name, e.g. `"google"`
    /// * `code`: The authorization code from the callback
    /// * `pkce_verifier`: The verifier returned with the authorization URL
    ///
    /// # Returns
    ///
    /// The resolved user and a fresh token pair.
    pub async fn oauth_login(
        &self,
        provider: &str,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<(User, TokenResponse), Error> {
        let client = self.oauth_provider(provider)?;
        let access_token = client.exchange_code(code, pkce_verifier).await?;
        let identity = client.fetch_identity(&access_token).await?;
        self.federated_login(&identity).await
    }

    /// Resolve an already-normalized federated identity and issue tokens
    ///
    /// For integrations that run the OAuth2 exchange themselves.
    pub async fn federated_login(
        &self,
        identity: &FederatedIdentity,
    ) -> Result<(User, TokenResponse), Error> {
        let user = self.identity_service.resolve_federated(identity).await?;
        let tokens = self.token_service.issue(&user).await?;
        Ok((user, tokens))
    }

    /// Get a user by their ID
    ///
    /// # Returns
    ///
    /// Returns the user if found, otherwise `None`
    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        self.identity_service.get_user(user_id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.identity_service.get_user_by_email(email).await
    }

    /// Delete a user together with their refresh and reset tokens
    pub async fn delete_user(&self, user_id: &UserId) -> Result<(), Error> {
        self.identity_service.delete_user(user_id).await
    }

    /// Delete expired tokens. See [`cleanup_expired`].
    pub async fn cleanup_expired_tokens(&self) -> Result<CleanupReport, Error> {
        cleanup_expired(self.repositories.as_ref()).await
    }
}
