use chrono::Duration;

use crate::{
    Error,
    error::ValidationError,
    jwt::{JwtAlgorithm, JwtConfig},
};

pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::hours(1);
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::days(30);
pub const DEFAULT_PASSWORDLESS_TOKEN_TTL: Duration = Duration::minutes(15);
pub const DEFAULT_PASSWORD_RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// Engine configuration, passed explicitly to every service that needs it.
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use latchkey_core::{AuthConfig, JwtConfig};
///
/// let config = AuthConfig::new(JwtConfig::new(b"secret".to_vec()))
///     .with_base_url("https://auth.example.com")
///     .with_access_token_ttl(Duration::minutes(15));
/// ```
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
    /// Prefix for links embedded in outgoing mail
    pub base_url: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub passwordless_token_ttl: Duration,
    pub password_reset_token_ttl: Duration,
    pub min_password_length: usize,
}

impl AuthConfig {
    pub fn new(jwt: JwtConfig) -> Self {
        Self {
            jwt,
            base_url: "http://localhost:8080".to_string(),
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            passwordless_token_ttl: DEFAULT_PASSWORDLESS_TOKEN_TTL,
            password_reset_token_ttl: DEFAULT_PASSWORD_RESET_TOKEN_TTL,
            min_password_length: 1,
        }
    }

    /// Load configuration from `LATCHKEY_*` environment variables
    ///
    /// `LATCHKEY_JWT_SECRET` is required. Lifetimes are given in seconds.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let secret = lookup("LATCHKEY_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValidationError::MissingField("LATCHKEY_JWT_SECRET".to_string()))?;

        let mut jwt = JwtConfig::new(secret.into_bytes());
        if let Some(algorithm) = lookup("LATCHKEY_JWT_ALGORITHM") {
            jwt = jwt.with_algorithm(algorithm.parse::<JwtAlgorithm>()?);
        }
        if let Some(issuer) = lookup("LATCHKEY_JWT_ISSUER") {
            jwt = jwt.with_issuer(issuer);
        }

        let mut config = Self::new(jwt);
        if let Some(base_url) = lookup("LATCHKEY_BASE_URL") {
            config.base_url = base_url;
        }

        let seconds = |key: &str, default: Duration| -> Result<Duration, Error> {
            match lookup(key) {
                Some(raw) => raw
                    .parse::<i64>()
                    .ok()
                    .filter(|s| *s > 0)
                    .and_then(Duration::try_seconds)
                    .ok_or_else(|| ValidationError::InvalidField(format!("{key}={raw}")).into()),
                None => Ok(default),
            }
        };
        config.access_token_ttl = seconds("LATCHKEY_ACCESS_TOKEN_TTL", config.access_token_ttl)?;
        config.refresh_token_ttl = seconds("LATCHKEY_REFRESH_TOKEN_TTL", config.refresh_token_ttl)?;
        config.passwordless_token_ttl =
            seconds("LATCHKEY_PASSWORDLESS_TOKEN_TTL", config.passwordless_token_ttl)?;
        config.password_reset_token_ttl =
            seconds("LATCHKEY_PASSWORD_RESET_TOKEN_TTL", config.password_reset_token_ttl)?;

        if let Some(raw) = lookup("LATCHKEY_MIN_PASSWORD_LENGTH") {
            config.min_password_length = raw.parse().map_err(|_| {
                ValidationError::InvalidField(format!("LATCHKEY_MIN_PASSWORD_LENGTH={raw}"))
            })?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    pub fn with_passwordless_token_ttl(mut self, ttl: Duration) -> Self {
        self.passwordless_token_ttl = ttl;
        self
    }

    pub fn with_password_reset_token_ttl(mut self, ttl: Duration) -> Self {
        self.password_reset_token_ttl = ttl;
        self
    }

    pub fn with_min_password_length(mut self, min_password_length: usize) -> Self {
        self.min_password_length = min_password_length;
        self
    }
}
