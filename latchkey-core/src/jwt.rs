//! Access token codec
//!
//! Access tokens are short lived HMAC-signed JWTs carrying
//! `{sub, email, iat, exp}` and, when configured, `iss`. They are never
//! stored, so they stay valid until `exp` even after logout.
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    Error, User,
    error::{CryptoError, TokenError},
};

/// HMAC algorithms accepted for access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JwtAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl JwtAlgorithm {
    fn as_jsonwebtoken(&self) -> Algorithm {
        match self {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
        }
    }
}

impl std::str::FromStr for JwtAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HS256" => Ok(JwtAlgorithm::HS256),
            "HS384" => Ok(JwtAlgorithm::HS384),
            "HS512" => Ok(JwtAlgorithm::HS512),
            other => Err(CryptoError::Signing(format!("unsupported algorithm {other}")).into()),
        }
    }
}

/// Signing configuration for access tokens
#[derive(Clone)]
pub struct JwtConfig {
    secret: Vec<u8>,
    pub algorithm: JwtAlgorithm,
    /// Written to and required in the `iss` claim when set
    pub issuer: Option<String>,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: JwtAlgorithm::default(),
            issuer: None,
        }
    }

    pub fn with_algorithm(mut self, algorithm: JwtAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Mints and validates access tokens.
#[derive(Clone)]
pub struct AccessTokenCodec {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
    lifetime: Duration,
}

impl AccessTokenCodec {
    /// Build a codec. An empty secret is a signer misconfiguration.
    pub fn new(config: &JwtConfig, lifetime: Duration) -> Result<Self, Error> {
        if config.secret.is_empty() {
            return Err(CryptoError::Signing("signing secret is empty".to_string()).into());
        }
        if lifetime <= Duration::zero() {
            return Err(CryptoError::Signing("access token lifetime must be positive".to_string()).into());
        }

        let algorithm = config.algorithm.as_jsonwebtoken();

        // Only the configured algorithm is accepted; `alg: none` never decodes.
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        match &config.issuer {
            Some(issuer) => {
                validation.set_required_spec_claims(&["exp", "sub", "iss"]);
                validation.set_issuer(&[issuer]);
            }
            None => validation.set_required_spec_claims(&["exp", "sub"]),
        }

        Ok(Self {
            header: Header::new(algorithm),
            encoding_key: EncodingKey::from_secret(&config.secret),
            decoding_key: DecodingKey::from_secret(&config.secret),
            validation,
            issuer: config.issuer.clone(),
            lifetime,
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign a new access token for `user`, returning it with its expiry.
    pub fn issue_access_token(&self, user: &User) -> Result<(String, DateTime<Utc>), Error> {
        let now = Utc::now();
        let expires_at = now + self.lifetime;
        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&self.header, &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign access token");
            CryptoError::Signing(e.to_string())
        })?;

        Ok((token, expires_at))
    }

    /// Verify algorithm, signature, expiry and issuer.
    ///
    /// Every failure is reported as [`TokenError::InvalidToken`].
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, Error> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(reason = ?e.kind(), "Rejected access token");
                TokenError::InvalidToken.into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    const TEST_SECRET: &[u8] = b"test_secret_key_for_hs256_access_tokens_not_for_prod";

    fn codec() -> AccessTokenCodec {
        AccessTokenCodec::new(&JwtConfig::new(TEST_SECRET), Duration::hours(1)).unwrap()
    }

    fn user() -> User {
        User::builder()
            .email("u@test.com".to_string())
            .build()
            .unwrap()
    }

    fn assert_invalid(result: Result<AccessTokenClaims, Error>) {
        assert!(matches!(result, Err(Error::Token(TokenError::InvalidToken))));
    }

    #[test]
    fn test_issue_then_validate_returns_subject() {
        let codec = codec();
        let user = user();

        let (token, expires_at) = codec.issue_access_token(&user).unwrap();
        let claims = codec.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.as_str());
        assert_eq!(claims.email, "u@test.com");
        assert_eq!(claims.exp, expires_at.timestamp());
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(claims.iss.is_none());
    }

    #[test]
    fn test_empty_secret_is_a_signing_error() {
        let result = AccessTokenCodec::new(&JwtConfig::new(Vec::new()), Duration::hours(1));
        assert!(matches!(
            result,
            Err(Error::Crypto(CryptoError::Signing(_)))
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let (token, _) = codec().issue_access_token(&user()).unwrap();
        let other =
            AccessTokenCodec::new(&JwtConfig::new(b"another-secret".to_vec()), Duration::hours(1))
                .unwrap();
        assert_invalid(other.validate_access_token(&token));
    }

    #[test]
    fn test_mismatched_algorithm_is_rejected() {
        let hs512 = AccessTokenCodec::new(
            &JwtConfig::new(TEST_SECRET).with_algorithm(JwtAlgorithm::HS512),
            Duration::hours(1),
        )
        .unwrap();
        let (token, _) = hs512.issue_access_token(&user()).unwrap();

        assert_invalid(codec().validate_access_token(&token));
    }

    #[test]
    fn test_unsigned_token_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let payload = URL_SAFE_NO_PAD.encode(
            format!(r#"{{"sub":"usr_x","email":"a@x.com","iat":0,"exp":{exp}}}"#).as_bytes(),
        );

        assert_invalid(codec().validate_access_token(&format!("{header}.{payload}.")));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: "usr_x".to_string(),
            email: "a@x.com".to_string(),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::seconds(5)).timestamp(),
            iss: None,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();

        assert_invalid(codec().validate_access_token(&token));
    }

    #[test]
    fn test_issuer_is_enforced() {
        let with_issuer = AccessTokenCodec::new(
            &JwtConfig::new(TEST_SECRET).with_issuer("latchkey"),
            Duration::hours(1),
        )
        .unwrap();

        let (token, _) = with_issuer.issue_access_token(&user()).unwrap();
        let claims = with_issuer.validate_access_token(&token).unwrap();
        assert_eq!(claims.iss.as_deref(), Some("latchkey"));

        // A token without `iss` does not satisfy a codec that requires one.
        let (plain, _) = codec().issue_access_token(&user()).unwrap();
        assert_invalid(with_issuer.validate_access_token(&plain));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_invalid(codec().validate_access_token("invalid.jwt.token"));
        assert_invalid(codec().validate_access_token(""));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", JwtConfig::new(TEST_SECRET));
        assert!(!debug.contains("test_secret"));
    }
}
