//! Persisted tokens
//!
//! Two families of opaque tokens are stored. [`Token`] rows belong to a user
//! and are spent by flipping `revoked`. [`PasswordlessToken`] rows are keyed
//! by email, because the user may not exist yet, and are spent by deleting
//! the row. Access tokens are never persisted.
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::ValidationError,
    id::generate_prefixed_id,
    user::{Metadata, UserId},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(id: &str) -> Self {
        TokenId(id.to_string())
    }

    pub fn new_random() -> Result<Self, Error> {
        Ok(TokenId(generate_prefixed_id("tok")?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TokenId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Refresh,
    PasswordReset,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Refresh => "refresh",
            TokenType::PasswordReset => "password_reset",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refresh" => Ok(TokenType::Refresh),
            "password_reset" => Ok(TokenType::PasswordReset),
            other => Err(ValidationError::InvalidField(format!("unknown token type: {other}")).into()),
        }
    }
}

/// A user-owned single purpose secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub user_id: UserId,
    pub token: String,
    pub token_type: TokenType,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
    pub metadata: Metadata,
}

impl Token {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct NewToken {
    pub id: TokenId,
    pub user_id: UserId,
    pub token: String,
    pub token_type: TokenType,
    pub expires_at: DateTime<Utc>,
    pub metadata: Metadata,
}

impl NewToken {
    pub fn new(
        user_id: UserId,
        token: String,
        token_type: TokenType,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, Error> {
        Ok(Self {
            id: TokenId::new_random()?,
            user_id,
            token,
            token_type,
            expires_at,
            metadata: Metadata::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct PasswordlessTokenId(String);

impl PasswordlessTokenId {
    pub fn new(id: &str) -> Self {
        PasswordlessTokenId(id.to_string())
    }

    pub fn new_random() -> Result<Self, Error> {
        Ok(PasswordlessTokenId(generate_prefixed_id("plt")?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PasswordlessTokenId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A magic link credential, keyed by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordlessToken {
    pub id: PasswordlessTokenId,
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PasswordlessToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct NewPasswordlessToken {
    pub id: PasswordlessTokenId,
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl NewPasswordlessToken {
    pub fn new(email: &str, token: String, expires_at: DateTime<Utc>) -> Result<Self, Error> {
        Ok(Self {
            id: PasswordlessTokenId::new_random()?,
            email: email.to_string(),
            token,
            expires_at,
        })
    }
}

/// The access/refresh pair handed to a client after authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until `access_token` expires.
    pub expires_in: i64,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            token_type: "Bearer".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_token_type_round_trip() {
        assert_eq!("refresh".parse::<TokenType>().unwrap(), TokenType::Refresh);
        assert_eq!(
            "password_reset".parse::<TokenType>().unwrap(),
            TokenType::PasswordReset
        );
        assert!("access".parse::<TokenType>().is_err());
        assert_eq!(TokenType::PasswordReset.to_string(), "password_reset");
    }

    #[test]
    fn test_token_expiry() {
        let mut token = Token {
            id: TokenId::new_random().unwrap(),
            user_id: UserId::new("usr_test"),
            token: "value".to_string(),
            token_type: TokenType::Refresh,
            expires_at: Utc::now() + Duration::minutes(5),
            created_at: Utc::now(),
            revoked: false,
            metadata: Metadata::new(),
        };
        assert!(!token.is_expired());

        token.expires_at = Utc::now() - Duration::seconds(1);
        assert!(token.is_expired());
    }

    #[test]
    fn test_token_response_serializes_as_bearer() {
        let response = TokenResponse::bearer("a".into(), "r".into(), 3600);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 3600);
    }
}
