//! Users and their identity linkage
//!
//! | Field            | Type               | Description                                          |
//! | ---------------- | ------------------ | ---------------------------------------------------- |
//! | `id`             | `UserId`           | Opaque, `usr_` prefixed identifier.                  |
//! | `email`          | `String`           | Unique across the store, case-sensitive as stored.   |
//! | `password_hash`  | `Option<String>`   | `None` for users who never set a password.           |
//! | `provider`       | `String`           | `"local"` or the federated provider name.            |
//! | `provider_id`    | `Option<String>`   | Account id at the federated provider.                |
//! | `email_verified` | `bool`             | Whether the email address has been proven.           |
//! | `app_metadata`   | `Metadata`         | Application controlled data.                         |
//! | `user_metadata`  | `Metadata`         | User supplied data.                                  |
//! | `created_at`     | `DateTime`         | Creation timestamp.                                  |
//! | `updated_at`     | `DateTime`         | Last modification timestamp.                         |
use crate::{
    Error,
    error::utilities::RequiredFieldExt,
    id::{generate_prefixed_id, validate_prefixed_id},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider tag for password and magic link users.
pub const LOCAL_PROVIDER: &str = "local";

/// Free-form JSON key/value data attached to users and tokens.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A unique, stable identifier for a specific user
///
/// This value should be treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: &str) -> Self {
        UserId(id.to_string())
    }

    pub fn new_random() -> Result<Self, Error> {
        Ok(UserId(generate_prefixed_id("usr")?))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "usr")
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user record as stored by a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    // Never leaves the process through serialization.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub provider: String,
    pub provider_id: Option<String>,
    pub email_verified: bool,
    pub app_metadata: Metadata,
    pub user_metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn builder() -> UserBuilder {
        UserBuilder::default()
    }

    pub fn is_local(&self) -> bool {
        self.provider == LOCAL_PROVIDER
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }
}

#[derive(Default)]
pub struct UserBuilder {
    id: Option<UserId>,
    email: Option<String>,
    password_hash: Option<String>,
    provider: Option<String>,
    provider_id: Option<String>,
    email_verified: bool,
    app_metadata: Metadata,
    user_metadata: Metadata,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl UserBuilder {
    pub fn id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn password_hash(mut self, password_hash: Option<String>) -> Self {
        self.password_hash = password_hash;
        self
    }

    pub fn provider(mut self, provider: String) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn provider_id(mut self, provider_id: Option<String>) -> Self {
        self.provider_id = provider_id;
        self
    }

    pub fn email_verified(mut self, email_verified: bool) -> Self {
        self.email_verified = email_verified;
        self
    }

    pub fn app_metadata(mut self, app_metadata: Metadata) -> Self {
        self.app_metadata = app_metadata;
        self
    }

    pub fn user_metadata(mut self, user_metadata: Metadata) -> Self {
        self.user_metadata = user_metadata;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn build(self) -> Result<User, Error> {
        let now = Utc::now();
        let id = match self.id {
            Some(id) => id,
            None => UserId::new_random()?,
        };
        Ok(User {
            id,
            email: self.email.require_field("Email")?,
            password_hash: self.password_hash,
            provider: self.provider.unwrap_or_else(|| LOCAL_PROVIDER.to_string()),
            provider_id: self.provider_id,
            email_verified: self.email_verified,
            app_metadata: self.app_metadata,
            user_metadata: self.user_metadata,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}

/// The fields a repository needs to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub email: String,
    pub password_hash: Option<String>,
    pub provider: String,
    pub provider_id: Option<String>,
    pub email_verified: bool,
    pub app_metadata: Metadata,
    pub user_metadata: Metadata,
}

impl NewUser {
    /// A local user with a fresh id and no password.
    pub fn local(email: &str) -> Result<Self, Error> {
        Ok(Self {
            id: UserId::new_random()?,
            email: email.to_string(),
            password_hash: None,
            provider: LOCAL_PROVIDER.to_string(),
            provider_id: None,
            email_verified: false,
            app_metadata: Metadata::new(),
            user_metadata: Metadata::new(),
        })
    }

    /// A user linked to a federated account.
    pub fn federated(provider: &str, provider_id: &str, email: &str) -> Result<Self, Error> {
        Ok(Self {
            provider: provider.to_string(),
            provider_id: Some(provider_id.to_string()),
            email_verified: true,
            ..Self::local(email)?
        })
    }

    pub fn with_password_hash(mut self, password_hash: String) -> Self {
        self.password_hash = Some(password_hash);
        self
    }

    pub fn with_email_verified(mut self, email_verified: bool) -> Self {
        self.email_verified = email_verified;
        self
    }

    pub fn with_app_metadata(mut self, app_metadata: Metadata) -> Self {
        self.app_metadata = app_metadata;
        self
    }

    pub fn with_user_metadata(mut self, user_metadata: Metadata) -> Self {
        self.user_metadata = user_metadata;
        self
    }
}
