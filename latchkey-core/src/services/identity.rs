use crate::{
    Error, User, UserId,
    error::{AuthError, OAuthError, StorageError, ValidationError},
    oauth::FederatedIdentity,
    password::{hash_password, verify_dummy_password, verify_password},
    repositories::UserRepository,
    user::{Metadata, NewUser},
    validation::{validate_email, validate_password},
};
use std::sync::Arc;

/// Input for a local email/password signup
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub app_metadata: Metadata,
    pub user_metadata: Metadata,
}

impl SignupRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            app_metadata: Metadata::new(),
            user_metadata: Metadata::new(),
        }
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

/// Turns credential proofs into the canonical local [`User`].
pub struct IdentityService<U: UserRepository> {
    user_repository: Arc<U>,
    min_password_length: usize,
}

impl<U: UserRepository> IdentityService<U> {
    pub fn new(user_repository: Arc<U>, min_password_length: usize) -> Self {
        Self {
            user_repository,
            min_password_length,
        }
    }

    /// Register a local user.
    ///
    /// Fails with [`AuthError::EmailAlreadyExists`] if the email is taken.
    pub async fn signup(&self, request: SignupRequest) -> Result<User, Error> {
        validate_email(&request.email)?;
        validate_password(&request.password, self.min_password_length)?;

        if self
            .user_repository
            .find_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(AuthError::EmailAlreadyExists.into());
        }

        let password_hash = hash_password(&request.password).await?;
        let new_user = NewUser::local(&request.email)?
            .with_password_hash(password_hash)
            .with_app_metadata(request.app_metadata)
            .with_user_metadata(request.user_metadata);

        // A concurrent signup can still win the insert; the constraint decides.
        let user = self.user_repository.create(new_user).await?;
        tracing::info!(user_id = %user.id, "Registered local user");
        Ok(user)
    }

    /// Check an email/password pair.
    ///
    /// Unknown email, missing password and wrong password are all reported as
    /// [`AuthError::InvalidCredentials`].
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, Error> {
        let Some(user) = self.user_repository.find_by_email(email).await? else {
            verify_dummy_password(password).await;
            tracing::debug!("Authentication failed");
            return Err(AuthError::InvalidCredentials.into());
        };

        let Some(password_hash) = user.password_hash.as_deref().filter(|h| !h.is_empty()) else {
            verify_dummy_password(password).await;
            tracing::debug!(user_id = %user.id, "Authentication failed");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(password_hash, password).await {
            tracing::debug!(user_id = %user.id, "Authentication failed");
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(user)
    }

    /// Find or create the user behind a federated identity.
    ///
    /// A provider-id match wins over an email match. A match by email links
    /// the federated account to the existing user, replacing any previous
    /// link. The federated email is authoritative and overwrites the stored
    /// one on every login.
    pub async fn resolve_federated(&self, identity: &FederatedIdentity) -> Result<User, Error> {
        if identity.provider_id.is_empty() {
            return Err(OAuthError::MissingUserId.into());
        }

        if let Some(user) = self
            .user_repository
            .find_by_provider(&identity.provider, &identity.provider_id)
            .await?
        {
            return self.sync_federated_email(user, &identity.email).await;
        }

        if !identity.email.is_empty() {
            if let Some(mut user) = self.user_repository.find_by_email(&identity.email).await? {
                tracing::info!(
                    user_id = %user.id,
                    provider = %identity.provider,
                    "Linking federated account to existing user"
                );
                user.provider = identity.provider.clone();
                user.provider_id = Some(identity.provider_id.clone());
                return self.user_repository.update(&user).await;
            }
        }

        if identity.email.is_empty() {
            return Err(ValidationError::MissingField("email".to_string()).into());
        }

        let new_user =
            NewUser::federated(&identity.provider, &identity.provider_id, &identity.email)?;
        match self.user_repository.create(new_user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, provider = %identity.provider, "Created federated user");
                Ok(user)
            }
            // Lost a race with a concurrent first login for the same account.
            Err(Error::Auth(AuthError::EmailAlreadyExists))
            | Err(Error::Storage(StorageError::Constraint(_))) => self
                .user_repository
                .find_by_provider(&identity.provider, &identity.provider_id)
                .await?
                .ok_or_else(|| AuthError::EmailAlreadyExists.into()),
            Err(e) => Err(e),
        }
    }

    async fn sync_federated_email(&self, mut user: User, email: &str) -> Result<User, Error> {
        if email.is_empty() || user.email == email {
            return Ok(user);
        }
        tracing::info!(user_id = %user.id, "Updating email from federated identity");
        user.email = email.to_string();
        self.user_repository.update(&user).await
    }

    /// Find or create the user behind a consumed magic link.
    ///
    /// New users are created verified and without a password. Existing
    /// unverified users become verified.
    pub async fn resolve_magic_link(&self, email: &str) -> Result<User, Error> {
        if let Some(user) = self.user_repository.find_by_email(email).await? {
            return self.mark_verified(user).await;
        }

        let new_user = NewUser::local(email)?.with_email_verified(true);
        match self.user_repository.create(new_user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Created user from magic link");
                Ok(user)
            }
            Err(Error::Auth(AuthError::EmailAlreadyExists)) => {
                let user = self
                    .user_repository
                    .find_by_email(email)
                    .await?
                    .ok_or(AuthError::UserNotFound)?;
                self.mark_verified(user).await
            }
            Err(e) => Err(e),
        }
    }

    async fn mark_verified(&self, mut user: User) -> Result<User, Error> {
        if user.email_verified {
            return Ok(user);
        }
        user.email_verified = true;
        self.user_repository.update(&user).await
    }

    /// Replace a user's password without checking the old one.
    pub async fn set_password(&self, user_id: &UserId, password: &str) -> Result<User, Error> {
        validate_password(password, self.min_password_length)?;

        let mut user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        user.password_hash = Some(hash_password(password).await?);
        self.user_repository.update(&user).await
    }

    /// Replace a user's password after checking the current one.
    pub async fn change_password(
        &self,
        user_id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<User, Error> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let current_hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(current_hash, old_password).await {
            return Err(AuthError::InvalidCredentials.into());
        }

        self.set_password(user_id, new_password).await
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        self.user_repository.find_by_id(user_id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.user_repository.find_by_email(email).await
    }

    pub async fn delete_user(&self, user_id: &UserId) -> Result<(), Error> {
        self.user_repository.delete(user_id).await
    }
}
