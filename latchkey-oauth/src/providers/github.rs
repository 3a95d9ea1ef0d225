use async_trait::async_trait;
use latchkey_core::{AuthorizationUrl, Error, FederatedIdentity, OAuthProvider};
use serde::Deserialize;

use super::{OAuthClient, ProviderEndpoints, require_id};
use crate::ProviderConfig;

const ENDPOINTS: ProviderEndpoints = ProviderEndpoints {
    auth_url: "https://github.com/login/oauth/authorize",
    token_url: "https://github.com/login/oauth/access_token",
    default_scopes: &["read:user", "user:email"],
};
const USER_URL: &str = "https://api.github.com/user";
const EMAILS_URL: &str = "https://api.github.com/user/emails";

/// A limited subset of the user info response from Github.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubUserInfo {
    pub id: Option<u64>,
    pub login: Option<String>,
    pub email: Option<String>,
}

/// A limited subset of the user emails response from Github.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubUserEmail {
    pub email: String,
    pub primary: bool,
    pub verified: bool,
}

impl GithubUserInfo {
    /// Github ids are numeric; they are stored in decimal form.
    pub fn into_identity(self) -> Result<FederatedIdentity, Error> {
        let provider_id = self.id.map(|id| id.to_string()).unwrap_or_default();
        Ok(FederatedIdentity {
            provider: "github".to_string(),
            provider_id: require_id(provider_id)?,
            email: self.email.unwrap_or_default(),
        })
    }
}

/// The primary verified address, if there is one.
fn primary_email(emails: Vec<GithubUserEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|email| email.primary && email.verified)
        .map(|email| email.email)
}

pub struct Github {
    client: OAuthClient,
}

impl Github {
    pub fn new(config: &ProviderConfig) -> Result<Self, Error> {
        Ok(Self {
            client: OAuthClient::new(ENDPOINTS, config)?,
        })
    }
}

#[async_trait]
impl OAuthProvider for Github {
    fn name(&self) -> &str {
        "github"
    }

    fn authorization_url(&self) -> Result<AuthorizationUrl, Error> {
        Ok(self.client.authorization_url())
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<String, Error> {
        self.client.exchange_code(code, pkce_verifier).await
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<FederatedIdentity, Error> {
        let mut info = self
            .client
            .get_json::<GithubUserInfo>(USER_URL, access_token)
            .await?;

        // Private addresses are left out of /user
        if info.email.as_deref().is_none_or(str::is_empty) {
            match self
                .client
                .get_json::<Vec<GithubUserEmail>>(EMAILS_URL, access_token)
                .await
            {
                Ok(emails) => info.email = primary_email(emails),
                Err(e) => tracing::warn!(error = %e, "Could not list GitHub emails"),
            }
        }

        info.into_identity()
    }
}
