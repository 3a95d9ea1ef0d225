use async_trait::async_trait;
use latchkey_core::{AuthorizationUrl, Error, FederatedIdentity, OAuthProvider};
use serde::Deserialize;

use super::{OAuthClient, ProviderEndpoints, require_id};
use crate::ProviderConfig;

const ENDPOINTS: ProviderEndpoints = ProviderEndpoints {
    auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
    token_url: "https://oauth2.googleapis.com/token",
    default_scopes: &["openid", "email", "profile"],
};
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// The part of Google's OpenID Connect user info response we use.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    #[serde(default)]
    pub sub: String,
    pub email: Option<String>,
}

impl GoogleUserInfo {
    pub fn into_identity(self) -> Result<FederatedIdentity, Error> {
        Ok(FederatedIdentity {
            provider: "google".to_string(),
            provider_id: require_id(self.sub)?,
            email: self.email.unwrap_or_default(),
        })
    }
}

pub struct Google {
    client: OAuthClient,
}

impl Google {
    pub fn new(config: &ProviderConfig) -> Result<Self, Error> {
        Ok(Self {
            client: OAuthClient::new(ENDPOINTS, config)?,
        })
    }
}

#[async_trait]
impl OAuthProvider for Google {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self) -> Result<AuthorizationUrl, Error> {
        Ok(self.client.authorization_url())
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<String, Error> {
        self.client.exchange_code(code, pkce_verifier).await
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<FederatedIdentity, Error> {
        self.client
            .get_json::<GoogleUserInfo>(USERINFO_URL, access_token)
            .await?
            .into_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_core::error::OAuthError;

    fn config() -> ProviderConfig {
        ProviderConfig {
            client_id: "client_id".to_string(),
            client_secret: "client_secret".to_string(),
            redirect_url: "http://localhost:8080/callback".to_string(),
            scopes: vec![],
        }
    }

    #[test]
    fn test_google_authorization_url() {
        let google = Google::new(&config()).unwrap();
        assert_eq!(google.name(), "google");

        let auth_url = google.authorization_url().unwrap();
        assert!(auth_url.url.contains("accounts.google.com"));
        assert!(auth_url.url.contains("scope=openid+email+profile"));
    }

    #[test]
    fn test_google_identity_uses_sub() {
        let info: GoogleUserInfo = serde_json::from_str(
            r#"{"sub": "1098", "email": "ada@example.com", "name": "Ada", "picture": "x"}"#,
        )
        .unwrap();
        let identity = info.into_identity().unwrap();
        assert_eq!(identity.provider, "google");
        assert_eq!(identity.provider_id, "1098");
        assert_eq!(identity.email, "ada@example.com");
    }

    #[test]
    fn test_google_identity_without_sub() {
        let info: GoogleUserInfo = serde_json::from_str(r#"{"email": "a@example.com"}"#).unwrap();
        assert!(matches!(
            info.into_identity(),
            Err(Error::OAuth(OAuthError::MissingUserId))
        ));
    }
}
