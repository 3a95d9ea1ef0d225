use async_trait::async_trait;
use latchkey_core::{AuthorizationUrl, Error, FederatedIdentity, OAuthProvider};
use serde::Deserialize;

use super::{OAuthClient, ProviderEndpoints, require_id};
use crate::ProviderConfig;

const ENDPOINTS: ProviderEndpoints = ProviderEndpoints {
    auth_url: "https://www.facebook.com/v3.2/dialog/oauth",
    token_url: "https://graph.facebook.com/v3.2/oauth/access_token",
    default_scopes: &["email"],
};
const ME_URL: &str = "https://graph.facebook.com/me?fields=id,email";

#[derive(Debug, Clone, Deserialize)]
pub struct FacebookUserInfo {
    #[serde(default)]
    pub id: String,
    pub email: Option<String>,
}

impl FacebookUserInfo {
    pub fn into_identity(self) -> Result<FederatedIdentity, Error> {
        Ok(FederatedIdentity {
            provider: "facebook".to_string(),
            provider_id: require_id(self.id)?,
            email: self.email.unwrap_or_default(),
        })
    }
}

pub struct Facebook {
    client: OAuthClient,
}

impl Facebook {
    pub fn new(config: &ProviderConfig) -> Result<Self, Error> {
        Ok(Self {
            client: OAuthClient::new(ENDPOINTS, config)?,
        })
    }
}

#[async_trait]
impl OAuthProvider for Facebook {
    fn name(&self) -> &str {
        "facebook"
    }

    fn authorization_url(&self) -> Result<AuthorizationUrl, Error> {
        Ok(self.client.authorization_url())
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<String, Error> {
        self.client.exchange_code(code, pkce_verifier).await
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<FederatedIdentity, Error> {
        self.client
            .get_json::<FacebookUserInfo>(ME_URL, access_token)
            .await?
            .into_identity()
    }
}
