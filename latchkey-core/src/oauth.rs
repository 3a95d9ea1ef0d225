//! Federated identity contract
//!
//! An [`OAuthProvider`] speaks the OAuth2 wire protocol and hands back a
//! normalized [`FederatedIdentity`]. The engine only consumes that identity.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;

/// The (provider, provider-id, email) triple returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedIdentity {
    pub provider: String,
    pub provider_id: String,
    /// May be empty when the provider does not disclose an address.
    pub email: String,
}

/// Where to send the user, plus the values to keep until the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationUrl {
    pub url: String,
    pub csrf_state: String,
    pub pkce_verifier: String,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync + 'static {
    /// Stable provider tag stored on linked users, e.g. `"google"`
    fn name(&self) -> &str;

    fn authorization_url(&self) -> Result<AuthorizationUrl, Error>;

    /// Exchange an authorization code for a provider access token
    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<String, Error>;

    async fn fetch_identity(&self, access_token: &str) -> Result<FederatedIdentity, Error>;
}
