//! Provider implementations of [`latchkey_core::OAuthProvider`]
//!
//! Every provider shares [`OAuthClient`] for the authorization code flow
//! with PKCE and only differs in endpoints and in how its user info
//! response maps onto a [`latchkey_core::FederatedIdentity`].
use latchkey_core::{AuthorizationUrl, Error, error::OAuthError};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
    basic::BasicClient,
};
use serde::de::DeserializeOwned;

use crate::ProviderConfig;

mod facebook;
mod github;
mod google;

pub use facebook::{Facebook, FacebookUserInfo};
pub use github::{Github, GithubUserEmail, GithubUserInfo};
pub use google::{Google, GoogleUserInfo};

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Static endpoints of one provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderEndpoints {
    pub auth_url: &'static str,
    pub token_url: &'static str,
    pub default_scopes: &'static [&'static str],
}

/// Authorization code flow for one provider.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client: ConfiguredClient,
    scopes: Vec<String>,
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(endpoints: ProviderEndpoints, config: &ProviderConfig) -> Result<Self, Error> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(endpoints.auth_url.to_string()).map_err(configuration)?)
            .set_token_uri(TokenUrl::new(endpoints.token_url.to_string()).map_err(configuration)?)
            .set_redirect_uri(RedirectUrl::new(config.redirect_url.clone()).map_err(configuration)?);

        let scopes = if config.scopes.is_empty() {
            endpoints
                .default_scopes
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            config.scopes.clone()
        };

        Ok(Self {
            client,
            scopes,
            http: http_client()?,
        })
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn authorization_url(&self) -> AuthorizationUrl {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().map(|s| Scope::new(s.clone())))
            .set_pkce_challenge(pkce_challenge)
            .url();

        AuthorizationUrl {
            url: auth_url.to_string(),
            csrf_state: csrf_state.secret().to_string(),
            pkce_verifier: pkce_verifier.secret().to_string(),
        }
    }

    /// Trade `code` for the provider's access token.
    pub async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<String, Error> {
        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to exchange authorization code");
                OAuthError::CodeExchange(e.to_string())
            })?;

        Ok(token_response.access_token().secret().to_string())
    }

    /// GET `url` with the bearer token and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, Error> {
        let value = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, "latchkey")
            .send()
            .await
            .map_err(|e| user_info_error(url, e))?
            .error_for_status()
            .map_err(|e| user_info_error(url, e))?
            .json::<T>()
            .await
            .map_err(|e| user_info_error(url, e))?;
        Ok(value)
    }
}

/// Following redirects would let a provider response steer requests elsewhere.
fn http_client() -> Result<reqwest::Client, Error> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| OAuthError::Configuration(e.to_string()).into())
}

fn configuration(e: impl std::fmt::Display) -> Error {
    OAuthError::Configuration(e.to_string()).into()
}

fn user_info_error(url: &str, e: reqwest::Error) -> Error {
    tracing::error!(error = %e, status = ?e.status(), url, "User info request failed");
    OAuthError::UserInfo(e.to_string()).into()
}

/// Reject identities without a provider user id.
pub(crate) fn require_id(id: String) -> Result<String, Error> {
    if id.is_empty() {
        return Err(OAuthError::MissingUserId.into());
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINTS: ProviderEndpoints = ProviderEndpoints {
        auth_url: "https://auth.example.com/authorize",
        token_url: "https://auth.example.com/token",
        default_scopes: &["openid", "email"],
    };

    fn config(scopes: Vec<String>) -> ProviderConfig {
        ProviderConfig {
            client_id: "client_id".to_string(),
            client_secret: "client_secret".to_string(),
            redirect_url: "http://localhost:8080/callback".to_string(),
            scopes,
        }
    }

    #[test]
    fn test_default_scopes_apply_when_unset() {
        let client = OAuthClient::new(ENDPOINTS, &config(vec![])).unwrap();
        assert_eq!(client.scopes(), ["openid", "email"]);

        let client = OAuthClient::new(ENDPOINTS, &config(vec!["profile".to_string()])).unwrap();
        assert_eq!(client.scopes(), ["profile"]);
    }

    #[test]
    fn test_authorization_url_carries_state_and_pkce() {
        let client = OAuthClient::new(ENDPOINTS, &config(vec![])).unwrap();
        let first = client.authorization_url();
        let second = client.authorization_url();

        assert!(first.url.starts_with("https://auth.example.com/authorize?"));
        assert!(first.url.contains("client_id=client_id"));
        assert!(first.url.contains("code_challenge_method=S256"));
        assert!(first.url.contains(&format!("state={}", first.csrf_state)));
        assert!(!first.pkce_verifier.is_empty());
        assert_ne!(first.csrf_state, second.csrf_state);
        assert_ne!(first.pkce_verifier, second.pkce_verifier);
    }

    #[test]
    fn test_invalid_redirect_url_is_a_configuration_error() {
        let mut bad = config(vec![]);
        bad.redirect_url = "not a url".to_string();
        let err = OAuthClient::new(ENDPOINTS, &bad).unwrap_err();
        assert!(matches!(err, Error::OAuth(OAuthError::Configuration(_))));
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id("42".to_string()).unwrap(), "42");
        assert!(matches!(
            require_id(String::new()),
            Err(Error::OAuth(OAuthError::MissingUserId))
        ));
    }
}
