use std::sync::Arc;

use latchkey_core::{Error, OAuthProvider, error::OAuthError};
use serde::{Deserialize, Serialize};

use crate::providers::{Facebook, Github, Google};

/// Client credentials for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    /// Empty means the provider's default scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Which providers are enabled. A provider is left out when its client id
/// is unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub google: Option<ProviderConfig>,
    pub github: Option<ProviderConfig>,
    pub facebook: Option<ProviderConfig>,
}

impl OAuthConfig {
    /// Read `OAUTH_{GOOGLE,GITHUB,FACEBOOK}_{CLIENT_ID,CLIENT_SECRET,REDIRECT_URL,SCOPES}`.
    ///
    /// Scopes are separated by commas or whitespace.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        Ok(Self {
            google: provider_from_lookup("GOOGLE", &lookup)?,
            github: provider_from_lookup("GITHUB", &lookup)?,
            facebook: provider_from_lookup("FACEBOOK", &lookup)?,
        })
    }

    /// Instantiate every configured provider.
    pub fn build_providers(&self) -> Result<Vec<Arc<dyn OAuthProvider>>, Error> {
        let mut providers: Vec<Arc<dyn OAuthProvider>> = Vec::new();
        if let Some(config) = &self.google {
            providers.push(Arc::new(Google::new(config)?));
        }
        if let Some(config) = &self.github {
            providers.push(Arc::new(Github::new(config)?));
        }
        if let Some(config) = &self.facebook {
            providers.push(Arc::new(Facebook::new(config)?));
        }
        Ok(providers)
    }
}

fn provider_from_lookup(
    name: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<ProviderConfig>, Error> {
    let Some(client_id) = lookup(&format!("OAUTH_{name}_CLIENT_ID")).filter(|s| !s.is_empty())
    else {
        return Ok(None);
    };

    let required = |field: &str| {
        let key = format!("OAUTH_{name}_{field}");
        lookup(&key)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::from(OAuthError::Configuration(format!("{key} is required"))))
    };

    Ok(Some(ProviderConfig {
        client_id,
        client_secret: required("CLIENT_SECRET")?,
        redirect_url: required("REDIRECT_URL")?,
        scopes: lookup(&format!("OAUTH_{name}_SCOPES"))
            .map(|raw| {
                raw.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }))
}
