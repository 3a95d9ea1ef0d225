//! OAuth2 identity providers for latchkey
//!
//! Each provider implements [`latchkey_core::OAuthProvider`]: it builds the
//! authorization URL (with CSRF state and a PKCE verifier), exchanges the
//! callback code, and normalizes the provider's user info into a
//! [`latchkey_core::FederatedIdentity`].
//!
//! ```rust,no_run
//! use latchkey_oauth::OAuthConfig;
//!
//! # fn run() -> Result<(), latchkey_core::Error> {
//! let providers = OAuthConfig::from_env()?.build_providers()?;
//! for provider in &providers {
//!     println!("{}", provider.authorization_url()?.url);
//! }
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod providers;

pub use config::{OAuthConfig, ProviderConfig};
pub use providers::{Facebook, Github, Google, OAuthClient, ProviderEndpoints};
