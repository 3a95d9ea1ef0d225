//! Core of the latchkey authentication toolkit
//!
//! This crate holds the token and identity lifecycle engine: the rules that
//! turn a password, a magic link or a federated identity into an
//! access/refresh token pair, and that refresh and revoke that pair.
//!
//! Storage, mail delivery and the OAuth2 wire protocol are reached through
//! traits ([`repositories::RepositoryProvider`], [`MailSender`],
//! [`OAuthProvider`]) implemented by the sibling crates.
pub mod config;
pub mod crypto;
pub mod error;
pub mod id;
pub mod jwt;
pub mod mailer;
pub mod oauth;
pub mod password;
pub mod repositories;
pub mod services;
pub mod token;
pub mod user;
pub mod validation;

pub use config::AuthConfig;
pub use error::Error;
pub use jwt::{AccessTokenClaims, AccessTokenCodec, JwtAlgorithm, JwtConfig};
pub use mailer::{MailMessage, MailSender, RecordingMailSender};
pub use oauth::{AuthorizationUrl, FederatedIdentity, OAuthProvider};
pub use repositories::RepositoryProvider;
pub use token::{PasswordlessToken, Token, TokenId, TokenResponse, TokenType};
pub use user::{LOCAL_PROVIDER, Metadata, NewUser, User, UserId};
