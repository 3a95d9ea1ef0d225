//! Mail delivery for latchkey
//!
//! Implements [`latchkey_core::MailSender`] over lettre. [`SmtpMailer`]
//! delivers through a relay; [`FileMailer`] writes `.eml` files for local
//! development. [`MailerConfig`] picks one from `MAILER_*` variables.
//!
//! ```rust,no_run
//! use latchkey_mailer::MailerConfig;
//!
//! # fn run() -> Result<(), latchkey_mailer::MailerError> {
//! let mailer = MailerConfig::from_env()?.build_transport()?;
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod error;
mod message;
pub mod transports;

pub use config::{MailerConfig, TlsType, TransportConfig};
pub use error::{MailerError, Result};
pub use transports::{FileMailer, SmtpMailer, SmtpMailerBuilder, TlsConfig};
