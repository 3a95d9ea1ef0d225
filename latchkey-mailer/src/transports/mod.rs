mod file;
pub mod smtp;

pub use file::FileMailer;
pub use smtp::{SmtpMailer, SmtpMailerBuilder, TlsConfig};
