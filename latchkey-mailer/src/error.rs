use latchkey_core::error::MailError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Email transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("File transport error: {0}")]
    File(#[from] lettre::transport::file::Error),

    #[error("Email message error: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MailerError>;

impl From<MailerError> for latchkey_core::Error {
    fn from(e: MailerError) -> Self {
        let mail = match e {
            MailerError::Address(e) => MailError::InvalidAddress(e.to_string()),
            MailerError::Message(e) => MailError::Message(e.to_string()),
            MailerError::Config(msg) => MailError::Message(msg),
            other => MailError::Delivery(other.to_string()),
        };
        latchkey_core::Error::Mail(mail)
    }
}
