use async_trait::async_trait;
use latchkey_core::{Error, MailSender};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::{MailerError, message::build_message};

/// Delivers mail through an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(transport: AsyncSmtpTransport<Tokio1Executor>, from: &str) -> Self {
        Self {
            transport,
            from: from.to_string(),
        }
    }

    pub fn builder(hostname: &str, from: &str) -> SmtpMailerBuilder {
        SmtpMailerBuilder::new(hostname, from)
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), Error> {
        let message = build_message(&self.from, to, subject, body)?;
        self.transport
            .send(message)
            .await
            .map_err(MailerError::from)?;
        tracing::debug!(to, subject, "Sent mail over SMTP");
        Ok(())
    }
}

pub struct SmtpMailerBuilder {
    hostname: String,
    from: String,
    port: Option<u16>,
    credentials: Option<Credentials>,
    tls: TlsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsConfig {
    None,
    StartTls,
    Tls,
}

impl SmtpMailerBuilder {
    pub fn new(hostname: &str, from: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            from: from.to_string(),
            port: None,
            credentials: None,
            tls: TlsConfig::StartTls,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials::new(username.to_string(), password.to_string()));
        self
    }

    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn build(self) -> Result<SmtpMailer, MailerError> {
        let mut builder = match self.tls {
            TlsConfig::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.hostname)
            }
            TlsConfig::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.hostname)?
            }
            TlsConfig::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.hostname)?,
        };

        if let Some(port) = self.port {
            builder = builder.port(port);
        }

        if let Some(credentials) = self.credentials {
            builder = builder.credentials(credentials);
        }

        Ok(SmtpMailer::new(builder.build(), &self.from))
    }
}
