//! Outgoing mail contract and message formatting
//!
//! The engine formats every message itself; a [`MailSender`] only delivers
//! it. Delivery errors are returned to the caller unchanged.
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::Error;

#[async_trait]
pub trait MailSender: Send + Sync + 'static {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), Error>;
}

/// A formatted message ready for a [`MailSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    pub fn magic_link(to: &str, base_url: &str, token: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            to: to.to_string(),
            subject: "Magic Link Login".to_string(),
            body: format!(
                "Click the following link to login: {base_url}/auth/passwordless/login?token={token}"
            ),
        }
    }

    pub fn password_reset(to: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Password Reset Request".to_string(),
            body: format!("You requested a password reset. Please use the following token: {token}"),
        }
    }

    pub async fn send_with(&self, sender: &dyn MailSender) -> Result<(), Error> {
        sender.send(&self.to, &self.subject, &self.body).await
    }
}

/// Keeps every message in memory instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailSender {
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl RecordingMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn last(&self) -> Option<MailMessage> {
        self.sent.lock().await.last().cloned()
    }
}

#[async_trait]
impl MailSender for RecordingMailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), Error> {
        self.sent.lock().await.push(MailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_link_message() {
        let message = MailMessage::magic_link("new@test.com", "https://auth.example.com/", "abc");
        assert_eq!(message.subject, "Magic Link Login");
        assert_eq!(
            message.body,
            "Click the following link to login: https://auth.example.com/auth/passwordless/login?token=abc"
        );
    }

    #[test]
    fn test_password_reset_message() {
        let message = MailMessage::password_reset("u@test.com", "xyz");
        assert_eq!(message.subject, "Password Reset Request");
        assert!(message.body.ends_with("xyz"));
    }

    #[tokio::test]
    async fn test_recording_sender() {
        let sender = RecordingMailSender::new();
        MailMessage::password_reset("u@test.com", "xyz")
            .send_with(&sender)
            .await
            .unwrap();

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "u@test.com");
    }
}
