use async_trait::async_trait;
use latchkey_core::{Error, MailSender};
use lettre::Transport;
use lettre::transport::file::FileTransport;
use std::path::{Path, PathBuf};

use crate::{MailerError, message::build_message};

/// Writes each message as an `.eml` file, for development and tests.
#[derive(Debug, Clone)]
pub struct FileMailer {
    transport: FileTransport,
    output_dir: PathBuf,
    from: String,
}

impl FileMailer {
    pub fn new<P: AsRef<Path>>(output_dir: P, from: &str) -> Result<Self, MailerError> {
        let output_dir = output_dir.as_ref().to_path_buf();

        if !output_dir.exists() {
            std::fs::create_dir_all(&output_dir)?;
        }

        Ok(Self {
            transport: FileTransport::new(&output_dir),
            output_dir,
            from: from.to_string(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl MailSender for FileMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), Error> {
        let message = build_message(&self.from, to, subject, body)?;

        // lettre's FileTransport is sync
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailerError::Io(std::io::Error::other(e)))?
            .map_err(MailerError::from)?;

        tracing::debug!(to, subject, dir = %self.output_dir.display(), "Wrote mail to file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_mailer_writes_message() {
        let temp_dir = tempdir().unwrap();
        let mailer = FileMailer::new(temp_dir.path(), "noreply@example.com").unwrap();

        mailer
            .send(
                "recipient@example.com",
                "Password Reset Request",
                "You requested a password reset.",
            )
            .await
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 1);

        let contents = std::fs::read_to_string(entries[0].path()).unwrap();
        assert!(contents.contains("Password Reset Request"));
    }

    #[tokio::test]
    async fn test_file_mailer_creates_missing_dir() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("mail").join("out");
        let mailer = FileMailer::new(&nested, "noreply@example.com").unwrap();
        assert!(mailer.output_dir().is_dir());
    }
}
