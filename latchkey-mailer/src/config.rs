use crate::transports::TlsConfig;
use crate::{FileMailer, MailerError, SmtpMailer};
use latchkey_core::MailSender;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    pub transport: TransportConfig,
    pub from_address: String,
    pub from_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Smtp {
        host: String,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        tls: Option<TlsType>,
    },
    File {
        output_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsType {
    None,
    StartTls,
    Tls,
}

impl From<TlsType> for TlsConfig {
    fn from(tls_type: TlsType) -> Self {
        match tls_type {
            TlsType::None => TlsConfig::None,
            TlsType::StartTls => TlsConfig::StartTls,
            TlsType::Tls => TlsConfig::Tls,
        }
    }
}

impl std::str::FromStr for TlsType {
    type Err = MailerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(TlsType::None),
            "starttls" => Ok(TlsType::StartTls),
            "tls" => Ok(TlsType::Tls),
            other => Err(MailerError::Config(format!("unknown TLS mode: {other}"))),
        }
    }
}

impl MailerConfig {
    /// Read `MAILER_*` variables. Without `MAILER_SMTP_HOST` mail is written
    /// to `MAILER_FILE_OUTPUT_DIR`, or `./emails`.
    pub fn from_env() -> Result<Self, MailerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MailerError> {
        let transport = if let Some(host) = lookup("MAILER_SMTP_HOST") {
            let port = match lookup("MAILER_SMTP_PORT") {
                Some(raw) => Some(raw.parse().map_err(|_| {
                    MailerError::Config(format!("MAILER_SMTP_PORT={raw}"))
                })?),
                None => None,
            };
            TransportConfig::Smtp {
                host,
                port,
                username: lookup("MAILER_SMTP_USERNAME"),
                password: lookup("MAILER_SMTP_PASSWORD"),
                tls: lookup("MAILER_SMTP_TLS").map(|t| t.parse()).transpose()?,
            }
        } else {
            TransportConfig::File {
                output_dir: lookup("MAILER_FILE_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./emails")),
            }
        };

        Ok(Self {
            transport,
            from_address: lookup("MAILER_FROM_ADDRESS")
                .unwrap_or_else(|| "noreply@example.com".to_string()),
            from_name: lookup("MAILER_FROM_NAME"),
        })
    }

    pub fn build_transport(&self) -> Result<Arc<dyn MailSender>, MailerError> {
        let from = self.get_from_address();
        match &self.transport {
            TransportConfig::Smtp {
                host,
                port,
                username,
                password,
                tls,
            } => {
                let mut builder = SmtpMailer::builder(host, &from);

                if let Some(port) = port {
                    builder = builder.port(*port);
                }

                if let (Some(username), Some(password)) = (username, password) {
                    builder = builder.credentials(username, password);
                }

                if let Some(tls) = tls {
                    builder = builder.tls((*tls).into());
                }

                Ok(Arc::new(builder.build()?))
            }
            TransportConfig::File { output_dir } => {
                Ok(Arc::new(FileMailer::new(output_dir, &from)?))
            }
        }
    }

    pub fn get_from_address(&self) -> String {
        if let Some(name) = &self.from_name {
            format!("{} <{}>", name, self.from_address)
        } else {
            self.from_address.clone()
        }
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::File {
                output_dir: PathBuf::from("./emails"),
            },
            from_address: "noreply@example.com".to_string(),
            from_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = MailerConfig::default();
        assert_eq!(config.from_address, "noreply@example.com");

        match config.transport {
            TransportConfig::File { output_dir } => {
                assert_eq!(output_dir, PathBuf::from("./emails"));
            }
            _ => panic!("Expected file transport"),
        }
    }

    #[test]
    fn test_get_from_address() {
        let mut config = MailerConfig::default();
        assert_eq!(config.get_from_address(), "noreply@example.com");

        config.from_name = Some("Latchkey".to_string());
        assert_eq!(config.get_from_address(), "Latchkey <noreply@example.com>");
    }

    #[test]
    fn test_smtp_from_lookup() {
        let config = MailerConfig::from_lookup(lookup(&[
            ("MAILER_SMTP_HOST", "smtp.example.com"),
            ("MAILER_SMTP_PORT", "2525"),
            ("MAILER_SMTP_TLS", "StartTLS"),
            ("MAILER_FROM_ADDRESS", "auth@example.com"),
        ]))
        .unwrap();

        assert_eq!(config.from_address, "auth@example.com");
        match config.transport {
            TransportConfig::Smtp { host, port, tls, .. } => {
                assert_eq!(host, "smtp.example.com");
                assert_eq!(port, Some(2525));
                assert_eq!(tls, Some(TlsType::StartTls));
            }
            _ => panic!("Expected SMTP transport"),
        }
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let result = MailerConfig::from_lookup(lookup(&[
            ("MAILER_SMTP_HOST", "smtp.example.com"),
            ("MAILER_SMTP_PORT", "smtp"),
        ]));
        assert!(matches!(result, Err(MailerError::Config(_))));
    }

    #[test]
    fn test_config_deserializes_from_json() {
        let config: MailerConfig = serde_json::from_str(
            r#"{
                "transport": {"type": "smtp", "host": "localhost", "port": 1025,
                              "username": null, "password": null, "tls": "none"},
                "from_address": "noreply@example.com",
                "from_name": "Latchkey"
            }"#,
        )
        .unwrap();
        assert!(matches!(
            config.transport,
            TransportConfig::Smtp {
                tls: Some(TlsType::None),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_build_file_transport() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = MailerConfig {
            transport: TransportConfig::File {
                output_dir: temp_dir.path().to_path_buf(),
            },
            ..MailerConfig::default()
        };

        let mailer = config.build_transport().unwrap();
        mailer
            .send("user@example.com", "Magic Link Login", "body")
            .await
            .unwrap();
    }
}
