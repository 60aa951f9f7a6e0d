use crate::domain::ports::Mailer;
use crate::email::message::{EmailDraft, EmailMessage};
use crate::utils::error::{OpsError, Result};
use crate::utils::validation::{self, Validate};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityContract {
    /// 465 port，連線一開始就走 TLS
    Ssl,
    StartTls,
}

/// SMTP 伺服器設定；帳號密碼只從環境變數讀取
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    #[serde(skip)]
    pub sender_email_address: String,
    #[serde(skip)]
    pub app_password: String,
    pub server: String,
    pub port: u16,
    pub security: SecurityContract,
    pub timeout_seconds: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            sender_email_address: String::new(),
            app_password: String::new(),
            server: "smtp.gmail.com".to_string(),
            port: 465,
            security: SecurityContract::Ssl,
            timeout_seconds: 30,
        }
    }
}

impl SmtpConfig {
    pub const SENDER_ENV: &'static str = "ODYSSEY_EMAIL_ADDRESS";
    pub const PASSWORD_ENV: &'static str = "GOOGLE_SMTP_APP_PASS";

    /// 從環境變數補上寄件帳號，空字串視同未設定
    pub fn with_credentials_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| OpsError::MissingConfigError {
                    field: name.to_string(),
                })
        };

        self.sender_email_address = read(Self::SENDER_ENV)?;
        self.app_password = read(Self::PASSWORD_ENV)?;
        Ok(self)
    }

    pub fn with_env_credentials(self) -> Result<Self> {
        self.with_credentials_from(|name| std::env::var(name).ok())
    }
}

impl Validate for SmtpConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_email_address(Self::SENDER_ENV, &self.sender_email_address)?;
        validation::validate_non_empty_string(Self::PASSWORD_ENV, &self.app_password)?;
        validation::validate_non_empty_string("smtp.server", &self.server)?;
        validation::validate_positive_number("smtp.port", usize::from(self.port), 1)?;
        Ok(())
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let builder = match config.security {
            SecurityContract::Ssl => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)?,
            SecurityContract::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)?
            }
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.sender_email_address.clone(),
                config.app_password.clone(),
            ))
            .timeout(Some(Duration::from_secs(config.timeout_seconds)))
            .build();

        Ok(Self { transport })
    }

    pub async fn test_connection(&self) -> Result<bool> {
        Ok(self.transport.test_connection().await?)
    }
}

impl Mailer for SmtpMailer {
    async fn deliver(&self, message: Message) -> Result<()> {
        self.transport.send(message).await?;
        Ok(())
    }
}

/// 對外的寄信介面
pub struct EmailClient<M: Mailer> {
    mailer: M,
    sender: String,
}

impl<M: Mailer> EmailClient<M> {
    pub fn new(mailer: M, sender: impl Into<String>) -> Self {
        Self {
            mailer,
            sender: sender.into(),
        }
    }

    /// 信件內容有誤時回傳錯誤；傳輸失敗只記錄並回傳 false
    pub async fn send_email(&self, message: &EmailMessage) -> Result<bool> {
        let email = message.build(&self.sender)?;

        match self.mailer.deliver(email).await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::error!(
                    "SMTP delivery to {} failed: {} (Category: {:?})",
                    message.destination_email_address,
                    e,
                    e.category()
                );
                Ok(false)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendReport {
    pub recipient: String,
    pub delivered: bool,
    pub error: Option<String>,
}

/// 每位收件人各寄一封，失敗不會中斷後面的收件人
pub async fn send_to_recipients<M: Mailer>(
    client: &EmailClient<M>,
    recipients: &[String],
    draft: &EmailDraft,
) -> Vec<SendReport> {
    let mut reports = Vec::with_capacity(recipients.len());

    for recipient in recipients {
        tracing::info!("Sending Email to {}...", recipient);
        let report = match client.send_email(&draft.addressed_to(recipient)).await {
            Ok(delivered) => SendReport {
                recipient: recipient.clone(),
                delivered,
                error: None,
            },
            Err(e) => {
                tracing::error!("Error with Email Transfer to {}: {}", recipient, e);
                SendReport {
                    recipient: recipient.clone(),
                    delivered: false,
                    error: Some(e.to_string()),
                }
            }
        };

        if report.delivered {
            tracing::info!("Email to {} PASS", recipient);
        } else {
            tracing::warn!("Email to {} FAIL", recipient);
        }
        reports.push(report);
    }

    reports
}
