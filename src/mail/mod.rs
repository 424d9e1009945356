//! Outgoing email
//!
//! The auth service only needs "send this message to this address"; the
//! `Mailer` trait is that seam and `SmtpMailer` is the production transport.

use crate::core::config::MailConfig;
use crate::core::error::{AppError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

const SMTP_TIMEOUT: Duration = Duration::from_secs(15);

pub const RESET_PASSWORD_SUBJECT: &str = "Password reset link";

/// A single HTML email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<()>;
}

/// Compose the password reset email pointing at `link`
pub fn reset_password_email(to: &str, link: &str) -> MailMessage {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; background-color: #282828; padding: 20px;">
    <div style="background-color: #fff; border-radius: 10px; padding: 20px;">
        <h2 style="color: #333; text-align: center; margin-bottom: 30px;">Password reset</h2>
        <p style="color: #555; text-align: center;">Click the button below to choose a new password:</p>
        <div style="text-align: center; margin-top: 20px;">
            <a href="{link}" style="background-color: #c09e5a; color: #fff; padding: 10px 20px; border-radius: 5px; text-decoration: none; font-weight: bold;">Reset password</a>
        </div>
        <p style="color: #555; text-align: center; margin-top: 20px;">The link expires in one hour. If you did not ask for a reset, you can safely ignore this email.</p>
    </div>
</div>"#,
        link = link
    );

    MailMessage {
        to: to.to_string(),
        subject: RESET_PASSWORD_SUBJECT.to_string(),
        html,
    }
}

/// SMTP delivery through `lettre` on the tokio runtime
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| AppError::ConfigError(format!("Invalid mail sender '{}': {}", config.from, e)))?;

        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| AppError::ConfigError(format!("Invalid SMTP relay: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port).timeout(Some(SMTP_TIMEOUT));

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        tracing::info!(
            host = %config.host,
            port = config.port,
            starttls = config.starttls,
            "SMTP mailer configured"
        );

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, message: MailMessage) -> Result<Message> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| AppError::EmailDeliveryError(format!("Invalid recipient: {}", e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html)
            .map_err(|e| AppError::EmailDeliveryError(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        let email = self.build_message(message)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::EmailDeliveryError(e.to_string()))?;

        Ok(())
    }
}

/// Test double that records messages instead of sending them
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<MailMessage>>,
    fail: bool,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails like an unreachable relay
    pub fn failing() -> Self {
        Self {
            sent: Default::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        if self.fail {
            return Err(AppError::EmailDeliveryError("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config() -> MailConfig {
        MailConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: String::new(),
            password: String::new(),
            from: "no-reply@feedback.fr".to_string(),
            starttls: false,
        }
    }

    #[test]
    fn test_reset_email_contains_link() {
        let link = "http://localhost:3000/forgotPassword/reset/u1/tok";
        let message = reset_password_email("ada@example.com", link);

        assert_eq!(message.to, "ada@example.com");
        assert_eq!(message.subject, RESET_PASSWORD_SUBJECT);
        assert!(message.html.contains(&format!("href=\"{}\"", link)));
    }

    #[test]
    fn test_smtp_mailer_builds_html_message() {
        let mailer = SmtpMailer::from_config(&mail_config()).unwrap();
        let message = mailer
            .build_message(reset_password_email("ada@example.com", "http://x/y"))
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: ada@example.com"));
        assert!(raw.contains("Subject: Password reset link"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_invalid_recipient_is_delivery_error() {
        let mailer = SmtpMailer::from_config(&mail_config()).unwrap();
        let result = mailer.build_message(reset_password_email("not an address", "http://x/y"));
        assert!(matches!(result, Err(AppError::EmailDeliveryError(_))));
    }

    #[test]
    fn test_invalid_sender_is_config_error() {
        let mut config = mail_config();
        config.from = "nobody".to_string();
        assert!(matches!(
            SmtpMailer::from_config(&config),
            Err(AppError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_recording_mailer() {
        let mailer = RecordingMailer::new();
        mailer.send(reset_password_email("a@b.cd", "l")).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);

        let failing = RecordingMailer::failing();
        assert!(failing.send(reset_password_email("a@b.cd", "l")).await.is_err());
    }
}
