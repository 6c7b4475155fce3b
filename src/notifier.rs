//! Outbound watering reminders.
//!
//! The scanner only sees the [`Notifier`] trait. The server picks
//! [`SmtpNotifier`] when SMTP is configured and falls back to
//! [`LogNotifier`] otherwise.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::error::{PlantError, PlantResult};

pub const REMINDER_SUBJECT: &str = "Time to water your plants";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> PlantResult<()>;
}

/// Body of the reminder for one user, listing plant names in the given order.
pub fn reminder_body(username: &str, plant_names: &[String]) -> String {
    format!(
        "Hello {}, the following plants need watering: {}",
        username,
        plant_names.join(", ")
    )
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig, timeout: Duration) -> PlantResult<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| PlantError::Notification(format!("Invalid sender address: {}", e)))?;

        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| PlantError::Notification(format!("Failed to configure SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .timeout(Some(timeout))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> PlantResult<()> {
        let to = recipient
            .parse::<Mailbox>()
            .map_err(|e| PlantError::Notification(format!("Invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| PlantError::Notification(format!("Failed to build email: {}", e)))?;

        match self.transport.send(message).await {
            Ok(_) => {
                tracing::info!(recipient, "Reminder email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(recipient, error = %e, "Failed to send reminder email");
                Err(PlantError::Notification(format!("Failed to send email: {}", e)))
            }
        }
    }
}

/// Writes reminders to the log instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> PlantResult<()> {
        tracing::info!(recipient, subject, body, "Reminder (SMTP not configured)");
        Ok(())
    }
}
