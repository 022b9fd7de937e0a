//! SMTP email notification channel.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::error::ChannelError;
use crate::events::NotifyEvent;
use crate::NotifyChannel;

/// Default SMTP relay (implicit TLS on port 465).
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
/// Default SMTP port.
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// SMTP connection settings.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Sender address, also used as the SMTP username
    pub sender: String,
    /// App password for the sender account
    pub password: Option<String>,
}

/// SMTP email channel.
///
/// Recipients come from each event; an event without recipients is
/// skipped rather than treated as a failure.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailChannel {
    /// Build an email channel from SMTP settings.
    pub fn new(settings: &EmailSettings) -> Result<Self, ChannelError> {
        let from: Mailbox = settings
            .sender
            .parse()
            .map_err(|e| ChannelError::Message(format!("invalid sender '{}': {e}", settings.sender)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)?
            .port(settings.smtp_port);

        if let Some(password) = &settings.password {
            builder = builder.credentials(Credentials::new(
                settings.sender.clone(),
                password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Build the email message for an event.
    fn build_message(&self, event: &NotifyEvent) -> Result<Message, ChannelError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(event.title())
            .header(ContentType::TEXT_PLAIN);

        for recipient in event.recipients() {
            let mailbox: Mailbox = recipient
                .parse()
                .map_err(|e| ChannelError::Message(format!("invalid recipient '{recipient}': {e}")))?;
            builder = builder.to(mailbox);
        }

        builder
            .body(format_body(event))
            .map_err(|e| ChannelError::Message(e.to_string()))
    }
}

/// Plain-text body for an event.
fn format_body(event: &NotifyEvent) -> String {
    match event.workload() {
        Some(workload) => format!("Workload: {workload}\n\n{}", event.body()),
        None => event.body(),
    }
}

#[async_trait]
impl NotifyChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn send(&self, event: &NotifyEvent) -> Result<(), ChannelError> {
        if event.recipients().is_empty() {
            debug!(channel = "email", "No recipients for event, skipping");
            return Ok(());
        }

        let message = self.build_message(event)?;

        debug!(
            channel = "email",
            recipients = event.recipients().len(),
            "Sending notification"
        );

        self.transport.send(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_body_includes_workload() {
        let event = NotifyEvent::LogAlert {
            workload: "web1".to_string(),
            subject: "LogForge Alert in web1".to_string(),
            body: "Line:\nERROR disk full".to_string(),
            recipients: vec![],
            timestamp: Utc::now(),
        };
        assert_eq!(format_body(&event), "Workload: web1\n\nLine:\nERROR disk full");
    }

    #[tokio::test]
    async fn test_rejects_invalid_sender() {
        let settings = EmailSettings {
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            sender: "not an address".to_string(),
            password: None,
        };
        assert!(matches!(
            EmailChannel::new(&settings),
            Err(ChannelError::Message(_))
        ));
    }
}
