//! Notification delivery for LogForge alerts.
//!
//! This crate sends alert notifications produced by the detection engine to
//! operators over SMTP email and Slack webhooks. Delivery is best-effort:
//! failures are reported back to the caller but never retried here.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{Notifier, NotifierSettings, NotifyEvent};
//!
//! # async fn run() {
//! let notifier = Notifier::from_settings(&NotifierSettings::default());
//!
//! let results = notifier
//!     .notify_and_wait(NotifyEvent::LogAlert {
//!         workload: "web1".to_string(),
//!         subject: "LogForge Alert in web1".to_string(),
//!         body: "Keyword matched in logs".to_string(),
//!         recipients: vec!["ops@example.com".to_string()],
//!         timestamp: chrono::Utc::now(),
//!     })
//!     .await;
//! # let _ = results;
//! # }
//! ```
//!
//! # Configuration
//!
//! Channels are enabled from [`NotifierSettings`], which the engine builds
//! from its YAML configuration. Two environment variables are also honoured:
//!
//! - `SLACK_WEBHOOK_URL`: Slack webhook URL (enables the Slack channel)
//! - `NOTIFY_DISABLED`: Set to "true" to disable all notifications
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`EmailChannel`] delivers over SMTP
//! - [`SlackChannel`] implements Slack webhook notifications
//! - [`Notifier`] dispatches events to all enabled channels

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod events;

pub use channels::email::{EmailChannel, EmailSettings};
pub use channels::slack::SlackChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use events::NotifyEvent;

use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Environment variable to disable all notifications.
const ENV_NOTIFY_DISABLED: &str = "NOTIFY_DISABLED";

/// Channel settings used to build a [`Notifier`].
#[derive(Debug, Clone, Default)]
pub struct NotifierSettings {
    /// SMTP settings; `None` leaves the email channel off.
    pub email: Option<EmailSettings>,
    /// Slack webhook URL; falls back to `SLACK_WEBHOOK_URL` when unset.
    pub slack_webhook_url: Option<String>,
}

/// Central notification dispatcher.
///
/// The `Notifier` manages multiple notification channels and dispatches
/// events to all enabled channels.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    disabled: bool,
}

impl Notifier {
    /// Create a notifier from settings, honouring `NOTIFY_DISABLED`.
    #[must_use]
    pub fn from_settings(settings: &NotifierSettings) -> Self {
        let disabled = std::env::var(ENV_NOTIFY_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if disabled {
            info!("Notifications disabled via NOTIFY_DISABLED");
            return Self::disabled();
        }

        let mut channels: Vec<Arc<dyn NotifyChannel>> = vec![];

        if let Some(email) = &settings.email {
            match EmailChannel::new(email) {
                Ok(channel) => {
                    info!(smtp_host = %email.smtp_host, "Email notifications enabled");
                    channels.push(Arc::new(channel));
                }
                Err(e) => {
                    error!(error = %e, "Failed to configure SMTP transport, email disabled");
                }
            }
        }

        let slack = match &settings.slack_webhook_url {
            Some(url) => SlackChannel::new(url.clone()),
            None => SlackChannel::from_env(),
        };
        if slack.enabled() {
            info!("Slack notifications enabled");
            channels.push(Arc::new(slack));
        }

        if channels.is_empty() {
            warn!("No notification channels configured");
        } else {
            info!(
                channel_count = channels.len(),
                "Notification system initialized"
            );
        }

        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a disabled notifier (for testing or when notifications are off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channels: vec![],
            disabled: true,
        }
    }

    /// Check if any notification channels are enabled.
    #[must_use]
    pub fn has_channels(&self) -> bool {
        !self.disabled && !self.channels.is_empty()
    }

    /// Send a notification to every enabled channel and wait for all of them.
    ///
    /// Returns the per-channel outcome so the caller can log delivery failures.
    pub async fn notify_and_wait(
        &self,
        event: NotifyEvent,
    ) -> Vec<(String, Result<(), ChannelError>)> {
        if self.disabled || self.channels.is_empty() {
            debug!("No notification channels active, skipping event");
            return vec![];
        }

        let mut results = vec![];

        for channel in &self.channels {
            if !channel.enabled() {
                continue;
            }
            let channel_name = channel.name().to_string();
            let result = channel.send(&event).await;
            results.push((channel_name, result));
        }

        results
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::from_settings(&NotifierSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingChannel {
        sent: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl NotifyChannel for CountingChannel {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn enabled(&self) -> bool {
            true
        }

        async fn send(&self, _event: &NotifyEvent) -> Result<(), ChannelError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ChannelError::Other("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn sample_event() -> NotifyEvent {
        NotifyEvent::LogAlert {
            workload: "web1".to_string(),
            subject: "LogForge Alert in web1".to_string(),
            body: "ERROR disk full".to_string(),
            recipients: vec!["ops@example.com".to_string()],
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_disabled_notifier() {
        let notifier = Notifier::disabled();
        assert!(!notifier.has_channels());
    }

    #[tokio::test]
    async fn test_notify_and_wait_collects_results() {
        let ok = Arc::new(CountingChannel {
            sent: AtomicUsize::new(0),
            fail: false,
        });
        let failing = Arc::new(CountingChannel {
            sent: AtomicUsize::new(0),
            fail: true,
        });
        let notifier = Notifier::with_channels(vec![
            ok.clone() as Arc<dyn NotifyChannel>,
            failing.clone() as Arc<dyn NotifyChannel>,
        ]);

        let results = notifier.notify_and_wait(sample_event()).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert_eq!(ok.sent.load(Ordering::SeqCst), 1);
        assert_eq!(failing.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_notifier_sends_nothing() {
        let results = Notifier::disabled().notify_and_wait(sample_event()).await;
        assert!(results.is_empty());
    }
}
