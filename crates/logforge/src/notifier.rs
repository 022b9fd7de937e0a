//! Bridge from the engine to the delivery crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notify::{Notifier, NotifyEvent};
use tracing::debug;

use crate::error::EngineError;

/// Delivers one alert notification.
///
/// Called only after both the dedup gate and the notification throttle have
/// allowed it. The engine logs failures and never retries.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify(
        &self,
        workload_id: &str,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> Result<(), EngineError>;
}

/// Subject line for an alert email.
#[must_use]
pub fn alert_subject(workload_id: &str) -> String {
    format!("🚨 LogForge Alert in {workload_id}")
}

/// Body text for an alert email.
#[must_use]
pub fn alert_body(detected_at: DateTime<Utc>, line: &str) -> String {
    format!(
        "Keyword matched in logs at {}.\n\nLine:\n{line}",
        detected_at.to_rfc3339()
    )
}

#[async_trait]
impl AlertNotifier for Notifier {
    async fn notify(
        &self,
        workload_id: &str,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> Result<(), EngineError> {
        let event = NotifyEvent::LogAlert {
            workload: workload_id.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            recipients: recipients.to_vec(),
            timestamp: Utc::now(),
        };

        let failures: Vec<String> = self
            .notify_and_wait(event)
            .await
            .into_iter()
            .filter_map(|(channel, result)| match result {
                Ok(()) => {
                    debug!(channel = %channel, workload = workload_id, "Alert delivered");
                    None
                }
                Err(e) => Some(format!("{channel}: {e}")),
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(EngineError::NotificationFailed {
                workload: workload_id.to_string(),
                reason: failures.join("; "),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use notify::{ChannelError, NotifyChannel};
    use std::sync::Arc;

    struct FailingChannel;

    #[async_trait]
    impl NotifyChannel for FailingChannel {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn enabled(&self) -> bool {
            true
        }

        async fn send(&self, _event: &NotifyEvent) -> Result<(), ChannelError> {
            Err(ChannelError::Other("smtp down".to_string()))
        }
    }

    #[test]
    fn test_alert_content() {
        let at = Utc.with_ymd_and_hms(2025, 5, 9, 0, 16, 16).unwrap();
        assert_eq!(alert_subject("web1"), "🚨 LogForge Alert in web1");
        assert_eq!(
            alert_body(at, "ERROR disk full"),
            "Keyword matched in logs at 2025-05-09T00:16:16+00:00.\n\nLine:\nERROR disk full"
        );
    }

    #[tokio::test]
    async fn test_channel_failure_maps_to_engine_error() {
        let notifier = Notifier::with_channels(vec![Arc::new(FailingChannel) as Arc<dyn NotifyChannel>]);
        let err = AlertNotifier::notify(&notifier, "web1", "s", "b", &[])
            .await
            .unwrap_err();
        match err {
            EngineError::NotificationFailed { workload, reason } => {
                assert_eq!(workload, "web1");
                assert!(reason.contains("failing"));
                assert!(reason.contains("smtp down"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_disabled_notifier_succeeds() {
        let notifier = Notifier::disabled();
        assert!(AlertNotifier::notify(&notifier, "web1", "s", "b", &[]).await.is_ok());
    }
}
