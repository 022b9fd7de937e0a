//! Notification event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events that can trigger notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyEvent {
    /// A keyword matched in a workload's log output
    LogAlert {
        workload: String,
        subject: String,
        body: String,
        /// Email addresses resolved for the workload
        #[serde(default)]
        recipients: Vec<String>,
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },

    /// Operator-triggered message to verify channel configuration
    DeliveryTest {
        #[serde(default)]
        recipients: Vec<String>,
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
}

impl NotifyEvent {
    /// Get the title for this event.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::LogAlert { subject, .. } => subject.clone(),
            Self::DeliveryTest { .. } => "LogForge test notification".to_string(),
        }
    }

    /// Get the message body for this event.
    #[must_use]
    pub fn body(&self) -> String {
        match self {
            Self::LogAlert { body, .. } => body.clone(),
            Self::DeliveryTest { timestamp, .. } => format!(
                "Notification channels are configured correctly ({}).",
                timestamp.to_rfc3339()
            ),
        }
    }

    /// Email recipients for this event.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        match self {
            Self::LogAlert { recipients, .. } | Self::DeliveryTest { recipients, .. } => recipients,
        }
    }

    /// Workload the event refers to, if any.
    #[must_use]
    pub fn workload(&self) -> Option<&str> {
        match self {
            Self::LogAlert { workload, .. } => Some(workload),
            Self::DeliveryTest { .. } => None,
        }
    }

    /// Get the timestamp of this event.
    #[must_use]
    pub const fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::LogAlert { timestamp, .. } | Self::DeliveryTest { timestamp, .. } => timestamp,
        }
    }
}
