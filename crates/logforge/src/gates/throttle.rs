//! Per-workload spacing between outbound notifications.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ThrottleEntry {
    recipients: Vec<String>,
    last_sent: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct NotificationThrottle {
    sent: HashMap<String, ThrottleEntry>,
}

impl NotificationThrottle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a notification for `workload_id` may go out now.
    ///
    /// The first call for a workload is always allowed. Later calls are
    /// allowed once `interval_hours` have passed since the last allowed one.
    /// An allowed call records `now` and the resolved recipients.
    pub fn allow_send(
        &mut self,
        workload_id: &str,
        now: DateTime<Utc>,
        interval_hours: f64,
        recipients: &[String],
    ) -> bool {
        if let Some(entry) = self.sent.get(workload_id) {
            if now - entry.last_sent < interval(interval_hours) {
                return false;
            }
        }
        self.sent.insert(
            workload_id.to_string(),
            ThrottleEntry {
                recipients: recipients.to_vec(),
                last_sent: now,
            },
        );
        true
    }

    #[must_use]
    pub fn last_sent(&self, workload_id: &str) -> Option<DateTime<Utc>> {
        self.sent.get(workload_id).map(|e| e.last_sent)
    }

    /// Recipients recorded with the last allowed notification.
    #[must_use]
    pub fn recipients(&self, workload_id: &str) -> Option<&[String]> {
        self.sent.get(workload_id).map(|e| e.recipients.as_slice())
    }
}

/// Fractional hours as a `Duration`. Non-positive or NaN values are zero.
pub(crate) fn interval(hours: f64) -> Duration {
    if hours.is_nan() || hours <= 0.0 {
        return Duration::zero();
    }
    let millis = (hours * 3_600_000.0).round();
    if millis >= i64::MAX as f64 {
        return Duration::MAX;
    }
    Duration::try_milliseconds(millis as i64).unwrap_or(Duration::MAX)
}
