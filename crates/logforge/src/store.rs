//! Time-bounded record of fired alerts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long an alert stays in the store.
pub const DEFAULT_RETENTION_HOURS: i64 = 48;

/// A keyword match that passed the dedup gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub workload_id: String,
    pub timestamp: DateTime<Utc>,
    /// Raw (trimmed) log line, timestamp prefix included
    pub message: String,
}

/// Alerts in detection order.
///
/// Alerts are never modified after insertion; they leave the store through
/// [`AlertStore::prune`], [`AlertStore::purge`] or [`AlertStore::clear`].
#[derive(Debug, Clone)]
pub struct AlertStore {
    alerts: Vec<Alert>,
    retention: Duration,
}

impl AlertStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_retention(Duration::hours(DEFAULT_RETENTION_HOURS))
    }

    #[must_use]
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            alerts: Vec::new(),
            retention,
        }
    }

    pub fn set_retention(&mut self, retention: Duration) {
        self.retention = retention;
    }

    /// Drop alerts older than the retention window. Returns how many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            return 0;
        };
        let before = self.alerts.len();
        self.alerts.retain(|a| a.timestamp > cutoff);
        before - self.alerts.len()
    }

    /// Drop every alert for one workload. Returns how many were removed.
    pub fn purge(&mut self, workload_id: &str) -> usize {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.workload_id != workload_id);
        before - self.alerts.len()
    }

    pub fn append(&mut self, alert: Alert) {
        self.alerts.push(alert);
    }

    #[must_use]
    pub fn list(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn alert(workload: &str, at: DateTime<Utc>, message: &str) -> Alert {
        Alert {
            workload_id: workload.to_string(),
            timestamp: at,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_prune_respects_retention() {
        let now = Utc.with_ymd_and_hms(2025, 5, 11, 12, 0, 0).unwrap();
        let mut store = AlertStore::new();
        store.append(alert("web1", now - Duration::hours(49), "old"));
        store.append(alert("web1", now - Duration::hours(47), "recent"));
        store.append(alert("db", now, "fresh"));

        assert_eq!(store.prune(now), 1);
        let messages: Vec<_> = store.list().iter().map(|a| a.message.as_str()).collect();
        assert_eq!(messages, vec!["recent", "fresh"]);
    }

    #[test]
    fn test_purge_only_touches_one_workload() {
        let now = Utc::now();
        let mut store = AlertStore::new();
        store.append(alert("web1", now, "a"));
        store.append(alert("db", now, "b"));
        store.append(alert("web1", now, "c"));

        assert_eq!(store.purge("web1"), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].workload_id, "db");
        assert_eq!(store.purge("missing"), 0);
    }

    #[test]
    fn test_append_preserves_order_and_clear_empties() {
        let now = Utc::now();
        let mut store = AlertStore::new();
        for i in 0..3 {
            store.append(alert("web1", now, &i.to_string()));
        }
        let messages: Vec<_> = store.list().iter().map(|a| a.message.clone()).collect();
        assert_eq!(messages, vec!["0", "1", "2"]);

        store.clear();
        assert!(store.is_empty());
    }
}
