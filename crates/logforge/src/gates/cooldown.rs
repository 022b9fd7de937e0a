//! Minimum spacing between alert-producing scans of one workload.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct CooldownGate {
    last_alert: HashMap<String, DateTime<Utc>>,
}

impl CooldownGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// False while the workload's last alert is younger than `cooldown_secs`.
    #[must_use]
    pub fn allow(&self, workload_id: &str, now: DateTime<Utc>, cooldown_secs: u64) -> bool {
        let cooldown = i64::try_from(cooldown_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        self.last_alert
            .get(workload_id)
            .is_none_or(|last| now - *last >= cooldown)
    }

    /// Start the cooldown for a workload.
    pub fn record(&mut self, workload_id: &str, now: DateTime<Utc>) {
        self.last_alert.insert(workload_id.to_string(), now);
    }
}
