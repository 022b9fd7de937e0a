//! Restart detection from workload start times.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Last observed start time per workload.
#[derive(Debug, Default, Clone)]
pub struct RestartDetector {
    started_at: HashMap<String, DateTime<Utc>>,
}

impl RestartDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `start_time` and report whether it changed since the last call.
    ///
    /// The first observation of a workload is never a restart.
    pub fn check(&mut self, workload_id: &str, start_time: DateTime<Utc>) -> bool {
        match self.started_at.insert(workload_id.to_string(), start_time) {
            Some(previous) => previous != start_time,
            None => false,
        }
    }

    /// Last recorded start time.
    #[must_use]
    pub fn last_start(&self, workload_id: &str) -> Option<DateTime<Utc>> {
        self.started_at.get(workload_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_first_observation_is_not_a_restart() {
        let mut detector = RestartDetector::new();
        let started = Utc::now();
        assert!(!detector.check("web1", started));
        assert!(!detector.check("web1", started));
        assert_eq!(detector.last_start("web1"), Some(started));
    }

    #[test]
    fn test_changed_start_time_is_a_restart_once() {
        let mut detector = RestartDetector::new();
        let started = Utc::now();
        detector.check("web1", started);

        let restarted = started + Duration::minutes(5);
        assert!(detector.check("web1", restarted));
        assert!(!detector.check("web1", restarted));
        assert!(!detector.check("db", started));
    }
}
