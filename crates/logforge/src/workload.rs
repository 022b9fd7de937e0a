//! Collaborator interfaces for workload inventory and log retrieval.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One monitored workload as seen at the start of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSnapshot {
    pub workload_id: String,
    pub start_time: DateTime<Utc>,
    pub running: bool,
}

/// Lists the workloads to monitor.
#[async_trait]
pub trait WorkloadInventory: Send + Sync {
    /// Current workloads, in the order they should be scanned.
    async fn snapshot(&self) -> Result<Vec<WorkloadSnapshot>>;
}

/// Retrieves log text for a workload.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Lines emitted during the last `since_secs` seconds, oldest first.
    async fn fetch_recent_lines(&self, workload_id: &str, since_secs: u64) -> Result<Vec<String>>;

    /// The workload's whole retained log.
    async fn fetch_all_lines(&self, workload_id: &str) -> Result<Vec<String>> {
        self.fetch_recent_lines(workload_id, u64::MAX).await
    }
}
