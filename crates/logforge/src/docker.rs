//! Docker-backed inventory and log source.
//!
//! Both adapters shell out to the `docker` CLI with `tokio::process`, so they
//! work against whatever daemon the CLI is configured for (`DOCKER_HOST`,
//! contexts, rootless sockets).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::workload::{LogSource, WorkloadInventory, WorkloadSnapshot};

const DOCKER_BIN: &str = "docker";

/// Subset of `docker inspect` output.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectEntry {
    name: String,
    state: InspectState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    running: bool,
    started_at: DateTime<Utc>,
}

/// Parse the JSON array printed by `docker inspect`.
///
/// Container names come back with a leading `/`, which is stripped.
pub fn parse_inspect(json: &str) -> Result<Vec<WorkloadSnapshot>> {
    let entries: Vec<InspectEntry> =
        serde_json::from_str(json).context("Failed to parse docker inspect output")?;

    Ok(entries
        .into_iter()
        .map(|e| WorkloadSnapshot {
            workload_id: e.name.trim_start_matches('/').to_string(),
            start_time: e.state.started_at,
            running: e.state.running,
        })
        .collect())
}

async fn docker(args: &[&str]) -> Result<std::process::Output> {
    let output = Command::new(DOCKER_BIN)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("Failed to execute docker {}", args.first().unwrap_or(&"")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("docker {} failed: {}", args.join(" "), stderr.trim());
    }
    Ok(output)
}

/// Lists every container known to the daemon, running or not.
#[derive(Debug, Default, Clone)]
pub struct DockerInventory;

impl DockerInventory {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkloadInventory for DockerInventory {
    async fn snapshot(&self) -> Result<Vec<WorkloadSnapshot>> {
        let ids = docker(&["ps", "-a", "-q", "--no-trunc"]).await?;
        let ids = String::from_utf8_lossy(&ids.stdout);
        let ids: Vec<&str> = ids.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

        if ids.is_empty() {
            debug!("No containers found");
            return Ok(Vec::new());
        }

        let mut args = vec!["inspect"];
        args.extend(ids.iter().copied());
        let output = docker(&args).await?;
        let workloads = parse_inspect(&String::from_utf8_lossy(&output.stdout))?;

        debug!(count = workloads.len(), "Docker inventory refreshed");
        Ok(workloads)
    }
}

/// Reads container logs with `docker logs`.
///
/// stdout lines come before stderr lines, so interleaving between the two
/// streams is not preserved.
#[derive(Debug, Default, Clone)]
pub struct DockerLogSource;

impl DockerLogSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LogSource for DockerLogSource {
    async fn fetch_recent_lines(&self, workload_id: &str, since_secs: u64) -> Result<Vec<String>> {
        let since = format!("{since_secs}s");
        let mut args = vec!["logs"];
        if since_secs != u64::MAX {
            args.extend(["--since", since.as_str()]);
        }
        args.push(workload_id);

        let output = docker(&args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        Ok(stdout
            .lines()
            .chain(stderr.lines())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSPECT: &str = r#"[
        {
            "Id": "4f2a",
            "Name": "/web1",
            "State": {
                "Status": "running",
                "Running": true,
                "StartedAt": "2025-05-09T00:16:16.123456789Z"
            }
        },
        {
            "Id": "9c1b",
            "Name": "/db",
            "State": {
                "Status": "exited",
                "Running": false,
                "StartedAt": "2025-05-08T22:00:00Z"
            }
        }
    ]"#;

    #[test]
    fn test_parse_inspect() {
        let workloads = parse_inspect(INSPECT).unwrap();
        assert_eq!(workloads.len(), 2);
        assert_eq!(workloads[0].workload_id, "web1");
        assert!(workloads[0].running);
        assert_eq!(
            workloads[0].start_time.to_rfc3339(),
            "2025-05-09T00:16:16.123456789+00:00"
        );
        assert_eq!(workloads[1].workload_id, "db");
        assert!(!workloads[1].running);
    }

    #[test]
    fn test_parse_inspect_rejects_garbage() {
        assert!(parse_inspect("not json").is_err());
    }
}
