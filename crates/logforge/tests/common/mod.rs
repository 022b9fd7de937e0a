//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use logforge::{
    AlertNotifier, Config, ConfigError, ConfigSource, Engine, EngineError, LogSource, ManualClock,
    WorkloadInventory, WorkloadSnapshot,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 9, 0, 16, 20).unwrap()
}

/// keywords=["ERROR"], cooldown 300 s, interval 1 h, notifications on.
pub fn base_config() -> Config {
    let mut config = Config::default();
    config.alert.keywords = vec!["ERROR".to_string()];
    config.alert.cooldown_seconds = 300;
    config.email.enabled = true;
    config.email.alert_interval_hours = 1.0;
    config
        .email
        .recipients
        .insert("default".to_string(), vec!["ops@example.com".to_string()]);
    config
}

#[derive(Default)]
pub struct FakeInventory {
    workloads: Mutex<Vec<WorkloadSnapshot>>,
    failing: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeInventory {
    pub fn set(&self, id: &str, start_time: DateTime<Utc>) {
        let mut workloads = self.workloads.lock().unwrap();
        let snapshot = WorkloadSnapshot {
            workload_id: id.to_string(),
            start_time,
            running: true,
        };
        match workloads.iter_mut().find(|w| w.workload_id == id) {
            Some(existing) => *existing = snapshot,
            None => workloads.push(snapshot),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorkloadInventory for FakeInventory {
    async fn snapshot(&self) -> Result<Vec<WorkloadSnapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("docker daemon unreachable");
        }
        Ok(self.workloads.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct FakeLogs {
    lines: Mutex<HashMap<String, Vec<String>>>,
    history: Mutex<HashMap<String, Vec<String>>>,
    failing: Mutex<HashSet<String>>,
    slow: Mutex<HashSet<String>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl FakeLogs {
    /// Lines returned for the recent window.
    pub fn set_lines(&self, id: &str, lines: &[&str]) {
        self.lines.lock().unwrap().insert(
            id.to_string(),
            lines.iter().map(ToString::to_string).collect(),
        );
    }

    /// Lines returned for the full log.
    pub fn set_history(&self, id: &str, lines: &[&str]) {
        self.history.lock().unwrap().insert(
            id.to_string(),
            lines.iter().map(ToString::to_string).collect(),
        );
    }

    pub fn set_failing(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn set_slow(&self, id: &str) {
        self.slow.lock().unwrap().insert(id.to_string());
    }

    pub fn fetch_count(&self, id: &str) -> usize {
        self.fetches.lock().unwrap().get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl LogSource for FakeLogs {
    async fn fetch_recent_lines(&self, workload_id: &str, _since_secs: u64) -> Result<Vec<String>> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(workload_id.to_string())
            .or_default() += 1;

        let slow = self.slow.lock().unwrap().contains(workload_id);
        if slow {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing.lock().unwrap().contains(workload_id) {
            bail!("no such container: {workload_id}");
        }
        Ok(self
            .lines
            .lock()
            .unwrap()
            .get(workload_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_all_lines(&self, workload_id: &str) -> Result<Vec<String>> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(workload_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Config held in memory; `None` simulates an unreadable file.
pub struct FakeConfig {
    config: Mutex<Option<Config>>,
}

impl FakeConfig {
    pub fn new(config: Option<Config>) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    pub fn set(&self, config: Option<Config>) {
        *self.config.lock().unwrap() = config;
    }

    pub fn update(&self, f: impl FnOnce(&mut Config)) {
        if let Some(config) = self.config.lock().unwrap().as_mut() {
            f(config);
        }
    }
}

#[async_trait]
impl ConfigSource for FakeConfig {
    async fn load(&self) -> Result<Config, ConfigError> {
        self.config
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ConfigError::Io {
                path: "config.yml".to_string(),
                source: std::io::Error::other("unreadable"),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub workload_id: String,
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn notify(
        &self,
        workload_id: &str,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> Result<(), EngineError> {
        self.sent.lock().unwrap().push(SentNotification {
            workload_id: workload_id.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            recipients: recipients.to_vec(),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::NotificationFailed {
                workload: workload_id.to_string(),
                reason: "smtp: connection refused".to_string(),
            });
        }
        Ok(())
    }
}

pub struct Harness {
    pub engine: Arc<Engine>,
    pub clock: Arc<ManualClock>,
    pub inventory: Arc<FakeInventory>,
    pub logs: Arc<FakeLogs>,
    pub config: Arc<FakeConfig>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(config: Option<Config>) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let inventory = Arc::new(FakeInventory::default());
        let logs = Arc::new(FakeLogs::default());
        let config = Arc::new(FakeConfig::new(config));
        let notifier = Arc::new(RecordingNotifier::default());

        let engine = Engine::new(
            inventory.clone(),
            logs.clone(),
            config.clone(),
            notifier.clone(),
        )
        .with_clock(clock.clone());

        Self {
            engine: Arc::new(engine),
            clock,
            inventory,
            logs,
            config,
            notifier,
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance(chrono::Duration::seconds(secs));
    }

    pub fn advance_hours(&self, hours: i64) {
        self.clock.advance(chrono::Duration::hours(hours));
    }
}
