//! Scan orchestrator.
//!
//! One [`Engine`] owns the alert store and every gate. A cycle runs:
//!
//! 1. prune the alert store (and expire old dedup entries)
//! 2. refresh the workload inventory
//! 3. detect restarts and purge the restarted workloads' alerts
//! 4. for every workload not in cooldown, fetch its recent log window
//! 5. take the first keyword match, fingerprint it, and pass it through the
//!    dedup gate
//! 6. record the alert and, if the throttle allows, notify
//!
//! Cycles are serialized. Readers (`list_alerts`) and admin operations
//! (`clear_alerts`, `clear_dedup`) only take the state lock briefly, so they
//! never wait for a slow log fetch.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, ConfigSource};
use crate::error::EngineError;
use crate::fingerprint::Fingerprint;
use crate::gates::{throttle, CooldownGate, DedupGate, NotificationThrottle, RestartDetector};
use crate::matcher;
use crate::normalize::Normalizer;
use crate::notifier::{alert_body, alert_subject, AlertNotifier};
use crate::store::{Alert, AlertStore};
use crate::workload::{LogSource, WorkloadInventory, WorkloadSnapshot};

/// Mutable engine state. Only touched under [`Engine::state`].
#[derive(Debug)]
struct EngineState {
    store: AlertStore,
    restarts: RestartDetector,
    cooldown: CooldownGate,
    dedup: DedupGate,
    throttle: NotificationThrottle,
    last_good_config: Option<Config>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            store: AlertStore::new(),
            restarts: RestartDetector::new(),
            cooldown: CooldownGate::new(),
            dedup: DedupGate::new(),
            throttle: NotificationThrottle::new(),
            last_good_config: None,
        }
    }
}

/// What one cycle did, per workload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub started_at: Option<DateTime<Utc>>,
    pub workloads: usize,
    pub pruned: usize,
    pub dedup_evicted: usize,
    pub restarted: Vec<String>,
    pub cooling_down: Vec<String>,
    pub fetch_failed: Vec<String>,
    /// Workloads that produced a new alert
    pub alerted: Vec<String>,
    /// Workloads whose match was a known fingerprint
    pub suppressed: Vec<String>,
    pub throttled: Vec<String>,
    pub notified: Vec<String>,
    pub notify_failed: Vec<String>,
}

/// Detection and deduplication engine.
pub struct Engine {
    inventory: Arc<dyn WorkloadInventory>,
    logs: Arc<dyn LogSource>,
    config: Arc<dyn ConfigSource>,
    notifier: Arc<dyn AlertNotifier>,
    clock: Arc<dyn Clock>,
    normalizer: Normalizer,
    state: Mutex<EngineState>,
    cycle_lock: Mutex<()>,
}

impl Engine {
    /// Create an engine on the system clock with the built-in timestamp patterns.
    pub fn new(
        inventory: Arc<dyn WorkloadInventory>,
        logs: Arc<dyn LogSource>,
        config: Arc<dyn ConfigSource>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        Self {
            inventory,
            logs,
            config,
            notifier,
            clock: Arc::new(SystemClock),
            normalizer: Normalizer::new(),
            state: Mutex::new(EngineState::default()),
            cycle_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Current configuration, falling back to the last one that loaded and
    /// passed validation.
    ///
    /// With no good configuration seen yet the defaults apply (cooldown
    /// 300 s, interval 1 h, no keywords).
    pub async fn current_config(&self) -> Config {
        let loaded = self
            .config
            .load()
            .await
            .and_then(|config| config.validate().map(|()| config));
        match loaded {
            Ok(config) => {
                self.state.lock().await.last_good_config = Some(config.clone());
                config
            }
            Err(e) => {
                let err = EngineError::ConfigUnreadable(e);
                let fallback = self.state.lock().await.last_good_config.clone();
                warn!(
                    error = %err,
                    last_good = fallback.is_some(),
                    "Using fallback configuration"
                );
                fallback.unwrap_or_default()
            }
        }
    }

    /// Run one full scan cycle.
    ///
    /// Only an unreachable inventory is reported as an error; every other
    /// failure is logged and the cycle carries on.
    pub async fn run_cycle_once(&self) -> Result<CycleReport, EngineError> {
        let _cycle = self.cycle_lock.lock().await;
        let config = self.current_config().await;
        let started_at = self.clock.now();
        let mut report = CycleReport {
            started_at: Some(started_at),
            ..CycleReport::default()
        };

        // Prune
        {
            let mut state = self.state.lock().await;
            let retention =
                Duration::try_hours(config.engine.retention_hours).unwrap_or(Duration::MAX);
            state.store.set_retention(retention);
            report.pruned = state.store.prune(started_at);

            let dedup_cutoff = config
                .engine
                .dedup_ttl_hours
                .and_then(|ttl| started_at.checked_sub_signed(throttle::interval(ttl)));
            if let Some(cutoff) = dedup_cutoff {
                report.dedup_evicted = state.dedup.evict_older_than(cutoff);
            }
        }
        if report.pruned > 0 || report.dedup_evicted > 0 {
            debug!(
                pruned = report.pruned,
                dedup_evicted = report.dedup_evicted,
                "Expired alert history"
            );
        }

        let workloads = self.inventory.snapshot().await.map_err(|e| {
            let err = EngineError::InventoryUnavailable(format!("{e:#}"));
            warn!(error = %err, "Skipping scan cycle");
            err
        })?;
        report.workloads = workloads.len();

        let eligible = self
            .detect_restarts_and_filter(&workloads, &config, started_at, &mut report)
            .await;

        let window = config.engine.log_window_secs;
        let timeout = std::time::Duration::from_secs(config.engine.fetch_timeout_secs);
        let fetches = eligible.iter().map(|workload| async move {
            let id = workload.workload_id.as_str();
            let lines =
                tokio::time::timeout(timeout, self.logs.fetch_recent_lines(id, window)).await;
            (id, lines)
        });

        for (id, fetched) in join_all(fetches).await {
            let lines = match fetched {
                Ok(Ok(lines)) => lines,
                Ok(Err(e)) => {
                    fetch_failed(id, format!("{e:#}"), &mut report);
                    continue;
                }
                Err(_) => {
                    fetch_failed(
                        id,
                        format!("timed out after {}s", timeout.as_secs()),
                        &mut report,
                    );
                    continue;
                }
            };

            let Some(line) = matcher::first_match(&lines, config.keywords()) else {
                continue;
            };
            self.evaluate_match(id, line.trim(), &config, &mut report)
                .await;
        }

        info!(
            workloads = report.workloads,
            alerted = report.alerted.len(),
            suppressed = report.suppressed.len(),
            notified = report.notified.len(),
            "Scan cycle complete"
        );
        Ok(report)
    }

    async fn detect_restarts_and_filter<'a>(
        &self,
        workloads: &'a [WorkloadSnapshot],
        config: &Config,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Vec<&'a WorkloadSnapshot> {
        let mut state = self.state.lock().await;

        for workload in workloads {
            let id = workload.workload_id.as_str();
            if !state.restarts.check(id, workload.start_time) {
                continue;
            }
            let purged = state.store.purge(id);
            let forgotten = if config.engine.clear_dedup_on_restart {
                state.dedup.purge_workload(id)
            } else {
                0
            };
            info!(
                workload = id,
                started_at = %workload.start_time,
                purged,
                forgotten,
                "Workload restarted, alert history cleared"
            );
            report.restarted.push(id.to_string());
        }

        workloads
            .iter()
            .filter(|w| {
                let allowed =
                    state
                        .cooldown
                        .allow(&w.workload_id, now, config.alert.cooldown_seconds);
                if !allowed {
                    debug!(workload = %w.workload_id, "In cooldown, not scanning");
                    report.cooling_down.push(w.workload_id.clone());
                }
                allowed
            })
            .collect()
    }

    async fn evaluate_match(
        &self,
        id: &str,
        line: &str,
        config: &Config,
        report: &mut CycleReport,
    ) {
        let fingerprint = Fingerprint::of(&self.normalizer.normalize(line));

        // Gate reads and their updates happen under one lock acquisition.
        let (detected_at, delivery) = {
            let mut state = self.state.lock().await;
            let now = self.clock.now();

            if !state.dedup.should_fire(&fingerprint, id, now) {
                debug!(workload = id, fingerprint = %fingerprint, "Duplicate message suppressed");
                report.suppressed.push(id.to_string());
                return;
            }

            state.store.append(Alert {
                workload_id: id.to_string(),
                timestamp: now,
                message: line.to_string(),
            });
            state.cooldown.record(id, now);

            let recipients = config.recipients_for(id);
            let allowed = state.throttle.allow_send(
                id,
                now,
                config.email.alert_interval_hours,
                &recipients,
            );
            (now, allowed.then_some(recipients))
        };

        info!(workload = id, fingerprint = %fingerprint, message = line, "Alert recorded");
        report.alerted.push(id.to_string());

        let Some(recipients) = delivery else {
            debug!(workload = id, "Notification throttled");
            report.throttled.push(id.to_string());
            return;
        };
        if !config.notifications_enabled() {
            debug!(workload = id, "Notifications disabled, not sending");
            return;
        }

        let subject = alert_subject(id);
        let body = alert_body(detected_at, line);
        match self
            .notifier
            .notify(id, &subject, &body, &recipients)
            .await
        {
            Ok(()) => {
                info!(workload = id, recipients = recipients.len(), "Alert notification sent");
                report.notified.push(id.to_string());
            }
            Err(e) => {
                warn!(error = %e, "Alert recorded but notification failed");
                report.notify_failed.push(id.to_string());
            }
        }
    }

    /// Alerts currently held, in detection order.
    pub async fn list_alerts(&self) -> Vec<Alert> {
        self.state.lock().await.store.list().to_vec()
    }

    /// Empty the alert store. Dedup, cooldown and throttle state are kept.
    pub async fn clear_alerts(&self) -> usize {
        let mut state = self.state.lock().await;
        let cleared = state.store.len();
        state.store.clear();
        info!(cleared, "Alerts cleared");
        cleared
    }

    /// Forget every fingerprint so known messages can alert again.
    pub async fn clear_dedup(&self) -> usize {
        let mut state = self.state.lock().await;
        let cleared = state.dedup.len();
        state.dedup.clear();
        info!(cleared, "Dedup state cleared");
        cleared
    }

    /// Fingerprints currently suppressing matches.
    pub async fn dedup_len(&self) -> usize {
        self.state.lock().await.dedup.len()
    }

    /// Current workload inventory.
    pub async fn workloads(&self) -> Result<Vec<WorkloadSnapshot>, EngineError> {
        self.inventory
            .snapshot()
            .await
            .map_err(|e| EngineError::InventoryUnavailable(format!("{e:#}")))
    }

    /// Every line of a workload's full log that matches a configured keyword.
    ///
    /// Returns `None` when the workload is not in the inventory.
    pub async fn filtered_logs(&self, workload_id: &str) -> Result<Option<Vec<String>>, EngineError> {
        let known = self
            .workloads()
            .await?
            .iter()
            .any(|w| w.workload_id == workload_id);
        if !known {
            return Ok(None);
        }

        let config = self.current_config().await;
        let lines = self
            .logs
            .fetch_all_lines(workload_id)
            .await
            .map_err(|e| EngineError::LogFetchFailed {
                workload: workload_id.to_string(),
                reason: format!("{e:#}"),
            })?;

        Ok(Some(
            matcher::filter_lines(&lines, config.keywords())
                .into_iter()
                .map(str::to_string)
                .collect(),
        ))
    }
}

fn fetch_failed(id: &str, reason: String, report: &mut CycleReport) {
    let err = EngineError::LogFetchFailed {
        workload: id.to_string(),
        reason,
    };
    warn!(error = %err, "No lines this cycle");
    report.fetch_failed.push(id.to_string());
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}
