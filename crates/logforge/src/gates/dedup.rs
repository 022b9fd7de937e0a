//! Per-fingerprint suppression of repeated messages.
//!
//! A fingerprint that has been seen once suppresses every later match with
//! the same content until its entry is removed. Entries leave the gate in
//! three ways: TTL eviction during the prune phase (measured from the most
//! recent sighting), an opt-in purge when the owning workload restarts, or
//! an explicit clear.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone, PartialEq, Eq)]
struct DedupEntry {
    last_seen: DateTime<Utc>,
    /// Workload that first produced the fingerprint
    workload_id: String,
}

#[derive(Debug, Default, Clone)]
pub struct DedupGate {
    seen: HashMap<Fingerprint, DedupEntry>,
}

impl DedupGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True only for a fingerprint never seen before.
    ///
    /// Every call refreshes the fingerprint's last-seen instant.
    pub fn should_fire(
        &mut self,
        fingerprint: &Fingerprint,
        workload_id: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if let Some(entry) = self.seen.get_mut(fingerprint) {
            entry.last_seen = now;
            return false;
        }
        self.seen.insert(
            fingerprint.clone(),
            DedupEntry {
                last_seen: now,
                workload_id: workload_id.to_string(),
            },
        );
        true
    }

    #[must_use]
    pub fn last_seen(&self, fingerprint: &Fingerprint) -> Option<DateTime<Utc>> {
        self.seen.get(fingerprint).map(|e| e.last_seen)
    }

    /// Drop entries not seen since `cutoff`. Returns how many were removed.
    pub fn evict_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, e| e.last_seen > cutoff);
        before - self.seen.len()
    }

    /// Drop entries first produced by one workload.
    pub fn purge_workload(&mut self, workload_id: &str) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, e| e.workload_id != workload_id);
        before - self.seen.len()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
