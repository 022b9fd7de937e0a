//! LogForge alert detection and deduplication engine.
//!
//! Watches the recent log output of a set of workloads, turns keyword
//! matches into alerts, and notifies operators without flooding them:
//!
//! - [`normalize`] strips leading timestamps so repeated messages compare equal
//! - [`fingerprint`] hashes the normalized text into the dedup key
//! - [`gates`] holds the restart detector and the cooldown, dedup and
//!   notification-throttle gates
//! - [`store`] keeps fired alerts for a bounded time
//! - [`engine`] drives one scan cycle over all of the above
//!
//! Workload inventory, log retrieval, configuration and delivery are
//! collaborators behind traits ([`WorkloadInventory`], [`LogSource`],
//! [`ConfigSource`], [`AlertNotifier`]). Docker-backed implementations live
//! in [`docker`]; email and Slack delivery come from the `notify` crate.

pub mod clock;
pub mod config;
pub mod docker;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod gates;
pub mod matcher;
pub mod normalize;
pub mod notifier;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod workload;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigSource, FileConfigSource};
pub use engine::{CycleReport, Engine};
pub use error::{ConfigError, EngineError};
pub use fingerprint::Fingerprint;
pub use normalize::{Normalizer, TimestampPattern};
pub use notifier::AlertNotifier;
pub use scheduler::Scheduler;
pub use store::{Alert, AlertStore};
pub use workload::{LogSource, WorkloadInventory, WorkloadSnapshot};
