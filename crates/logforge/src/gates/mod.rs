//! Per-cycle gates deciding whether a workload is scanned, whether a match
//! becomes an alert, and whether a notification goes out.
//!
//! Each gate is plain state plus a comparison; the engine owns them and
//! calls them under its state lock.

pub mod cooldown;
pub mod dedup;
pub mod restart;
pub mod throttle;

pub use cooldown::CooldownGate;
pub use dedup::DedupGate;
pub use restart::RestartDetector;
pub use throttle::NotificationThrottle;
