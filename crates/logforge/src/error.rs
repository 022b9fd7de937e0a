//! Error types for the detection engine.

use thiserror::Error;

/// Errors raised while loading or editing the YAML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for the expected layout
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Values outside their allowed range
    #[error("invalid config: {0}")]
    OutOfRange(String),

    /// Rejected email address
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

/// Failures inside a scan cycle.
///
/// Only [`EngineError::InventoryUnavailable`] is returned from
/// `run_cycle_once`; the other variants are logged where they occur and the
/// cycle carries on.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Inventory refresh failed; the cycle was skipped
    #[error("workload inventory unavailable: {0}")]
    InventoryUnavailable(String),

    /// Log window could not be retrieved for one workload
    #[error("log fetch failed for {workload}: {reason}")]
    LogFetchFailed { workload: String, reason: String },

    /// Configuration could not be loaded
    #[error("configuration unreadable: {0}")]
    ConfigUnreadable(#[from] ConfigError),

    /// Delivery collaborator reported a failure
    #[error("notification failed for {workload}: {reason}")]
    NotificationFailed { workload: String, reason: String },
}
