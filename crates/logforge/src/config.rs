//! YAML configuration, re-read at the start of every cycle.
//!
//! The file keeps the layout operators already use:
//!
//! ```yaml
//! alert:
//!   keywords: ["ERROR", "Traceback"]
//!   cooldown_seconds: 300
//! email:
//!   enabled: true
//!   alert_interval_hours: 1
//!   sender: alerts@example.com
//!   app_password: "..."
//!   recipients:
//!     web1: ["web-team@example.com"]
//!     default: ["ops@example.com"]
//! engine:
//!   scan_interval_secs: 30
//!   log_window_secs: 180
//!   dedup_ttl_hours: 48      # null keeps dedup entries forever
//!   clear_dedup_on_restart: false
//! ```
//!
//! Every field is optional; missing fields take the defaults below.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::ConfigError;

/// Default cooldown between alert-producing scans of one workload.
pub const DEFAULT_COOLDOWN_SECS: u64 = 300;
/// Default spacing between notifications for one workload.
pub const DEFAULT_INTERVAL_HOURS: f64 = 1.0;
/// Recipient list used when a workload has none of its own.
pub const DEFAULT_RECIPIENTS_KEY: &str = "default";

/// Full configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub alert: AlertSection,
    pub email: EmailSection,
    pub engine: EngineSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSection {
    pub keywords: Vec<String>,
    pub cooldown_seconds: u64,
}

impl Default for AlertSection {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            cooldown_seconds: DEFAULT_COOLDOWN_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSection {
    pub enabled: bool,
    pub alert_interval_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_password: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Workload id (or `default`) to email addresses
    pub recipients: BTreeMap<String, Vec<String>>,
}

impl Default for EmailSection {
    fn default() -> Self {
        Self {
            enabled: false,
            alert_interval_hours: DEFAULT_INTERVAL_HOURS,
            sender: None,
            app_password: None,
            smtp_host: notify::channels::email::DEFAULT_SMTP_HOST.to_string(),
            smtp_port: notify::channels::email::DEFAULT_SMTP_PORT,
            recipients: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Period of the background scan
    pub scan_interval_secs: u64,
    /// Width of the log window fetched per workload
    pub log_window_secs: u64,
    /// Upper bound on a single workload's log fetch
    pub fetch_timeout_secs: u64,
    /// How long alerts stay listed
    pub retention_hours: i64,
    /// Dedup entries unseen for this long are evicted; `None` disables eviction
    pub dedup_ttl_hours: Option<f64>,
    /// Forget a workload's dedup fingerprints when it restarts
    pub clear_dedup_on_restart: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            scan_interval_secs: 30,
            log_window_secs: 180,
            fetch_timeout_secs: 10,
            retention_hours: crate::store::DEFAULT_RETENTION_HOURS,
            dedup_ttl_hours: Some(48.0),
            clear_dedup_on_restart: false,
        }
    }
}

impl Config {
    /// Configured keywords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.alert.keywords
    }

    #[must_use]
    pub fn notifications_enabled(&self) -> bool {
        self.email.enabled
    }

    /// Recipients for a workload, falling back to the `default` list.
    #[must_use]
    pub fn recipients_for(&self, workload_id: &str) -> Vec<String> {
        self.email
            .recipients
            .get(workload_id)
            .or_else(|| self.email.recipients.get(DEFAULT_RECIPIENTS_KEY))
            .cloned()
            .unwrap_or_default()
    }

    /// Reject windows that would empty the alert store or dedup state on
    /// every cycle.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.retention_hours <= 0 {
            return Err(ConfigError::OutOfRange(format!(
                "engine.retention_hours must be positive, got {}",
                self.engine.retention_hours
            )));
        }
        if let Some(ttl) = self.engine.dedup_ttl_hours {
            if !(ttl.is_finite() && ttl > 0.0) {
                return Err(ConfigError::OutOfRange(format!(
                    "engine.dedup_ttl_hours must be positive or null, got {ttl}"
                )));
            }
        }
        Ok(())
    }

    /// SMTP settings, present once a sender is configured.
    #[must_use]
    pub fn email_settings(&self) -> Option<notify::EmailSettings> {
        let sender = self.email.sender.clone()?;
        Some(notify::EmailSettings {
            smtp_host: self.email.smtp_host.clone(),
            smtp_port: self.email.smtp_port,
            sender,
            password: self.email.app_password.clone(),
        })
    }
}

/// Anything that can produce the current configuration.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self) -> Result<Config, ConfigError>;
}

/// Result of a keyword edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordChange {
    /// Keywords that were added or removed
    pub applied: Vec<String>,
    /// Keywords that were already present (add) or absent (remove)
    pub unchanged: Vec<String>,
}

/// Configuration stored in a YAML file.
///
/// Reads go straight to disk so edits made by hand are picked up on the next
/// cycle. Edits through this type are serialized and replace the file
/// atomically.
#[derive(Debug)]
pub struct FileConfigSource {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileConfigSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Config, ConfigError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        parse_config(&text)
    }

    /// Read for editing; a missing file starts from defaults.
    async fn read_for_edit(&self) -> Result<Config, ConfigError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => parse_config(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    async fn write(&self, config: &Config) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(config)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, yaml.as_bytes()))
            .await
            .map_err(std::io::Error::other)
            .and_then(|r| r)
            .map_err(|source| self.io_error(source))?;

        debug!(path = %self.path.display(), "Config written");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Add comma-separated keywords, skipping ones already present.
    pub async fn add_keywords(&self, raw: &str) -> Result<KeywordChange, ConfigError> {
        let _guard = self.write_lock.lock().await;
        let mut config = self.read_for_edit().await?;
        let mut change = KeywordChange::default();

        for keyword in parse_keyword_list(raw) {
            if config.alert.keywords.contains(&keyword) {
                change.unchanged.push(keyword);
            } else {
                config.alert.keywords.push(keyword.clone());
                change.applied.push(keyword);
            }
        }

        if !change.applied.is_empty() {
            self.write(&config).await?;
            info!(added = ?change.applied, "Keywords added");
        }
        Ok(change)
    }

    /// Remove comma-separated keywords.
    pub async fn remove_keywords(&self, raw: &str) -> Result<KeywordChange, ConfigError> {
        let _guard = self.write_lock.lock().await;
        let mut config = self.read_for_edit().await?;
        let mut change = KeywordChange::default();

        for keyword in parse_keyword_list(raw) {
            if config.alert.keywords.contains(&keyword) {
                change.applied.push(keyword);
            } else {
                change.unchanged.push(keyword);
            }
        }
        config
            .alert
            .keywords
            .retain(|k| !change.applied.contains(k));

        if !change.applied.is_empty() {
            self.write(&config).await?;
            info!(removed = ?change.applied, "Keywords removed");
        }
        Ok(change)
    }

    /// Replace the keyword list.
    pub async fn replace_keywords(&self, raw: &str) -> Result<Vec<String>, ConfigError> {
        let _guard = self.write_lock.lock().await;
        let mut config = self.read_for_edit().await?;
        config.alert.keywords = parse_keyword_list(raw);
        self.write(&config).await?;
        info!(keywords = ?config.alert.keywords, "Keywords replaced");
        Ok(config.alert.keywords)
    }

    /// Add a recipient for a workload. Returns false if already present.
    pub async fn add_recipient(&self, workload_id: &str, email: &str) -> Result<bool, ConfigError> {
        validate_email(email)?;
        let _guard = self.write_lock.lock().await;
        let mut config = self.read_for_edit().await?;

        let list = config
            .email
            .recipients
            .entry(workload_id.to_string())
            .or_default();
        if list.iter().any(|e| e == email) {
            return Ok(false);
        }
        list.push(email.to_string());

        self.write(&config).await?;
        info!(workload = workload_id, email, "Recipient added");
        Ok(true)
    }

    /// Remove a recipient. Returns false if it was not configured.
    ///
    /// A workload whose list becomes empty is dropped so it falls back to
    /// the default recipients again.
    pub async fn remove_recipient(
        &self,
        workload_id: &str,
        email: &str,
    ) -> Result<bool, ConfigError> {
        let _guard = self.write_lock.lock().await;
        let mut config = self.read_for_edit().await?;

        let Some(list) = config.email.recipients.get_mut(workload_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|e| e != email);
        if list.len() == before {
            return Ok(false);
        }
        if list.is_empty() {
            config.email.recipients.remove(workload_id);
        }

        self.write(&config).await?;
        info!(workload = workload_id, email, "Recipient removed");
        Ok(true)
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self) -> Result<Config, ConfigError> {
        self.read().await
    }
}

fn parse_config(text: &str) -> Result<Config, ConfigError> {
    if text.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Split a comma-separated keyword string, dropping blanks and duplicates.
#[must_use]
pub fn parse_keyword_list(raw: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for keyword in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !keywords.iter().any(|k| k == keyword) {
            keywords.push(keyword.to_string());
        }
    }
    keywords
}

/// Reject addresses the SMTP channel could not deliver to.
fn validate_email(email: &str) -> Result<(), ConfigError> {
    email
        .parse::<lettre::Address>()
        .map(drop)
        .map_err(|_| ConfigError::InvalidEmail(email.to_string()))
}
