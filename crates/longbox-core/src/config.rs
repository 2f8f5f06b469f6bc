//! Configuration module for Longbox.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Longbox.
///
/// Every section falls back to its defaults when omitted from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub assets: AssetsConfig,
    pub logging: LoggingConfig,
}

/// Local snapshot settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON catalog snapshot.
    pub path: PathBuf,
    /// Milliseconds of quiet before a pending snapshot is written.
    pub debounce_ms: u64,
}

/// Synchronization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Sync backend: `remote` or `none` (local-only).
    pub backend: String,
    /// Seconds between periodic pulls.
    pub poll_interval_secs: u64,
    /// Path of the small sync bookkeeping file.
    pub metadata_path: PathBuf,
}

/// Remote record table settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the record service, e.g. `https://sync.example.com/v1`.
    pub base_url: String,
    /// Namespace holding the catalog records.
    pub zone: String,
    /// Bearer token sent with every request.
    pub api_token: Option<String>,
    /// Records requested per page.
    pub page_size: u32,
    /// Records per batch write.
    pub batch_size: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Cover image transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Longest edge, in pixels, of a transported image.
    pub max_edge_px: u32,
    /// Target ceiling for an encoded image, in bytes.
    pub max_bytes: u64,
    /// JPEG qualities tried in order, strictly descending within (0, 1].
    pub quality_ladder: Vec<f32>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/longbox/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("longbox")
            .join("config.yaml")
    }

    /// Serializes the configuration back to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }

    /// True when the remote backend is selected.
    pub fn remote_enabled(&self) -> bool {
        self.sync.backend == "remote"
    }
}

/// Directory holding local data files, `$XDG_DATA_HOME/longbox` on Linux.
fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("longbox")
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("catalog.json"),
            debounce_ms: 800,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backend: "none".into(),
            poll_interval_secs: 300,
            metadata_path: data_dir().join("sync-state.json"),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            zone: "catalog".into(),
            api_token: None,
            page_size: 200,
            batch_size: 100,
            timeout_secs: 30,
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            max_edge_px: 2000,
            max_bytes: 3 * 1024 * 1024,
            quality_ladder: vec![0.8, 0.7, 0.6, 0.5, 0.4],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"remote.page_size"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `sync.backend`.
const VALID_BACKENDS: &[&str] = &["remote", "none"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- store ---
        if self.store.path.as_os_str().is_empty() {
            errors.push(ValidationError::new("store.path", "must not be empty"));
        }
        if self.store.debounce_ms == 0 {
            errors.push(ValidationError::new(
                "store.debounce_ms",
                "must be greater than 0",
            ));
        }

        // --- sync ---
        if !VALID_BACKENDS.contains(&self.sync.backend.as_str()) {
            errors.push(ValidationError::new(
                "sync.backend",
                format!(
                    "invalid backend '{}', expected one of: {}",
                    self.sync.backend,
                    VALID_BACKENDS.join(", ")
                ),
            ));
        }
        if self.sync.poll_interval_secs == 0 {
            errors.push(ValidationError::new(
                "sync.poll_interval_secs",
                "must be greater than 0",
            ));
        }

        // --- remote ---
        if self.remote_enabled() {
            let url = self.remote.base_url.as_str();
            if url.is_empty() {
                errors.push(ValidationError::new(
                    "remote.base_url",
                    "required when sync.backend is 'remote'",
                ));
            } else if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ValidationError::new(
                    "remote.base_url",
                    format!("must be an http(s) URL, got '{url}'"),
                ));
            }
        }
        if self.remote.zone.is_empty() || self.remote.zone.contains('/') {
            errors.push(ValidationError::new(
                "remote.zone",
                "must be a non-empty name without '/'",
            ));
        }
        if self.remote.page_size == 0 {
            errors.push(ValidationError::new(
                "remote.page_size",
                "must be greater than 0",
            ));
        }
        if self.remote.batch_size == 0 {
            errors.push(ValidationError::new(
                "remote.batch_size",
                "must be greater than 0",
            ));
        }
        if self.remote.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "remote.timeout_secs",
                "must be greater than 0",
            ));
        }

        // --- assets ---
        if self.assets.max_edge_px == 0 {
            errors.push(ValidationError::new(
                "assets.max_edge_px",
                "must be greater than 0",
            ));
        }
        if self.assets.max_bytes == 0 {
            errors.push(ValidationError::new(
                "assets.max_bytes",
                "must be greater than 0",
            ));
        }
        let ladder = &self.assets.quality_ladder;
        if ladder.is_empty() {
            errors.push(ValidationError::new(
                "assets.quality_ladder",
                "must contain at least one quality",
            ));
        } else if ladder.iter().any(|q| !(*q > 0.0 && *q <= 1.0)) {
            errors.push(ValidationError::new(
                "assets.quality_ladder",
                "every quality must be in (0, 1]",
            ));
        } else if ladder.windows(2).any(|w| w[1] >= w[0]) {
            errors.push(ValidationError::new(
                "assets.quality_ladder",
                "qualities must be strictly descending",
            ));
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- store ---

    pub fn store_path(mut self, path: PathBuf) -> Self {
        self.config.store.path = path;
        self
    }

    pub fn store_debounce_ms(mut self, ms: u64) -> Self {
        self.config.store.debounce_ms = ms;
        self
    }

    // --- sync ---

    pub fn sync_backend(mut self, backend: impl Into<String>) -> Self {
        self.config.sync.backend = backend.into();
        self
    }

    pub fn sync_poll_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval_secs = seconds;
        self
    }

    pub fn sync_metadata_path(mut self, path: PathBuf) -> Self {
        self.config.sync.metadata_path = path;
        self
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn remote_zone(mut self, zone: impl Into<String>) -> Self {
        self.config.remote.zone = zone.into();
        self
    }

    pub fn remote_api_token(mut self, token: impl Into<String>) -> Self {
        self.config.remote.api_token = Some(token.into());
        self
    }

    pub fn remote_page_size(mut self, n: u32) -> Self {
        self.config.remote.page_size = n;
        self
    }

    pub fn remote_batch_size(mut self, n: usize) -> Self {
        self.config.remote.batch_size = n;
        self
    }

    pub fn remote_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.timeout_secs = seconds;
        self
    }

    // --- assets ---

    pub fn assets_max_edge_px(mut self, px: u32) -> Self {
        self.config.assets.max_edge_px = px;
        self
    }

    pub fn assets_max_bytes(mut self, bytes: u64) -> Self {
        self.config.assets.max_bytes = bytes;
        self
    }

    pub fn assets_quality_ladder(mut self, ladder: Vec<f32>) -> Self {
        self.config.assets.quality_ladder = ladder;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
