//! Configuration for keymon.

use crate::core::{LoopSettings, DEFAULT_KEYCODE_LIMIT, DEFAULT_MOTION_DEBOUNCE_MS, DEFAULT_POLL_CEILING_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the collection endpoint
    pub remote_endpoint: String,

    /// Length of each reporting window in milliseconds
    pub report_interval_ms: u64,

    /// Input devices to read, in order; empty means auto-discover
    pub device_paths: Vec<PathBuf>,

    /// Verbose logging
    pub debug: bool,

    /// Key codes below this (and above zero) are counted
    pub keycode_limit: u16,

    /// Minimum spacing between counted pointer motions
    pub motion_debounce_ms: u64,

    /// Longest single wait in the poll loop
    pub poll_ceiling_ms: u64,

    /// Local activity log
    pub sink_path: PathBuf,

    /// Also write the mouse count to the local activity log
    pub sink_include_mouse: bool,

    /// Timeout for each report request
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_endpoint: "http://127.0.0.1:5001".to_string(),
            report_interval_ms: 30_000,
            device_paths: Vec::new(),
            debug: false,
            keycode_limit: DEFAULT_KEYCODE_LIMIT,
            motion_debounce_ms: DEFAULT_MOTION_DEBOUNCE_MS,
            poll_ceiling_ms: DEFAULT_POLL_CEILING_MS,
            sink_path: Self::data_dir().join("keyboard_activity.dat"),
            sink_include_mouse: false,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`. A missing file yields the defaults;
    /// an unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keymon")
            .join("config.json")
    }

    /// Directory for the activity log and stats.
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keymon")
    }

    /// Where cumulative statistics are kept.
    pub fn stats_path(&self) -> PathBuf {
        match self.sink_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join("stats.json"),
            _ => Self::data_dir().join("stats.json"),
        }
    }

    /// Reject values the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "report interval must be greater than zero".to_string(),
            ));
        }
        if self.poll_ceiling_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll ceiling must be greater than zero".to_string(),
            ));
        }
        if self.keycode_limit == 0 {
            return Err(ConfigError::Invalid(
                "keycode limit must be greater than zero".to_string(),
            ));
        }
        let endpoint = self.remote_endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::Invalid("remote endpoint is empty".to_string()));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "remote endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        Ok(())
    }

    /// Settings consumed by the poll loop.
    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            report_interval_ms: self.report_interval_ms,
            poll_ceiling_ms: self.poll_ceiling_ms,
            keycode_limit: self.keycode_limit,
            motion_debounce_ms: self.motion_debounce_ms,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
