//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CROSS_TAB_EDIT_DEBOUNCE_MS, DEFAULT_DISPLAY_REFRESH_MS, DEFAULT_JOIN_TIMEOUT_MS,
    DEFAULT_REMOTE_POLL_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_STORE_PREFIX,
    LOCAL_EDIT_DEBOUNCE_MS,
};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub timer: TimerConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Local store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file backing the store; `None` keeps everything in memory
    pub path: Option<String>,
    /// Prefix for every key this application writes
    pub key_prefix: String,
}

/// Timer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Interval of the display refresh while a session is running
    pub display_refresh_ms: u64,
}

/// Cloud sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    /// Base URL of the remote document API; `None` selects the in-memory
    /// document store
    pub remote_url: Option<String>,
    /// Quiet period before pushing a same-process edit
    pub local_debounce_ms: u64,
    /// Quiet period before pushing an edit seen through the cross-process
    /// change notification
    pub cross_tab_debounce_ms: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub join_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: None, key_prefix: DEFAULT_STORE_PREFIX.to_string() }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self { display_refresh_ms: DEFAULT_DISPLAY_REFRESH_MS }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remote_url: None,
            local_debounce_ms: LOCAL_EDIT_DEBOUNCE_MS,
            cross_tab_debounce_ms: CROSS_TAB_EDIT_DEBOUNCE_MS,
            poll_interval_ms: DEFAULT_REMOTE_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

impl TimerConfig {
    pub fn display_refresh(&self) -> Duration {
        Duration::from_millis(self.display_refresh_ms)
    }
}

impl SyncConfig {
    pub fn local_debounce(&self) -> Duration {
        Duration::from_millis(self.local_debounce_ms)
    }

    pub fn cross_tab_debounce(&self) -> Duration {
        Duration::from_millis(self.cross_tab_debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}
