//! Configuration loader
//!
//! Loads application configuration from a file, then applies environment
//! overrides.
//!
//! ## Loading Strategy
//! 1. Searches several paths for a config file (JSON or TOML)
//! 2. Falls back to built-in defaults when no file exists
//! 3. Applies `STUDYSYNC_*` environment variables on top
//!
//! ## Environment Variables
//! - `STUDYSYNC_STORE_PATH`: JSON file backing the local store
//! - `STUDYSYNC_STORE_PREFIX`: Key prefix of the local store
//! - `STUDYSYNC_DISPLAY_REFRESH_MS`: Timer display refresh interval
//! - `STUDYSYNC_SYNC_ENABLED`: Whether cloud sync runs (true/false)
//! - `STUDYSYNC_REMOTE_URL`: Base URL of the remote document API
//! - `STUDYSYNC_LOCAL_DEBOUNCE_MS`: Push delay after a same-process edit
//! - `STUDYSYNC_CROSS_TAB_DEBOUNCE_MS`: Push delay after a sibling edit
//! - `STUDYSYNC_POLL_INTERVAL_MS`: Remote polling interval
//! - `STUDYSYNC_REQUEST_TIMEOUT_MS`: Remote request timeout
//! - `STUDYSYNC_JOIN_TIMEOUT_MS`: Background task join timeout on shutdown
//! - `STUDYSYNC_LOG_LEVEL`: Default log filter
//! - `STUDYSYNC_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./studysync.json` or `./studysync.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use studysync_domain::{Config, Result, StudySyncError};

/// Load configuration: first config file found (or defaults), then environment overrides
///
/// # Errors
/// Returns `StudySyncError::Config` if a found file is invalid or an
/// environment override cannot be parsed.
pub fn load() -> Result<Config> {
    let config = match find_config_path() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found; using defaults");
            Config::default()
        }
    };

    apply_env_overrides(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches several locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
/// Missing sections and fields take their default values.
///
/// # Errors
/// Returns `StudySyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(StudySyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_path().ok_or_else(|| {
            StudySyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| StudySyncError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Apply `STUDYSYNC_*` environment variables to `config`
///
/// Unset variables leave the corresponding field untouched.
///
/// # Errors
/// Returns `StudySyncError::Config` if a numeric variable does not parse.
pub fn apply_env_overrides(mut config: Config) -> Result<Config> {
    if let Some(path) = env_opt("STUDYSYNC_STORE_PATH") {
        config.store.path = Some(path);
    }
    if let Some(prefix) = env_opt("STUDYSYNC_STORE_PREFIX") {
        config.store.key_prefix = prefix;
    }
    if let Some(ms) = env_millis("STUDYSYNC_DISPLAY_REFRESH_MS")? {
        config.timer.display_refresh_ms = ms;
    }

    config.sync.enabled = env_bool("STUDYSYNC_SYNC_ENABLED", config.sync.enabled);
    if let Some(url) = env_opt("STUDYSYNC_REMOTE_URL") {
        config.sync.remote_url = Some(url);
    }
    if let Some(ms) = env_millis("STUDYSYNC_LOCAL_DEBOUNCE_MS")? {
        config.sync.local_debounce_ms = ms;
    }
    if let Some(ms) = env_millis("STUDYSYNC_CROSS_TAB_DEBOUNCE_MS")? {
        config.sync.cross_tab_debounce_ms = ms;
    }
    if let Some(ms) = env_millis("STUDYSYNC_POLL_INTERVAL_MS")? {
        config.sync.poll_interval_ms = ms;
    }
    if let Some(ms) = env_millis("STUDYSYNC_REQUEST_TIMEOUT_MS")? {
        config.sync.request_timeout_ms = ms;
    }
    if let Some(ms) = env_millis("STUDYSYNC_JOIN_TIMEOUT_MS")? {
        config.sync.join_timeout_ms = ms;
    }

    if let Some(level) = env_opt("STUDYSYNC_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("STUDYSYNC_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `StudySyncError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| StudySyncError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| StudySyncError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(StudySyncError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Search several paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("studysync.json"),
        dir.join("studysync.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Non-empty environment variable
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Millisecond value from an environment variable
///
/// # Errors
/// Returns `StudySyncError::Config` if the variable is set but not a
/// non-negative integer.
fn env_millis(key: &str) -> Result<Option<u64>> {
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| StudySyncError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
