use std::time::Duration;

use studysync_domain::{LoggingConfig, StudySyncError, SyncErrorCategory};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::CommandError;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. JSON output is selected
/// by `config.json`.
///
/// # Errors
/// Returns `StudySyncError::Config` for an invalid filter directive and
/// `StudySyncError::Internal` if a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), StudySyncError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|err| {
            StudySyncError::Config(format!("Invalid log level '{}': {}", config.level, err))
        })?,
    };

    let installed = if config.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    installed.map_err(|err| {
        StudySyncError::Internal(format!("Tracing subscriber already installed: {}", err))
    })
}

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"timer::stop_session"`).
/// * `elapsed` - Duration the command execution took.
/// * `error_type` - Label of the failure, `None` on success.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error_type: Option<&str>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match error_type {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(error_type) => warn!(command, duration_ms, error_type, "command_execution_failure"),
    }
}

/// Convert a `CommandError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &CommandError) -> &'static str {
    match error {
        CommandError::Transition(_) => "transition",
        CommandError::Sync(err) => match err.category() {
            SyncErrorCategory::Authentication => "auth",
            SyncErrorCategory::RateLimit => "rate_limit",
            SyncErrorCategory::Server => "server",
            SyncErrorCategory::Client => "client",
            SyncErrorCategory::Network => "network",
            SyncErrorCategory::Local => "local",
            SyncErrorCategory::Cancelled => "cancelled",
        },
        CommandError::Store(_) => "store",
        CommandError::NotSignedIn => "not_signed_in",
    }
}
