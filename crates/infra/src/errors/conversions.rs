//! Conversions from external infrastructure errors into domain errors.

use reqwest::{Error as HttpError, StatusCode};
use studysync_domain::{StudySyncError, SyncError};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SyncError);

impl From<InfraError> for SyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SyncError> for InfraError {
    fn from(value: SyncError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        if value.is_timeout() {
            return InfraError(SyncError::Network("HTTP request timed out".into()));
        }

        #[cfg(not(target_arch = "wasm32"))]
        if value.is_connect() {
            return InfraError(SyncError::Network("HTTP connection failure".into()));
        }

        if let Some(status) = value.status() {
            return InfraError(status_error(status, ""));
        }

        if value.is_decode() {
            return InfraError(SyncError::Serialization(value.to_string()));
        }

        InfraError(SyncError::Network(value.to_string()))
    }
}

/// Classify a non-success HTTP status
pub fn status_error(status: StatusCode, body: &str) -> SyncError {
    let code = status.as_u16();
    let mut message =
        format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
    if !body.trim().is_empty() {
        message.push_str(": ");
        message.push_str(body.trim());
    }

    match code {
        401 | 403 => SyncError::Auth(message),
        429 => SyncError::RateLimit(message),
        400..=499 => SyncError::Client(message),
        500..=599 => SyncError::Server(message),
        _ => SyncError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → StudySyncError */
/* -------------------------------------------------------------------------- */

/// Wrap a file-system failure of the local store
pub fn storage_error(context: &str, err: std::io::Error) -> StudySyncError {
    StudySyncError::Storage(format!("{context}: {err}"))
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
