//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for StudySync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum StudySyncError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for StudySyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for StudySync operations
pub type Result<T> = std::result::Result<T, StudySyncError>;

/// Categories of sync errors, used to decide whether a push is queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorCategory {
    /// Authentication errors (401, 403)
    Authentication,
    /// Rate limiting errors (429)
    RateLimit,
    /// Server errors (5xx)
    Server,
    /// Client errors (4xx except auth)
    Client,
    /// Network/connection errors, including timeouts
    Network,
    /// Local storage or encoding errors
    Local,
    /// Engine was shut down mid-operation
    Cancelled,
}

/// Errors raised while talking to the remote document store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl SyncError {
    /// Get the error category for this error
    pub fn category(&self) -> SyncErrorCategory {
        match self {
            Self::Auth(_) => SyncErrorCategory::Authentication,
            Self::RateLimit(_) => SyncErrorCategory::RateLimit,
            Self::Server(_) => SyncErrorCategory::Server,
            Self::Client(_) => SyncErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => SyncErrorCategory::Network,
            Self::Serialization(_) | Self::Storage(_) => SyncErrorCategory::Local,
            Self::Cancelled => SyncErrorCategory::Cancelled,
        }
    }

    /// True when the failure means "the remote could not be reached".
    ///
    /// Pushes failing this way are parked in the pending-write queue rather
    /// than reported to the caller.
    pub fn is_connectivity(&self) -> bool {
        self.category() == SyncErrorCategory::Network
    }
}

impl From<StudySyncError> for SyncError {
    fn from(err: StudySyncError) -> Self {
        match err {
            StudySyncError::Network(message) | StudySyncError::Transport(message) => {
                Self::Network(message)
            }
            StudySyncError::Serialization(message) => Self::Serialization(message),
            StudySyncError::Storage(message) => Self::Storage(message),
            StudySyncError::NotFound(message) | StudySyncError::Config(message) => {
                Self::Client(message)
            }
            StudySyncError::Internal(message) => Self::Server(message),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn connectivity_errors_are_network_or_timeout() {
        assert!(SyncError::Network("offline".into()).is_connectivity());
        assert!(SyncError::Timeout(Duration::from_secs(5)).is_connectivity());
        assert!(!SyncError::Auth("expired".into()).is_connectivity());
        assert!(!SyncError::Server("boom".into()).is_connectivity());
        assert!(!SyncError::Cancelled.is_connectivity());
    }

    #[test]
    fn studysync_errors_map_onto_sync_categories() {
        let err: SyncError = StudySyncError::Transport("channel closed".into()).into();
        assert_eq!(err.category(), SyncErrorCategory::Network);

        let err: SyncError = StudySyncError::Storage("quota".into()).into();
        assert_eq!(err.category(), SyncErrorCategory::Local);
    }

    #[test]
    fn error_serializes_with_tag_and_message() {
        let json = serde_json::to_value(StudySyncError::Config("bad".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "Config", "message": "bad" }));
    }
}
