//! Cross-process replication protocol

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timer::TimerState;
use crate::constants::STORAGE_SENDER_ID;

/// Unique id of one running process (tab) or one signed-in sync session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Placeholder sender for states observed through the store change path
    pub fn storage() -> Self {
        Self(STORAGE_SENDER_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for InstanceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message exchanged between sibling processes of one profile
///
/// Wire shapes: `{"type":"sync-state","senderId":..,"state":{..}}` and
/// `{"type":"request-sync","senderId":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChannelMessage {
    #[serde(rename_all = "camelCase")]
    SyncState { sender_id: InstanceId, state: TimerState },
    #[serde(rename_all = "camelCase")]
    RequestSync { sender_id: InstanceId },
}

impl ChannelMessage {
    pub fn sender_id(&self) -> &InstanceId {
        match self {
            Self::SyncState { sender_id, .. } | Self::RequestSync { sender_id } => sender_id,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SyncState { .. } => "sync-state",
            Self::RequestSync { .. } => "request-sync",
        }
    }
}
