//! Results and notifications of the cloud sync engine

use serde::Serialize;

/// What a push did with the local buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PushOutcome {
    /// The remote document was updated
    #[serde(rename_all = "camelCase")]
    Pushed { client_updated_at: i64 },
    /// The remote was unreachable; the write waits in the pending queue
    #[serde(rename_all = "camelCase")]
    Queued { pending: usize },
}

/// Verdict on an inbound remote document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyOutcome {
    Applied,
    /// Our own write coming back
    Echo,
    /// Older than a document already applied
    Stale,
}

/// Broadcast to observers of the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    RemoteApplied { client_updated_at: i64, buckets: usize },
    Pushed { client_updated_at: i64 },
    Queued { pending: usize },
    QueueFlushed { entries: usize },
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub user_id: String,
    pub running: bool,
    pub hook_installed: bool,
    pub realtime_active: bool,
    pub pending_writes: usize,
    pub last_pushed_at: Option<i64>,
    pub last_remote_seen: Option<i64>,
}
