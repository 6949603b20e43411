//! Cloud sync: per-user engine, remote ports and the offline queue

pub mod engine;
pub mod outcome;
pub mod ports;
pub mod queue;

pub use engine::CloudSyncEngine;
pub use outcome::{ApplyOutcome, PushOutcome, SyncEvent, SyncStatus};
pub use ports::{NetworkMonitor, RemoteDocumentStore};
pub use queue::PendingQueue;
