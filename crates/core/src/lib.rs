//! # StudySync Core
//!
//! Replication and sync logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The timer state machine and the service that owns timer state
//! - The local replication bus and the store-backed transport
//! - The per-user cloud sync engine and its offline queue
//! - Port interfaces (traits) for the store, transports, remote and network
//!
//! ## Architecture Principles
//! - Only depends on `studysync-common` and `studysync-domain`
//! - No file, HTTP, or platform code
//! - All external collaborators via traits
//! - Wall-clock time injected through `Clock`

pub mod cloud;
pub mod store;
pub mod timer;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-export specific items to avoid ambiguity
pub use cloud::{
    ApplyOutcome, CloudSyncEngine, NetworkMonitor, PushOutcome, RemoteDocumentStore, SyncEvent,
    SyncStatus,
};
pub use store::{ChangeKind, ChangeScope, LocalStore, StoreChange, StoreKeys};
pub use timer::{
    ReplicationBus, ReplicationTransport, StorageEventTransport, TimerService, TransportKind,
};
