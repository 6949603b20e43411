//! Persisted queue of pushes that could not reach the remote store

use std::sync::Arc;

use studysync_domain::{PendingWrite, Result};
use tracing::warn;

use crate::store::{LocalStore, StoreKeys};

/// Oldest-first list of [`PendingWrite`]s under `<prefix>.pendingWrites`
pub struct PendingQueue {
    store: Arc<dyn LocalStore>,
    key: String,
}

impl PendingQueue {
    pub fn new(store: Arc<dyn LocalStore>, keys: &StoreKeys) -> Self {
        Self { store, key: keys.pending_writes() }
    }

    /// Queued entries. A malformed queue reads as empty.
    pub fn load(&self) -> Vec<PendingWrite> {
        match self.store.get(&self.key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(error = %err, "Pending write queue is malformed; ignoring it");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "Failed to read pending write queue");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one entry; returns the new queue length
    pub fn push(&self, entry: PendingWrite) -> Result<usize> {
        let mut entries = self.load();
        entries.push(entry);
        self.save(&entries)?;
        Ok(entries.len())
    }

    /// Remove and return everything queued
    pub fn take_all(&self) -> Result<Vec<PendingWrite>> {
        let entries = self.load();
        if !entries.is_empty() {
            self.store.remove(&self.key)?;
        }
        Ok(entries)
    }

    /// Put `entries` back in front of anything queued since they were taken
    pub fn restore(&self, mut entries: Vec<PendingWrite>) -> Result<()> {
        entries.extend(self.load());
        self.save(&entries)
    }

    fn save(&self, entries: &[PendingWrite]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.store.set(&self.key, &raw)
    }
}
