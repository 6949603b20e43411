//! In-memory origin store shared by every process handle of one profile
//!
//! A [`MemoryOrigin`] owns the key-value data; each simulated process opens
//! its own [`MemoryStore`] handle on it. Changes are announced on one
//! broadcast channel and every handle translates the writer id into a
//! [`ChangeScope`] for its own subscribers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use studysync_core::utils::broadcast_stream;
use studysync_core::{ChangeKind, ChangeScope, LocalStore, StoreChange};
use studysync_domain::constants::DEFAULT_CHANNEL_CAPACITY;
use studysync_domain::Result;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::file::FileBacking;

/// A change as seen by the origin, tagged with the writing handle
#[derive(Debug, Clone)]
struct OriginChange {
    writer: u64,
    key: String,
    value: Option<String>,
    kind: ChangeKind,
}

/// Shared data of one origin
pub struct MemoryOrigin {
    values: Mutex<BTreeMap<String, String>>,
    changes: broadcast::Sender<OriginChange>,
    next_handle: AtomicU64,
    backing: Option<FileBacking>,
}

impl MemoryOrigin {
    pub fn new() -> Arc<Self> {
        Self::with_values(BTreeMap::new(), None)
    }

    pub(crate) fn with_values(
        values: BTreeMap<String, String>,
        backing: Option<FileBacking>,
    ) -> Arc<Self> {
        let (changes, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Arc::new(Self {
            values: Mutex::new(values),
            changes,
            next_handle: AtomicU64::new(1),
            backing,
        })
    }

    /// Open a handle for one more process of this origin
    pub fn open_handle(self: &Arc<Self>) -> MemoryStore {
        let handle_id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        debug!(handle_id, "Opened store handle");
        MemoryStore { origin: Arc::clone(self), handle_id }
    }

    /// Copy of every stored key and value
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values.lock().clone()
    }

    fn write(&self, writer: u64, key: &str, value: Option<&str>, kind: ChangeKind) -> Result<()> {
        let mut values = self.values.lock();
        let previous = match value {
            Some(value) => values.insert(key.to_string(), value.to_string()),
            None => values.remove(key),
        };
        if previous.as_deref() == value {
            return Ok(());
        }

        if let Some(backing) = &self.backing {
            if let Err(err) = backing.flush(&values) {
                // roll back so memory and disk agree
                match previous {
                    Some(previous) => values.insert(key.to_string(), previous),
                    None => values.remove(key),
                };
                return Err(err);
            }
        }

        // sent under the lock so subscribers observe writes in commit order
        let change = OriginChange {
            writer,
            key: key.to_string(),
            value: value.map(str::to_string),
            kind,
        };
        if self.changes.send(change).is_err() {
            debug!(key, "No store subscribers for change");
        }
        Ok(())
    }
}

/// One process's handle on a [`MemoryOrigin`]
#[derive(Clone)]
pub struct MemoryStore {
    origin: Arc<MemoryOrigin>,
    handle_id: u64,
}

impl MemoryStore {
    /// Fresh origin with a single handle
    pub fn new() -> Self {
        MemoryOrigin::new().open_handle()
    }

    pub fn origin(&self) -> &Arc<MemoryOrigin> {
        &self.origin
    }

    /// Another process handle on the same origin
    pub fn sibling(&self) -> Self {
        self.origin.open_handle()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.origin.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.origin.write(self.handle_id, key, Some(value), ChangeKind::User)
    }

    fn hydrate(&self, key: &str, value: &str) -> Result<()> {
        self.origin.write(self.handle_id, key, Some(value), ChangeKind::Hydrate)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.origin.write(self.handle_id, key, None, ChangeKind::User)
    }

    fn subscribe(&self) -> BoxStream<'static, StoreChange> {
        let me = self.handle_id;
        broadcast_stream(self.origin.changes.subscribe())
            .map(move |change| StoreChange {
                scope: if change.writer == me { ChangeScope::Local } else { ChangeScope::CrossProcess },
                key: change.key,
                value: change.value,
                kind: change.kind,
            })
            .boxed()
    }
}

impl Drop for MemoryOrigin {
    fn drop(&mut self) {
        if let Some(backing) = &self.backing {
            if let Err(err) = backing.flush(&self.values.lock()) {
                warn!(error = %err, "Failed to flush store on shutdown");
            }
        }
    }
}
