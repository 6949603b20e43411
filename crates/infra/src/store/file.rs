//! JSON-file-backed store
//!
//! The whole origin is kept in memory and written to one JSON object file
//! after every change (temp file, then rename), so the data survives a
//! restart.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::BoxStream;
use studysync_core::{LocalStore, StoreChange};
use studysync_domain::{Result, StudySyncError};
use tracing::{info, warn};

use super::memory::{MemoryOrigin, MemoryStore};
use crate::errors::storage_error;

/// Where an origin persists itself
pub(crate) struct FileBacking {
    path: PathBuf,
}

impl FileBacking {
    fn load(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|err| {
                StudySyncError::Storage(format!(
                    "Store file {} is malformed: {err}",
                    self.path.display()
                ))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(storage_error("Failed to read store file", err)),
        }
    }

    pub(crate) fn flush(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw).map_err(|err| storage_error("Failed to write store file", err))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|err| storage_error("Failed to replace store file", err))
    }
}

/// Store persisted to a JSON file
#[derive(Clone)]
pub struct FileStore {
    inner: MemoryStore,
    path: PathBuf,
}

impl FileStore {
    /// Open (or create) the store at `path`
    ///
    /// # Errors
    /// Returns `StudySyncError::Storage` if the file exists but cannot be
    /// read or parsed, or its directory cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| storage_error("Failed to create store directory", err))?;
        }

        cleanup_temp_file(&path);
        let backing = FileBacking { path: path.clone() };
        let values = backing.load()?;
        info!(path = %path.display(), keys = values.len(), "Opened file store");

        let origin = MemoryOrigin::with_values(values, Some(backing));
        Ok(Self { inner: origin.open_handle(), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Another process handle on the same file
    pub fn sibling(&self) -> Self {
        Self { inner: self.inner.sibling(), path: self.path.clone() }
    }

    pub fn origin(&self) -> &Arc<MemoryOrigin> {
        self.inner.origin()
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set(key, value)
    }

    fn hydrate(&self, key: &str, value: &str) -> Result<()> {
        self.inner.hydrate(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }

    fn subscribe(&self) -> BoxStream<'static, StoreChange> {
        self.inner.subscribe()
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish()
    }
}

/// Drop a stale temp file left by an interrupted flush
pub fn cleanup_temp_file(path: &Path) {
    let tmp = path.with_extension("json.tmp");
    if tmp.exists() {
        if let Err(err) = std::fs::remove_file(&tmp) {
            warn!(path = %tmp.display(), error = %err, "Failed to remove stale store temp file");
        }
    }
}
