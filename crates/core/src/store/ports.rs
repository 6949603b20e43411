//! Port interface for the origin-scoped key-value store

use futures::stream::BoxStream;
use studysync_domain::Result;

/// Who observes a change relative to the process that wrote it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    /// The observer belongs to the writing process
    Local,
    /// The observer is a sibling process of the same origin
    CrossProcess,
}

/// Why a key was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A user-driven edit
    User,
    /// Data pulled from the cloud. Never triggers an outbound push.
    Hydrate,
}

/// A key whose value actually changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
    /// New value, `None` when the key was removed
    pub value: Option<String>,
    pub scope: ChangeScope,
    pub kind: ChangeKind,
}

/// Synchronous string-keyed store shared by every process of one origin.
///
/// Writes that leave a value unchanged are not announced. Sibling handles
/// observe a write with [`ChangeScope::CrossProcess`]; the writer's own
/// observers see it with [`ChangeScope::Local`].
pub trait LocalStore: Send + Sync {
    /// Read the raw value of `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// User-driven write
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write data received from the cloud
    fn hydrate(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`
    fn remove(&self, key: &str) -> Result<()>;

    /// Changes observed by this handle from now on
    fn subscribe(&self) -> BoxStream<'static, StoreChange>;
}
