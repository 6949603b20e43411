//! Port interfaces for the remote document store and connectivity

use async_trait::async_trait;
use futures::stream::BoxStream;
use studysync_domain::{CloudBundle, SyncError};
use tokio::sync::watch;

/// One JSON document per user with merge-upsert and push notifications
#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Fetch the user's document, `None` if it was never written
    async fn fetch(&self, user_id: &str) -> Result<Option<CloudBundle>, SyncError>;

    /// Merge `bundle` into the stored document. Buckets absent from `bundle`
    /// are left untouched. Returns the stored document.
    async fn merge_upsert(&self, user_id: &str, bundle: &CloudBundle)
        -> Result<CloudBundle, SyncError>;

    /// Every subsequent write to the user's document, in server order
    async fn subscribe(&self, user_id: &str)
        -> Result<BoxStream<'static, CloudBundle>, SyncError>;
}

/// Connectivity signal of the host
pub trait NetworkMonitor: Send + Sync {
    fn is_online(&self) -> bool;

    /// Receives `true` whenever the host comes back online
    fn subscribe(&self) -> watch::Receiver<bool>;
}
