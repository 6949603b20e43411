//! In-process remote document store
//!
//! Holds one [`CloudBundle`] per user and pushes every stored write to the
//! user's subscribers, the way a hosted document database with change
//! listeners would. Used when no remote URL is configured and by the
//! multi-device tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use studysync_core::utils::broadcast_stream;
use studysync_core::RemoteDocumentStore;
use studysync_domain::constants::DEFAULT_CHANNEL_CAPACITY;
use studysync_domain::{CloudBundle, SyncError};
use tokio::sync::broadcast;
use tracing::debug;

pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<String, CloudBundle>>,
    notifications: broadcast::Sender<(String, CloudBundle)>,
    reachable: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            documents: Mutex::new(HashMap::new()),
            notifications,
            reachable: AtomicBool::new(true),
        }
    }

    /// Simulate the server being reachable or not
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Stored document of `user_id`
    pub fn document(&self, user_id: &str) -> Option<CloudBundle> {
        self.documents.lock().get(user_id).cloned()
    }

    fn ensure_reachable(&self) -> Result<(), SyncError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::Network("remote document store unreachable".into()))
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteDocumentStore for InMemoryDocumentStore {
    async fn fetch(&self, user_id: &str) -> Result<Option<CloudBundle>, SyncError> {
        self.ensure_reachable()?;
        Ok(self.document(user_id))
    }

    async fn merge_upsert(
        &self,
        user_id: &str,
        bundle: &CloudBundle,
    ) -> Result<CloudBundle, SyncError> {
        self.ensure_reachable()?;

        let mut documents = self.documents.lock();
        let document = documents.entry(user_id.to_string()).or_default();
        document.merge_from(bundle);
        document.last_synced = Some(chrono::Utc::now().timestamp_millis());
        let stored = document.clone();

        debug!(
            user_id,
            buckets = bundle.buckets.len(),
            client_updated_at = stored.client_updated_at,
            "Stored bundle"
        );
        // notified under the lock so subscribers see server order
        let _ = self.notifications.send((user_id.to_string(), stored.clone()));
        Ok(stored)
    }

    async fn subscribe(&self, user_id: &str) -> Result<BoxStream<'static, CloudBundle>, SyncError> {
        self.ensure_reachable()?;
        let user_id = user_id.to_string();
        Ok(broadcast_stream(self.notifications.subscribe())
            .filter_map(move |(owner, bundle)| futures::future::ready((owner == user_id).then_some(bundle)))
            .boxed())
    }
}
