//! In-crate test doubles for the store, transport, remote and network ports

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use studysync_domain::{ChannelMessage, CloudBundle, Result, SyncError};
use tokio::sync::{broadcast, watch};

use crate::cloud::{NetworkMonitor, RemoteDocumentStore};
use crate::store::{ChangeKind, ChangeScope, LocalStore, StoreChange};
use crate::timer::{ReplicationTransport, TransportKind};
use crate::utils::broadcast_stream;

/// Single-process store that can fake writes from a sibling process
pub struct RecordingStore {
    values: Mutex<BTreeMap<String, String>>,
    announced: Mutex<Vec<StoreChange>>,
    changes: broadcast::Sender<StoreChange>,
}

impl RecordingStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(128);
        Self { values: Mutex::new(BTreeMap::new()), announced: Mutex::new(Vec::new()), changes }
    }

    pub fn simulate_sibling_write(&self, key: &str, value: &str) {
        self.write(key, Some(value), ChangeScope::CrossProcess, ChangeKind::User);
    }

    /// Kinds of the announced changes of `key`, oldest first
    pub fn kinds_for(&self, key: &str) -> Vec<ChangeKind> {
        self.announced
            .lock()
            .iter()
            .filter(|change| change.key == key)
            .map(|change| change.kind)
            .collect()
    }

    fn write(&self, key: &str, value: Option<&str>, scope: ChangeScope, kind: ChangeKind) {
        {
            let mut values = self.values.lock();
            let previous = match value {
                Some(value) => values.insert(key.to_string(), value.to_string()),
                None => values.remove(key),
            };
            if previous.as_deref() == value {
                return;
            }
        }

        let change =
            StoreChange { key: key.to_string(), value: value.map(str::to_string), scope, kind };
        self.announced.lock().push(change.clone());
        let _ = self.changes.send(change);
    }
}

impl LocalStore for RecordingStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, Some(value), ChangeScope::Local, ChangeKind::User);
        Ok(())
    }

    fn hydrate(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, Some(value), ChangeScope::Local, ChangeKind::Hydrate);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.write(key, None, ChangeScope::Local, ChangeKind::User);
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, StoreChange> {
        broadcast_stream(self.changes.subscribe())
    }
}

/// Transport that records what is published and delivers injected messages
pub struct RecordingTransport {
    kind: TransportKind,
    published: Mutex<Vec<ChannelMessage>>,
    inbound: broadcast::Sender<ChannelMessage>,
}

impl RecordingTransport {
    pub fn new(kind: TransportKind) -> Self {
        let (inbound, _) = broadcast::channel(64);
        Self { kind, published: Mutex::new(Vec::new()), inbound }
    }

    pub fn published(&self) -> Vec<ChannelMessage> {
        self.published.lock().clone()
    }

    pub fn inject(&self, message: ChannelMessage) {
        let _ = self.inbound.send(message);
    }
}

impl ReplicationTransport for RecordingTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn publish(&self, message: &ChannelMessage) -> Result<()> {
        self.published.lock().push(message.clone());
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, ChannelMessage> {
        broadcast_stream(self.inbound.subscribe())
    }
}

/// Remote document store with scripted failures
pub struct ScriptedRemote {
    documents: Mutex<HashMap<String, CloudBundle>>,
    upserts: Mutex<Vec<CloudBundle>>,
    failures: Mutex<VecDeque<SyncError>>,
    notifications: broadcast::Sender<(String, CloudBundle)>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(64);
        Self {
            documents: Mutex::new(HashMap::new()),
            upserts: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            notifications,
        }
    }

    /// Fail the next request with `error`
    pub fn fail_next(&self, error: SyncError) {
        self.failures.lock().push_back(error);
    }

    /// Successful upserts, oldest first
    pub fn upserts(&self) -> Vec<CloudBundle> {
        self.upserts.lock().clone()
    }

    pub fn seed(&self, user_id: &str, bundle: CloudBundle) {
        self.documents.lock().insert(user_id.to_string(), bundle);
    }

    /// Push a notification as if another device had written
    pub fn notify(&self, user_id: &str, bundle: CloudBundle) {
        let _ = self.notifications.send((user_id.to_string(), bundle));
    }

    fn scripted_failure(&self) -> std::result::Result<(), SyncError> {
        match self.failures.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteDocumentStore for ScriptedRemote {
    async fn fetch(&self, user_id: &str) -> std::result::Result<Option<CloudBundle>, SyncError> {
        self.scripted_failure()?;
        Ok(self.documents.lock().get(user_id).cloned())
    }

    async fn merge_upsert(
        &self,
        user_id: &str,
        bundle: &CloudBundle,
    ) -> std::result::Result<CloudBundle, SyncError> {
        self.scripted_failure()?;
        let stored = {
            let mut documents = self.documents.lock();
            let document = documents.entry(user_id.to_string()).or_default();
            document.merge_from(bundle);
            document.clone()
        };
        self.upserts.lock().push(bundle.clone());
        self.notify(user_id, stored.clone());
        Ok(stored)
    }

    async fn subscribe(
        &self,
        user_id: &str,
    ) -> std::result::Result<BoxStream<'static, CloudBundle>, SyncError> {
        use futures::StreamExt;

        self.scripted_failure()?;
        let user_id = user_id.to_string();
        Ok(broadcast_stream(self.notifications.subscribe())
            .filter_map(move |(target, bundle)| {
                futures::future::ready((target == user_id).then_some(bundle))
            })
            .boxed())
    }
}

/// Connectivity flag flipped by the test
pub struct ManualNetwork {
    online: watch::Sender<bool>,
}

impl ManualNetwork {
    pub fn new(online: bool) -> Self {
        let (online, _) = watch::channel(online);
        Self { online }
    }

    pub fn set_online(&self, online: bool) {
        self.online.send_replace(online);
    }
}

impl NetworkMonitor for ManualNetwork {
    fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }
}
