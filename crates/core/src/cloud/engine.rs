//! Cloud sync engine for one signed-in user.
//!
//! Mirrors the local buckets into the user's remote document and back:
//! - outbound: bucket edits schedule a debounced push of every bucket
//! - inbound: remote notifications are hydrated unless they are our own
//!   echo or older than something already applied
//! - offline: failed pushes wait in a persisted queue that is folded and
//!   flushed on reconnect or sign-in
//!
//! One engine exists per authenticated session. Sign-out stops it; sign-in
//! creates a fresh one, so nothing leaks between users.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use studysync_core::cloud::CloudSyncEngine;
//! # use studysync_core::cloud::RemoteDocumentStore;
//! # use studysync_core::store::{LocalStore, StoreKeys};
//! # use studysync_common::time::SystemClock;
//! # use studysync_domain::SyncConfig;
//!
//! # async fn example(
//! #     store: Arc<dyn LocalStore>,
//! #     remote: Arc<dyn RemoteDocumentStore>,
//! # ) -> Result<(), studysync_domain::SyncError> {
//! let engine = Arc::new(CloudSyncEngine::new(
//!     "user-1",
//!     store,
//!     remote,
//!     Arc::new(SystemClock),
//!     StoreKeys::default(),
//!     SyncConfig::default(),
//! ));
//!
//! engine.start().await?;
//! // ... user edits buckets ...
//! engine.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use studysync_common::time::{Clock, Debouncer};
use studysync_domain::{
    Bucket, BucketMap, CloudBundle, InstanceId, PendingWrite, SyncConfig, SyncError,
};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::outcome::{ApplyOutcome, PushOutcome, SyncEvent, SyncStatus};
use super::ports::{NetworkMonitor, RemoteDocumentStore};
use super::queue::PendingQueue;
use crate::store::{ChangeKind, ChangeScope, LocalStore, StoreChange, StoreKeys};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct SyncMarkers {
    /// `clientUpdatedAt` of our latest push attempt
    last_pushed_at: Option<i64>,
    /// `clientUpdatedAt` of the newest remote document applied
    last_remote_seen: Option<i64>,
    hook_installed: bool,
    /// A realtime subscription is delivering notifications
    realtime_active: bool,
}

#[derive(Default)]
struct Lifecycle {
    running: bool,
    cancellation: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Bidirectional bucket sync for one user
pub struct CloudSyncEngine {
    user_id: String,
    session_id: InstanceId,
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteDocumentStore>,
    clock: Arc<dyn Clock>,
    network: Option<Arc<dyn NetworkMonitor>>,
    keys: StoreKeys,
    queue: PendingQueue,
    config: SyncConfig,
    markers: Mutex<SyncMarkers>,
    debouncer: Debouncer,
    lifecycle: Mutex<Lifecycle>,
    events: broadcast::Sender<SyncEvent>,
}

impl CloudSyncEngine {
    pub fn new(
        user_id: impl Into<String>,
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteDocumentStore>,
        clock: Arc<dyn Clock>,
        keys: StoreKeys,
        config: SyncConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            user_id: user_id.into(),
            session_id: InstanceId::new(),
            queue: PendingQueue::new(Arc::clone(&store), &keys),
            store,
            remote,
            clock,
            network: None,
            keys,
            config,
            markers: Mutex::new(SyncMarkers::default()),
            debouncer: Debouncer::new(),
            lifecycle: Mutex::new(Lifecycle::default()),
            events,
        }
    }

    /// Queue pushes without a network attempt while `network` reports
    /// offline, and flush the queue when it comes back.
    pub fn with_network_monitor(mut self, network: Arc<dyn NetworkMonitor>) -> Self {
        self.network = Some(network);
        self
    }

    /// Stamp pushed bundles with the id of the hosting process
    pub fn with_session_id(mut self, session_id: InstanceId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &InstanceId {
        &self.session_id
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Fetch the remote document once and overwrite every bucket it holds.
    #[instrument(skip(self), fields(user = %self.user_id))]
    pub async fn pull_user_bundle(&self) -> Result<Option<CloudBundle>, SyncError> {
        let Some(bundle) = self.with_timeout(self.remote.fetch(&self.user_id)).await? else {
            debug!("No remote bundle yet");
            return Ok(None);
        };

        let written = self.hydrate_buckets(&bundle);
        self.advance_remote_seen(bundle.client_updated_at);
        info!(buckets = written, client_updated_at = bundle.client_updated_at, "Pulled remote bundle");
        Ok(Some(bundle))
    }

    /// Push every local bucket, with `override_buckets` taking precedence.
    ///
    /// Connectivity failures (and a known-offline host) queue the write
    /// instead of failing; any other error is returned.
    #[instrument(skip(self, override_buckets), fields(user = %self.user_id))]
    pub async fn push_user_bundle(
        &self,
        override_buckets: Option<BucketMap>,
    ) -> Result<PushOutcome, SyncError> {
        let mut buckets = self.read_local_buckets();
        if let Some(extra) = override_buckets {
            buckets.extend(extra);
        }
        let now = self.clock.timestamp_ms();

        if !self.is_online() {
            debug!("Host offline; queueing push");
            return self.enqueue(now, buckets);
        }

        match self.upload(buckets.clone(), now).await {
            Ok(()) => Ok(PushOutcome::Pushed { client_updated_at: now }),
            Err(err) if err.is_connectivity() => {
                warn!(error = %err, "Push failed on connectivity; queueing");
                self.enqueue(now, buckets)
            }
            Err(err) => {
                warn!(error = %err, category = ?err.category(), "Push rejected");
                Err(err)
            }
        }
    }

    /// Pull, then push.
    pub async fn full_sync(&self) -> Result<PushOutcome, SyncError> {
        self.pull_user_bundle().await?;
        self.push_user_bundle(None).await
    }

    /// Decide whether an inbound remote document should be hydrated, and
    /// hydrate it if so.
    pub fn apply_remote(&self, bundle: &CloudBundle) -> ApplyOutcome {
        {
            let markers = self.markers.lock();
            let own_write = bundle.session_id == self.session_id.as_str();
            if own_write && markers.last_pushed_at.is_some_and(|at| bundle.client_updated_at <= at)
            {
                debug!(client_updated_at = bundle.client_updated_at, "Ignoring echo of own push");
                return ApplyOutcome::Echo;
            }
            if markers.last_remote_seen.is_some_and(|seen| seen > bundle.client_updated_at) {
                debug!(
                    client_updated_at = bundle.client_updated_at,
                    last_remote_seen = ?markers.last_remote_seen,
                    "Ignoring stale remote bundle"
                );
                return ApplyOutcome::Stale;
            }
        }

        let written = self.hydrate_buckets(bundle);
        self.advance_remote_seen(bundle.client_updated_at);
        info!(
            buckets = written,
            client_updated_at = bundle.client_updated_at,
            writer = %bundle.session_id,
            "Applied remote bundle"
        );
        self.emit(SyncEvent::RemoteApplied {
            client_updated_at: bundle.client_updated_at,
            buckets: written,
        });
        ApplyOutcome::Applied
    }

    /// Push the folded pending queue as one write.
    ///
    /// The queue is cleared before the attempt and restored if it fails.
    /// Returns how many queued entries were flushed.
    #[instrument(skip(self), fields(user = %self.user_id))]
    pub async fn flush_pending_queue(&self) -> Result<usize, SyncError> {
        if !self.is_online() {
            debug!("Host offline; leaving pending writes queued");
            return Ok(0);
        }

        let entries = self.queue.take_all()?;
        if entries.is_empty() {
            return Ok(0);
        }

        let composite = PendingWrite::fold(&entries);
        let count = entries.len();
        match self.upload(composite, self.clock.timestamp_ms()).await {
            Ok(()) => {
                info!(entries = count, "Flushed pending writes");
                self.emit(SyncEvent::QueueFlushed { entries: count });
                Ok(count)
            }
            Err(err) => {
                warn!(entries = count, error = %err, "Pending write flush failed; restoring queue");
                if let Err(restore_err) = self.queue.restore(entries) {
                    error!(error = %restore_err, "Failed to restore pending writes");
                }
                Err(err)
            }
        }
    }

    /// Start pushing on bucket edits. Returns false if the hook was already
    /// installed for this session.
    pub fn install_local_change_hook(self: &Arc<Self>) -> bool {
        {
            let mut markers = self.markers.lock();
            if markers.hook_installed {
                return false;
            }
            markers.hook_installed = true;
        }

        let changes = self.store.subscribe();
        let engine = Arc::downgrade(self);
        let mut lifecycle = self.lifecycle.lock();
        let cancel = lifecycle.cancellation.clone();
        lifecycle.tasks.push(tokio::spawn(Self::local_change_loop(engine, changes, cancel)));
        debug!("Local change hook installed");
        true
    }

    /// Subscribe to the remote document and apply every notification.
    #[instrument(skip(self), fields(user = %self.user_id))]
    pub async fn start_realtime(self: &Arc<Self>) -> Result<(), SyncError> {
        let updates = self.with_timeout(self.remote.subscribe(&self.user_id)).await?;
        let engine = Arc::downgrade(self);
        let mut lifecycle = self.lifecycle.lock();
        if !lifecycle.running {
            debug!("Engine stopped during subscribe; dropping subscription");
            return Ok(());
        }
        self.markers.lock().realtime_active = true;
        let cancel = lifecycle.cancellation.clone();
        lifecycle.tasks.push(tokio::spawn(Self::realtime_loop(engine, updates, cancel)));
        debug!("Realtime subscription started");
        Ok(())
    }

    /// Catch up and re-subscribe if the realtime subscription is down.
    async fn resume_realtime(self: &Arc<Self>) {
        let active = self.markers.lock().realtime_active;
        if active || !self.is_running() {
            return;
        }
        info!("Resuming realtime subscription");
        if let Err(err) = self.full_sync().await {
            warn!(error = %err, "Catch-up sync failed");
        }
        if let Err(err) = self.start_realtime().await {
            warn!(error = %err, "Realtime subscription still unavailable");
        }
    }

    /// Sign-in sequence: flush the queue, full sync, install the hook,
    /// subscribe, watch connectivity. A second call while running is a no-op.
    ///
    /// An unreachable remote does not fail the start: the hook and the
    /// network watch stay installed and the subscription is retried when the
    /// host comes back online.
    #[instrument(skip(self), fields(user = %self.user_id))]
    pub async fn start(self: &Arc<Self>) -> Result<(), SyncError> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.running {
                debug!("Cloud sync already running");
                return Ok(());
            }
            lifecycle.running = true;
            if lifecycle.cancellation.is_cancelled() {
                lifecycle.cancellation = CancellationToken::new();
            }
        }

        info!(session = %self.session_id, "Starting cloud sync");

        if let Err(err) = self.flush_pending_queue().await {
            warn!(error = %err, "Initial queue flush failed");
        }
        if let Err(err) = self.full_sync().await {
            warn!(error = %err, "Initial full sync failed");
        }
        self.install_local_change_hook();
        self.watch_network();
        if let Err(err) = self.start_realtime().await {
            warn!(error = %err, "Realtime subscription failed; will retry on reconnect");
        }

        info!("Cloud sync started");
        Ok(())
    }

    /// Sign-out: cancel background work and wait for it to finish.
    #[instrument(skip(self), fields(user = %self.user_id))]
    pub async fn stop(&self) -> Result<(), SyncError> {
        let tasks = {
            let mut lifecycle = self.lifecycle.lock();
            if !lifecycle.running && lifecycle.tasks.is_empty() {
                return Ok(());
            }
            lifecycle.running = false;
            lifecycle.cancellation.cancel();
            std::mem::take(&mut lifecycle.tasks)
        };

        self.debouncer.cancel();
        {
            let mut markers = self.markers.lock();
            markers.hook_installed = false;
            markers.realtime_active = false;
        }

        let join_timeout = self.config.join_timeout();
        let mut timed_out = false;
        for handle in tasks {
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Sync task panicked: {}", e),
                Err(_) => {
                    warn!("Sync task did not complete within timeout");
                    timed_out = true;
                }
            }
        }

        info!("Cloud sync stopped");
        if timed_out {
            return Err(SyncError::Timeout(join_timeout));
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.lock().running
    }

    pub fn status(&self) -> SyncStatus {
        let running = self.is_running();
        let markers = self.markers.lock();
        SyncStatus {
            user_id: self.user_id.clone(),
            running,
            hook_installed: markers.hook_installed,
            realtime_active: markers.realtime_active,
            pending_writes: self.queue.len(),
            last_pushed_at: markers.last_pushed_at,
            last_remote_seen: markers.last_remote_seen,
        }
    }

    fn is_online(&self) -> bool {
        self.network.as_ref().map_or(true, |network| network.is_online())
    }

    async fn with_timeout<T>(
        &self,
        request: impl Future<Output = Result<T, SyncError>>,
    ) -> Result<T, SyncError> {
        let limit = self.config.request_timeout();
        tokio::time::timeout(limit, request).await.map_err(|_| SyncError::Timeout(limit))?
    }

    /// Merge-upsert `buckets` as one bundle stamped `now`.
    async fn upload(&self, buckets: BucketMap, now: i64) -> Result<(), SyncError> {
        let bundle = CloudBundle::new(buckets, now, self.session_id.as_str());

        // Recorded before the request: the notification of this very write
        // may arrive before the response does.
        {
            let mut markers = self.markers.lock();
            markers.last_pushed_at = Some(markers.last_pushed_at.map_or(now, |at| at.max(now)));
        }

        let stored = self.with_timeout(self.remote.merge_upsert(&self.user_id, &bundle)).await?;
        debug!(
            buckets = bundle.buckets.len(),
            last_synced = ?stored.last_synced,
            "Pushed bundle"
        );
        self.emit(SyncEvent::Pushed { client_updated_at: now });
        Ok(())
    }

    fn enqueue(&self, now: i64, buckets: BucketMap) -> Result<PushOutcome, SyncError> {
        let pending = self.queue.push(PendingWrite::new(now, buckets))?;
        debug!(pending, "Push queued");
        self.emit(SyncEvent::Queued { pending });
        Ok(PushOutcome::Queued { pending })
    }

    fn read_local_buckets(&self) -> BucketMap {
        let mut buckets = BucketMap::new();
        for bucket in Bucket::ALL {
            let key = self.keys.bucket(bucket);
            match self.store.get(&key) {
                Ok(Some(raw)) => match serde_json::from_str(&raw) {
                    Ok(value) => {
                        buckets.insert(bucket, value);
                    }
                    Err(err) => warn!(%bucket, error = %err, "Skipping malformed local bucket"),
                },
                Ok(None) => {}
                Err(err) => warn!(%bucket, error = %err, "Failed to read local bucket"),
            }
        }
        buckets
    }

    /// Write every non-null bucket of `bundle`; returns how many were written
    fn hydrate_buckets(&self, bundle: &CloudBundle) -> usize {
        let mut written = 0;
        for (bucket, value) in &bundle.buckets {
            if value.is_null() {
                continue;
            }
            let result = serde_json::to_string(value)
                .map_err(Into::into)
                .and_then(|raw| self.store.hydrate(&self.keys.bucket(*bucket), &raw));
            match result {
                Ok(()) => written += 1,
                Err(err) => warn!(%bucket, error = %err, "Failed to hydrate bucket"),
            }
        }
        written
    }

    fn advance_remote_seen(&self, client_updated_at: i64) {
        let mut markers = self.markers.lock();
        markers.last_remote_seen = Some(
            markers.last_remote_seen.map_or(client_updated_at, |seen| seen.max(client_updated_at)),
        );
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn on_local_change(self: &Arc<Self>, change: &StoreChange) {
        if change.kind != ChangeKind::User {
            return;
        }
        let Some(bucket) = self.keys.bucket_for(&change.key) else {
            return;
        };

        let delay = match change.scope {
            ChangeScope::Local => self.config.local_debounce(),
            ChangeScope::CrossProcess => self.config.cross_tab_debounce(),
        };
        debug!(%bucket, scope = ?change.scope, ?delay, "Bucket edited; push scheduled");
        self.schedule_push(delay);
    }

    fn schedule_push(self: &Arc<Self>, delay: Duration) {
        let engine = Arc::downgrade(self);
        self.debouncer.schedule(delay, move || async move {
            let Some(engine) = engine.upgrade() else {
                return;
            };
            if let Err(err) = engine.push_user_bundle(None).await {
                warn!(error = %err, "Debounced push failed");
            }
        });
    }

    fn watch_network(self: &Arc<Self>) {
        let Some(network) = &self.network else {
            return;
        };
        let online = network.subscribe();
        let engine = Arc::downgrade(self);
        let mut lifecycle = self.lifecycle.lock();
        let cancel = lifecycle.cancellation.clone();
        lifecycle.tasks.push(tokio::spawn(Self::network_loop(engine, online, cancel)));
    }

    async fn local_change_loop(
        engine: Weak<Self>,
        mut changes: BoxStream<'static, StoreChange>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Local change hook cancelled");
                    break;
                }
                change = changes.next() => {
                    let Some(change) = change else { break };
                    let Some(engine) = engine.upgrade() else { break };
                    engine.on_local_change(&change);
                }
            }
        }
    }

    async fn realtime_loop(
        engine: Weak<Self>,
        mut updates: BoxStream<'static, CloudBundle>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Realtime subscription cancelled");
                    break;
                }
                update = updates.next() => {
                    let Some(bundle) = update else {
                        warn!("Realtime subscription ended");
                        if let Some(engine) = engine.upgrade() {
                            engine.markers.lock().realtime_active = false;
                        }
                        break;
                    };
                    let Some(engine) = engine.upgrade() else { break };
                    let outcome = engine.apply_remote(&bundle);
                    debug!(?outcome, "Remote notification handled");
                }
            }
        }
    }

    async fn network_loop(
        engine: Weak<Self>,
        mut online: watch::Receiver<bool>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = online.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let is_online = *online.borrow_and_update();
                    if !is_online {
                        debug!("Host went offline");
                        continue;
                    }
                    let Some(engine) = engine.upgrade() else { break };
                    info!("Host back online; flushing pending writes");
                    if let Err(err) = engine.flush_pending_queue().await {
                        warn!(error = %err, "Flush after reconnect failed");
                    }
                    engine.resume_realtime().await;
                }
            }
        }
    }
}

impl Drop for CloudSyncEngine {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.get_mut();
        if lifecycle.running {
            warn!("CloudSyncEngine dropped while running; cancelling tasks");
            lifecycle.cancellation.cancel();
        }
    }
}
