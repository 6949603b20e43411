//! Shared fixtures for the infra integration tests: simulated tabs of one
//! profile and simulated devices of one user.

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use studysync_common::time::{Clock, SystemClock};
use studysync_core::{
    CloudSyncEngine, LocalStore, NetworkMonitor, RemoteDocumentStore, ReplicationBus,
    StorageEventTransport, StoreKeys, TimerService,
};
use studysync_domain::{Bucket, InstanceId, SyncConfig, TimerConfig};
use studysync_infra::{select_transport, ChannelHub, MemoryStore, NetworkStatus};

pub const SETTLE: Duration = Duration::from_secs(3);

/// Route test logs through the fmt subscriber once per test binary
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Debounce windows short enough for real-time tests
pub fn fast_sync_config() -> SyncConfig {
    SyncConfig {
        local_debounce_ms: 40,
        cross_tab_debounce_ms: 80,
        request_timeout_ms: 2_000,
        join_timeout_ms: 1_000,
        ..SyncConfig::default()
    }
}

/// One process of a profile with a replicated timer
pub struct Tab {
    pub store: MemoryStore,
    pub timer: Arc<TimerService>,
    pub bus: ReplicationBus,
}

impl Tab {
    /// Open a tab on `store`'s origin, replicating over `hub` (or store
    /// events when the hub is unavailable), and start its bus.
    pub async fn open(store: MemoryStore, hub: &ChannelHub, name: &str) -> Self {
        let keys = StoreKeys::default();
        let shared: Arc<dyn LocalStore> = Arc::new(store.clone());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let timer = Arc::new(TimerService::new(
            Arc::clone(&shared),
            clock,
            InstanceId::from(name),
            &keys,
            &TimerConfig::default(),
        ));

        let primary = select_transport(hub, Arc::clone(&shared), &keys);
        let storage = Arc::new(StorageEventTransport::new(shared, &keys));
        let mut bus =
            ReplicationBus::new(Arc::clone(&timer), primary, storage, Duration::from_secs(1));
        bus.start().await.expect("bus starts");

        Self { store, timer, bus }
    }

    pub async fn close(mut self) {
        self.bus.stop().await.expect("bus stops");
        self.timer.shutdown();
    }
}

/// One signed-in device (or tab) running cloud sync
pub struct Device {
    pub store: MemoryStore,
    pub engine: Arc<CloudSyncEngine>,
    pub network: Arc<NetworkStatus>,
}

impl Device {
    pub fn new(store: MemoryStore, remote: Arc<dyn RemoteDocumentStore>, user_id: &str) -> Self {
        let network = Arc::new(NetworkStatus::default());
        let engine = CloudSyncEngine::new(
            user_id,
            Arc::new(store.clone()),
            remote,
            Arc::new(SystemClock),
            StoreKeys::default(),
            fast_sync_config(),
        )
        .with_network_monitor(Arc::clone(&network) as Arc<dyn NetworkMonitor>);

        Self { store, engine: Arc::new(engine), network }
    }

    pub fn edit(&self, bucket: Bucket, value: serde_json::Value) {
        let key = StoreKeys::default().bucket(bucket);
        self.store.set(&key, &value.to_string()).expect("bucket write");
    }

    pub fn bucket(&self, bucket: Bucket) -> Option<serde_json::Value> {
        let key = StoreKeys::default().bucket(bucket);
        self.store
            .get(&key)
            .expect("bucket read")
            .map(|raw| serde_json::from_str(&raw).expect("bucket json"))
    }
}
