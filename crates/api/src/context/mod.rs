//! Application context - dependency injection container
//!
//! One `AppContext` is one running process (tab) of a profile. It owns the
//! timer service and its replication bus for the whole process lifetime, and
//! a cloud sync engine only while a user is signed in.

use std::sync::Arc;

use studysync_common::time::{Clock, SystemClock};
use studysync_core::{
    CloudSyncEngine, LocalStore, NetworkMonitor, RemoteDocumentStore, ReplicationBus,
    StorageEventTransport, StoreKeys, TimerService, TransportKind,
};
use studysync_domain::{Config, InstanceId, Result, StudySyncError, SyncError};
use studysync_infra::{
    select_transport, ChannelHub, FileStore, HttpDocumentStore, HttpDocumentStoreConfig,
    InMemoryDocumentStore, MemoryStore, NetworkStatus,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Environment variable holding the bearer token of the remote API
const API_TOKEN_ENV: &str = "STUDYSYNC_API_TOKEN";

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub keys: StoreKeys,
    pub instance_id: InstanceId,
    pub store: Arc<dyn LocalStore>,
    pub clock: Arc<dyn Clock>,
    pub timer: Arc<TimerService>,
    pub network: Arc<NetworkStatus>,
    remote: Arc<dyn RemoteDocumentStore>,
    replication: Mutex<ReplicationBus>,
    sync: Mutex<Option<Arc<CloudSyncEngine>>>,
}

impl AppContext {
    /// Load configuration from the standard locations and start the context
    pub async fn new() -> Result<Self> {
        let config = studysync_infra::config::load()?;
        Self::new_with_config(config).await
    }

    /// Start a context with its own store, channel and remote, chosen from
    /// `config`
    pub async fn new_with_config(config: Config) -> Result<Self> {
        Self::builder(config).build().await
    }

    /// Builder for contexts that share collaborators, e.g. sibling tabs of
    /// one profile
    pub fn builder(config: Config) -> AppContextBuilder {
        AppContextBuilder::new(config)
    }

    /// Mechanism carrying timer replication for this process
    pub async fn transport_kind(&self) -> TransportKind {
        self.replication.lock().await.transport_kind()
    }

    /// Engine of the signed-in user, if any
    pub async fn sync_engine(&self) -> Option<Arc<CloudSyncEngine>> {
        self.sync.lock().await.clone()
    }

    pub async fn current_user(&self) -> Option<String> {
        self.sync.lock().await.as_ref().map(|engine| engine.user_id().to_string())
    }

    /// Start cloud sync for `user_id`.
    ///
    /// Signing in as the user already signed in is a no-op; signing in as
    /// someone else signs the previous user out first. With sync disabled in
    /// the configuration nothing is started.
    pub async fn sign_in(&self, user_id: &str) -> std::result::Result<(), SyncError> {
        if !self.config.sync.enabled {
            info!(user_id, "Cloud sync disabled; sign-in keeps data local");
            return Ok(());
        }

        let mut slot = self.sync.lock().await;
        if let Some(engine) = slot.as_ref() {
            if engine.user_id() == user_id {
                return Ok(());
            }
            let previous = Arc::clone(engine);
            *slot = None;
            info!(previous = previous.user_id(), "Switching user; stopping previous sync");
            if let Err(err) = previous.stop().await {
                warn!(error = %err, "Previous sync engine did not stop cleanly");
            }
        }

        let engine = Arc::new(
            CloudSyncEngine::new(
                user_id,
                Arc::clone(&self.store),
                Arc::clone(&self.remote),
                Arc::clone(&self.clock),
                self.keys.clone(),
                self.config.sync.clone(),
            )
            .with_network_monitor(Arc::clone(&self.network) as Arc<dyn NetworkMonitor>)
            .with_session_id(self.instance_id.clone()),
        );

        if let Err(err) = engine.start().await {
            warn!(user_id, error = %err, "Cloud sync failed to start");
            if let Err(stop_err) = engine.stop().await {
                warn!(error = %stop_err, "Failed to tear down half-started sync");
            }
            return Err(err);
        }

        *slot = Some(engine);
        info!(user_id, instance = %self.instance_id, "Signed in");
        Ok(())
    }

    /// Stop cloud sync. Local data stays in the store.
    pub async fn sign_out(&self) -> std::result::Result<(), SyncError> {
        let Some(engine) = self.sync.lock().await.take() else {
            return Ok(());
        };
        info!(user_id = engine.user_id(), "Signing out");
        engine.stop().await
    }

    /// Stop sync, replication and the display ticker
    pub async fn shutdown(&self) {
        if let Err(err) = self.sign_out().await {
            warn!(error = %err, "Sign-out during shutdown failed");
        }

        let mut bus = self.replication.lock().await;
        if bus.is_running() {
            if let Err(err) = bus.stop().await {
                warn!(error = %err, "Replication bus did not stop cleanly");
            }
        }
        self.timer.shutdown();
        info!(instance = %self.instance_id, "Context shut down");
    }
}

/// Builder for [`AppContext`].
pub struct AppContextBuilder {
    config: Config,
    store: Option<Arc<dyn LocalStore>>,
    channel: Option<ChannelHub>,
    remote: Option<Arc<dyn RemoteDocumentStore>>,
    clock: Option<Arc<dyn Clock>>,
    network: Option<Arc<NetworkStatus>>,
    instance_id: Option<InstanceId>,
}

impl AppContextBuilder {
    fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            channel: None,
            remote: None,
            clock: None,
            network: None,
            instance_id: None,
        }
    }

    /// Store handle of this process; defaults to the configured file store or
    /// a fresh in-memory origin
    pub fn store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Profile channel shared with sibling processes
    pub fn channel(mut self, hub: ChannelHub) -> Self {
        self.channel = Some(hub);
        self
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteDocumentStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn network(mut self, network: Arc<NetworkStatus>) -> Self {
        self.network = Some(network);
        self
    }

    pub fn instance_id(mut self, id: InstanceId) -> Self {
        self.instance_id = Some(id);
        self
    }

    /// Wire the services and start replication
    ///
    /// # Errors
    /// Returns `StudySyncError` if the store cannot be opened, the remote
    /// URL is invalid, or the replication bus fails to start.
    pub async fn build(self) -> Result<AppContext> {
        let config = self.config;
        let keys = StoreKeys::new(config.store.key_prefix.clone());
        let instance_id = self.instance_id.unwrap_or_default();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let network = self.network.unwrap_or_default();

        let store = match self.store {
            Some(store) => store,
            None => open_store(&config)?,
        };
        let remote = match self.remote {
            Some(remote) => remote,
            None => build_remote(&config)?,
        };

        let timer = Arc::new(TimerService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            instance_id.clone(),
            &keys,
            &config.timer,
        ));

        let hub = self.channel.unwrap_or_default();
        let primary = select_transport(&hub, Arc::clone(&store), &keys);
        let storage = Arc::new(StorageEventTransport::new(Arc::clone(&store), &keys));
        let mut replication = ReplicationBus::new(
            Arc::clone(&timer),
            primary,
            storage,
            config.sync.join_timeout(),
        );
        replication.start().await?;

        info!(
            instance = %instance_id,
            transport = %replication.transport_kind(),
            prefix = keys.prefix(),
            "Application context ready"
        );

        Ok(AppContext {
            config,
            keys,
            instance_id,
            store,
            clock,
            timer,
            network,
            remote,
            replication: Mutex::new(replication),
            sync: Mutex::new(None),
        })
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn LocalStore>> {
    match &config.store.path {
        Some(path) => Ok(Arc::new(FileStore::open(path)?)),
        None => {
            info!("No store path configured; data lives in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_remote(config: &Config) -> Result<Arc<dyn RemoteDocumentStore>> {
    match &config.sync.remote_url {
        Some(url) => {
            let token = std::env::var(API_TOKEN_ENV).ok().filter(|token| !token.is_empty());
            let remote_config = HttpDocumentStoreConfig::from_sync_config(url.as_str(), &config.sync)
                .with_api_token(token);
            let remote = HttpDocumentStore::new(remote_config)
                .map_err(|err| StudySyncError::Config(err.to_string()))?;
            info!(url = %url, "Using HTTP remote document store");
            Ok(Arc::new(remote))
        }
        None => {
            info!("No remote URL configured; using in-memory document store");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
    }
}
