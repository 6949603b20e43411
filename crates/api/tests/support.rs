//! Shared fixtures for the app integration tests: several contexts (tabs)
//! of one profile, optionally on several devices of one user.

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use studysync_domain::{Config, InstanceId};
use studysync_infra::{ChannelHub, InMemoryDocumentStore, MemoryStore};
use studysync_lib::AppContext;

pub const SETTLE: Duration = Duration::from_secs(3);

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

/// Defaults with debounce windows short enough for real-time tests
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.sync.local_debounce_ms = 40;
    config.sync.cross_tab_debounce_ms = 80;
    config.sync.request_timeout_ms = 2_000;
    config.sync.join_timeout_ms = 1_000;
    config
}

/// One browser profile on one device: a store origin and a channel shared
/// by every tab opened on it
pub struct Profile {
    pub store: MemoryStore,
    pub hub: ChannelHub,
    pub remote: Arc<InMemoryDocumentStore>,
}

impl Profile {
    pub fn new(remote: Arc<InMemoryDocumentStore>) -> Self {
        Self { store: MemoryStore::new(), hub: ChannelHub::default(), remote }
    }

    /// Open a tab on this profile
    pub async fn open_tab(&self, name: &str) -> AppContext {
        AppContext::builder(fast_config())
            .store(Arc::new(self.store.sibling()))
            .channel(self.hub.clone())
            .remote(self.remote.clone())
            .instance_id(InstanceId::from(name))
            .build()
            .await
            .expect("context starts")
    }
}
