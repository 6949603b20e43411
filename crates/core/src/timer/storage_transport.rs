//! Replication over the persistent store's change notifications
//!
//! Always available: the store is shared by every process of the origin and
//! announces writes to siblings. It doubles as the fallback path when the
//! broadcast channel exists, since it also reaches processes that missed an
//! ephemeral message.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use studysync_domain::{ChannelMessage, InstanceId, Result, TimerState};
use tracing::{debug, warn};

use super::ports::{ReplicationTransport, TransportKind};
use crate::store::{ChangeScope, LocalStore, StoreKeys};

pub struct StorageEventTransport {
    store: Arc<dyn LocalStore>,
    state_key: String,
}

impl StorageEventTransport {
    pub fn new(store: Arc<dyn LocalStore>, keys: &StoreKeys) -> Self {
        Self { store, state_key: keys.timer_state() }
    }
}

impl ReplicationTransport for StorageEventTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::StorageEvent
    }

    /// Writes published state to the timer key. A `request-sync` needs no
    /// message here: the store already holds the latest written state.
    fn publish(&self, message: &ChannelMessage) -> Result<()> {
        match message {
            ChannelMessage::SyncState { state, .. } => {
                let raw = serde_json::to_string(state)?;
                self.store.set(&self.state_key, &raw)
            }
            ChannelMessage::RequestSync { .. } => Ok(()),
        }
    }

    fn subscribe(&self) -> BoxStream<'static, ChannelMessage> {
        let state_key = self.state_key.clone();
        self.store
            .subscribe()
            .filter_map(move |change| {
                let message = if change.scope == ChangeScope::CrossProcess && change.key == state_key
                {
                    change.value.and_then(|raw| decode_state(&raw))
                } else {
                    None
                };
                futures::future::ready(message)
            })
            .boxed()
    }
}

fn decode_state(raw: &str) -> Option<ChannelMessage> {
    match serde_json::from_str::<TimerState>(raw) {
        Ok(state) => {
            debug!(version = state.last_updated, "Timer state changed in sibling process");
            Some(ChannelMessage::SyncState { sender_id: InstanceId::storage(), state })
        }
        Err(err) => {
            warn!(error = %err, "Ignoring malformed timer state from store event");
            None
        }
    }
}
