//! Profile-scoped broadcast channel transport
//!
//! A [`ChannelHub`] stands for the named pub/sub channel every process of a
//! profile can open. Messages travel as JSON text, so a sibling running a
//! different build sees the same wire shape.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use studysync_core::utils::broadcast_stream;
use studysync_core::{
    LocalStore, ReplicationTransport, StorageEventTransport, StoreKeys, TransportKind,
};
use studysync_domain::constants::DEFAULT_CHANNEL_CAPACITY;
use studysync_domain::{ChannelMessage, Result};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// The shared channel, or its absence on hosts without one
#[derive(Clone)]
pub struct ChannelHub {
    sender: Option<broadcast::Sender<String>>,
}

impl ChannelHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender: Some(sender) }
    }

    /// A host where the channel facility does not exist
    pub fn unavailable() -> Self {
        Self { sender: None }
    }

    pub fn is_available(&self) -> bool {
        self.sender.is_some()
    }

    /// Open a transport on the channel, `None` if the facility is missing
    pub fn open(&self) -> Option<BroadcastChannelTransport> {
        self.sender.clone().map(|sender| BroadcastChannelTransport { sender })
    }

    /// Post raw text, as a misbehaving sibling might
    pub fn post_raw(&self, payload: impl Into<String>) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(payload.into());
        }
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// One process's endpoint on a [`ChannelHub`]
pub struct BroadcastChannelTransport {
    sender: broadcast::Sender<String>,
}

impl ReplicationTransport for BroadcastChannelTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::BroadcastChannel
    }

    fn publish(&self, message: &ChannelMessage) -> Result<()> {
        let payload = serde_json::to_string(message)?;
        if self.sender.send(payload).is_err() {
            debug!(kind = message.kind(), "No channel listeners for message");
        }
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, ChannelMessage> {
        broadcast_stream(self.sender.subscribe())
            .filter_map(|payload| {
                let message = match serde_json::from_str::<ChannelMessage>(&payload) {
                    Ok(message) => Some(message),
                    Err(err) => {
                        warn!(error = %err, "Dropping undecodable channel message");
                        None
                    }
                };
                futures::future::ready(message)
            })
            .boxed()
    }
}

/// Pick the primary transport: the broadcast channel when the host has one,
/// otherwise the store's change notifications.
pub fn select_transport(
    hub: &ChannelHub,
    store: Arc<dyn LocalStore>,
    keys: &StoreKeys,
) -> Arc<dyn ReplicationTransport> {
    match hub.open() {
        Some(channel) => Arc::new(channel),
        None => {
            info!("Broadcast channel unavailable; replicating through store events");
            Arc::new(StorageEventTransport::new(store, keys))
        }
    }
}
