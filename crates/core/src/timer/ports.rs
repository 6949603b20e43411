//! Port interfaces for cross-process timer replication

use std::fmt;

use futures::stream::BoxStream;
use studysync_domain::{ChannelMessage, Result};

/// Which mechanism carries replication messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Ephemeral profile-scoped pub/sub channel
    BroadcastChannel,
    /// Change notifications of the persistent local store
    StorageEvent,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BroadcastChannel => f.write_str("broadcast-channel"),
            Self::StorageEvent => f.write_str("storage-event"),
        }
    }
}

/// One way of fanning timer messages out to sibling processes
pub trait ReplicationTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Send `message` to every sibling. Delivery is best effort.
    fn publish(&self, message: &ChannelMessage) -> Result<()>;

    /// Messages from siblings (and possibly this process's own echoes)
    fn subscribe(&self) -> BoxStream<'static, ChannelMessage>;
}
