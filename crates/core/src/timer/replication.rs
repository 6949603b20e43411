//! Local replication bus with explicit lifecycle management.
//!
//! Keeps the timer of every process of one profile converged. Inbound
//! messages from the primary transport and, when the primary is the
//! broadcast channel, from the storage fallback are merged into one stream;
//! each carried state is adopted only if its logical version is strictly
//! newer than ours, so duplicates and reordering are harmless.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use studysync_domain::{ChannelMessage, StudySyncError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::ports::{ReplicationTransport, TransportKind};
use super::service::TimerService;

/// Replication bus bound to one timer service
pub struct ReplicationBus {
    timer: Arc<TimerService>,
    primary: Arc<dyn ReplicationTransport>,
    fallback: Option<Arc<dyn ReplicationTransport>>,
    join_timeout: Duration,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl ReplicationBus {
    /// `storage` is listened to in addition to `primary` unless `primary` is
    /// already the storage transport.
    pub fn new(
        timer: Arc<TimerService>,
        primary: Arc<dyn ReplicationTransport>,
        storage: Arc<dyn ReplicationTransport>,
        join_timeout: Duration,
    ) -> Self {
        let fallback = (primary.kind() != TransportKind::StorageEvent).then_some(storage);
        Self {
            timer,
            primary,
            fallback,
            join_timeout,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.primary.kind()
    }

    /// Subscribe, announce ourselves with `request-sync`, and start applying
    /// sibling state.
    #[instrument(skip(self), fields(instance = %self.timer.instance_id()))]
    pub async fn start(&mut self) -> Result<(), StudySyncError> {
        if self.is_running() {
            return Err(StudySyncError::Internal("Replication bus already running".to_string()));
        }

        self.cancellation = CancellationToken::new();

        // Subscribe before announcing so no reply is missed
        let inbound: BoxStream<'static, ChannelMessage> = match &self.fallback {
            Some(fallback) => stream::select(self.primary.subscribe(), fallback.subscribe()).boxed(),
            None => self.primary.subscribe(),
        };

        self.timer.attach_transport(Arc::clone(&self.primary));

        let timer = Arc::clone(&self.timer);
        let primary = Arc::clone(&self.primary);
        let cancel = self.cancellation.clone();
        self.task_handle = Some(tokio::spawn(async move {
            Self::receive_loop(timer, primary, inbound, cancel).await;
        }));

        let hello = ChannelMessage::RequestSync { sender_id: self.timer.instance_id().clone() };
        if let Err(err) = self.primary.publish(&hello) {
            warn!(error = %err, "Failed to request sibling state");
        }

        info!(
            transport = %self.primary.kind(),
            fallback = self.fallback.is_some(),
            "Replication bus started"
        );
        Ok(())
    }

    /// Stop listening and detach the timer from the transport.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), StudySyncError> {
        if !self.is_running() {
            return Err(StudySyncError::Internal("Replication bus not running".to_string()));
        }

        self.cancellation.cancel();
        self.timer.detach_transport();

        if let Some(handle) = self.task_handle.take() {
            match tokio::time::timeout(self.join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Replication task panicked: {}", e);
                    return Err(StudySyncError::Internal("Replication task panicked".to_string()));
                }
                Err(_) => {
                    warn!("Replication task did not complete within timeout");
                    return Err(StudySyncError::Internal("Replication task timeout".to_string()));
                }
            }
        }

        info!("Replication bus stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn receive_loop(
        timer: Arc<TimerService>,
        primary: Arc<dyn ReplicationTransport>,
        mut inbound: BoxStream<'static, ChannelMessage>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Replication receive loop cancelled");
                    break;
                }
                message = inbound.next() => {
                    let Some(message) = message else {
                        debug!("Replication transports closed");
                        break;
                    };
                    Self::handle_message(&timer, primary.as_ref(), message);
                }
            }
        }
    }

    fn handle_message(
        timer: &TimerService,
        primary: &dyn ReplicationTransport,
        message: ChannelMessage,
    ) {
        if message.sender_id() == timer.instance_id() {
            return;
        }

        match message {
            ChannelMessage::SyncState { sender_id, state } => {
                if timer.adopt_external(state) {
                    debug!(sender = %sender_id, "Applied sibling timer state");
                }
            }
            ChannelMessage::RequestSync { sender_id } => {
                debug!(sender = %sender_id, "Answering sibling sync request");
                let reply = ChannelMessage::SyncState {
                    sender_id: timer.instance_id().clone(),
                    state: timer.state(),
                };
                if let Err(err) = primary.publish(&reply) {
                    warn!(error = %err, "Failed to answer sync request");
                }
            }
        }
    }
}

impl Drop for ReplicationBus {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("ReplicationBus dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
