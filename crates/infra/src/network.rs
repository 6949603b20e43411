//! Host connectivity signal

use studysync_core::NetworkMonitor;
use tokio::sync::watch;
use tracing::info;

/// Connectivity flag fed by the host (or a test)
pub struct NetworkStatus {
    online: watch::Sender<bool>,
}

impl NetworkStatus {
    pub fn new(online: bool) -> Self {
        let (online, _) = watch::channel(online);
        Self { online }
    }

    /// Record a connectivity change; unchanged values are not re-announced
    pub fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if changed {
            info!(online, "Network connectivity changed");
        }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NetworkMonitor for NetworkStatus {
    fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }
}
