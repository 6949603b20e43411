//! Trailing-edge debouncing
//!
//! Every [`Debouncer::schedule`] call restarts the quiet period; the action
//! of the last call runs once the period elapses without another call.
//! An action that has already started is never aborted by a reschedule, so
//! an in-flight network write always runs to completion.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::trace;

struct Pending {
    fired: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Collapses bursts of triggers into one delayed action
#[derive(Default)]
pub struct Debouncer {
    pending: Mutex<Option<Pending>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to run after `delay`, replacing any action that is
    /// still waiting.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    ///
    /// use studysync_common::time::Debouncer;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let debouncer = Debouncer::new();
    ///     for _ in 0..10 {
    ///         debouncer.schedule(Duration::from_millis(800), || async {
    ///             // runs once, 800ms after the last call
    ///         });
    ///     }
    /// }
    /// ```
    pub fn schedule<F, Fut>(&self, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.pending.lock();
        if let Some(previous) = slot.take() {
            if !previous.fired.load(Ordering::SeqCst) {
                trace!("debounce window restarted");
                previous.task.abort();
            }
        }

        let fired = Arc::new(AtomicBool::new(false));
        let fired_flag = Arc::clone(&fired);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fired_flag.store(true, Ordering::SeqCst);
            action().await;
        });

        *slot = Some(Pending { fired, task });
    }

    /// Drop the waiting action, if any. An action already running is left
    /// to finish.
    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            if !pending.fired.load(Ordering::SeqCst) {
                pending.task.abort();
            }
        }
    }

    /// True while an action is waiting for its quiet period to end
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|pending| !pending.fired.load(Ordering::SeqCst))
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
