//! Cancellable recurring timers
//!
//! Drives the timer display refresh: a wake-up every interval that only
//! re-renders, never accumulates time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A timer handle that can be used to cancel a timer
///
/// Cancelling is immediate: the background task is aborted, not merely told
/// to skip its next callback.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    task: Arc<parking_lot::Mutex<Option<JoinHandle<()>>>>,
}

impl TimerHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            task: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    /// Cancel the timer
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Check if the timer has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Create a recurring timer
///
/// The first callback runs one full `period` after creation. Ticks missed
/// while the process was suspended are skipped rather than replayed.
///
/// Must be called from within a tokio runtime.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use studysync_common::time::timer::recurring;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = recurring(Duration::from_secs(1), || {
///         tracing::debug!("tick");
///     });
///
///     tokio::time::sleep(Duration::from_secs(5)).await;
///     handle.cancel();
/// }
/// ```
pub fn recurring<F>(period: Duration, mut callback: F) -> TimerHandle
where
    F: FnMut() + Send + 'static,
{
    let handle = TimerHandle::new();
    let cancelled = Arc::clone(&handle.cancelled);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.tick().await; // Skip first immediate tick

        while !cancelled.load(Ordering::SeqCst) {
            interval.tick().await;
            if !cancelled.load(Ordering::SeqCst) {
                callback();
            }
        }
    });

    *handle.task.lock() = Some(task);
    handle
}
