//! Async testing utilities
//!
//! Replication and cloud sync settle through background tasks, so tests wait
//! on observable state instead of sleeping a fixed amount. Every helper here
//! measures time with [`tokio::time::Instant`], which keeps them usable under
//! `#[tokio::test(start_paused = true)]`.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::future::Future;
use std::time::Duration;

/// Assert that an async condition becomes true within a timeout
///
/// The condition expression is re-evaluated (and awaited) every 10ms.
///
/// # Examples
///
/// ```no_run
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[tokio::test]
/// async fn test_eventually() {
///     let flag = Arc::new(AtomicBool::new(false));
///     let flag_clone = flag.clone();
///
///     tokio::spawn(async move {
///         tokio::time::sleep(Duration::from_millis(100)).await;
///         flag_clone.store(true, Ordering::SeqCst);
///     });
///
///     studysync_common::assert_eventually_async!(Duration::from_secs(1), async {
///         flag.load(Ordering::SeqCst)
///     });
/// }
/// ```
#[macro_export]
macro_rules! assert_eventually_async {
    ($timeout:expr, $fut:expr) => {{
        let timeout_duration = $timeout;
        let settled = tokio::time::timeout(timeout_duration, async {
            loop {
                if $fut.await {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;

        assert!(settled.is_ok(), "Condition did not become true within {:?}", timeout_duration);
    }};
}

/// Await `fut`, failing with `Elapsed` if it takes longer than `duration`
///
/// Handy for draining a replication stream without hanging the test when no
/// message arrives.
pub async fn timeout_ok<F, T>(duration: Duration, fut: F) -> Result<T, tokio::time::error::Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut).await
}

/// Poll `condition` every `interval` until it returns true or `timeout`
/// passes. Returns whether the condition was met.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use studysync_common::testing::poll_until;
///
/// #[tokio::test]
/// async fn test_poll() {
///     let met = poll_until(Duration::from_secs(1), Duration::from_millis(10), || async {
///         true
///     })
///     .await;
///     assert!(met);
/// }
/// ```
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}
