//! Wall-clock abstraction for testability
//!
//! Timer state and cloud bundles are stamped with wall-clock milliseconds.
//! Production code reads [`SystemClock`]; tests drive a [`MockClock`] so
//! elapsed-time and last-write-wins scenarios are deterministic.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use studysync_common::time::{Clock, MockClock, SystemClock};
//!
//! // Use system clock in production
//! let clock = SystemClock;
//! assert!(clock.timestamp_ms() > 0);
//!
//! // Use mock clock in tests
//! let mock = MockClock::at_millis(10_000);
//! mock.advance(Duration::from_millis(250));
//! assert_eq!(mock.timestamp_ms(), 10_250);
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Trait for wall-clock reads
pub trait Clock: Send + Sync {
    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Milliseconds since the UNIX epoch, as stored in timer and bundle
    /// records. A clock set before 1970 reads as zero.
    fn timestamp_ms(&self) -> i64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or_default()
    }
}

/// Real system clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Mock clock for deterministic testing
///
/// Cloned clocks share the same time, so one handle can be given to the code
/// under test while the test advances another.
#[derive(Debug, Clone)]
pub struct MockClock {
    millis: Arc<Mutex<i64>>,
}

impl MockClock {
    /// Create a mock clock starting at the current real time
    pub fn new() -> Self {
        Self::at_millis(SystemClock.timestamp_ms())
    }

    /// Create a mock clock starting at an explicit epoch timestamp
    pub fn at_millis(millis: i64) -> Self {
        Self { millis: Arc::new(Mutex::new(millis)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        let step = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        let mut millis = self.millis.lock();
        *millis = millis.saturating_add(step);
    }

    /// Move the clock to an absolute timestamp, backwards included
    pub fn set_millis(&self, millis: i64) {
        *self.millis.lock() = millis;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn system_time(&self) -> SystemTime {
        let millis = u64::try_from(*self.millis.lock()).unwrap_or(0);
        UNIX_EPOCH + Duration::from_millis(millis)
    }

    fn timestamp_ms(&self) -> i64 {
        *self.millis.lock()
    }
}
