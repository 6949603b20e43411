//! Time utilities and abstractions
//!
//! - **[`clock`]**: real and mock wall clocks
//! - **[`format`]**: stopwatch-style display formatting
//! - **[`timer`]**: cancellable recurring timers (runtime tier)
//! - **[`debounce`]**: trailing-edge debouncing (runtime tier)
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use studysync_common::time::{format_clock, Clock, MockClock};
//!
//! let clock = MockClock::at_millis(1_000);
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.timestamp_ms(), 6_000);
//! assert_eq!(format_clock(3_725_000), "01:02:05");
//! ```

pub mod clock;
#[cfg(feature = "runtime")]
pub mod debounce;
pub mod format;
#[cfg(feature = "runtime")]
pub mod timer;

// Re-export commonly used items
pub use clock::{Clock, MockClock, SystemClock};
#[cfg(feature = "runtime")]
pub use debounce::Debouncer;
pub use format::format_clock;
#[cfg(feature = "runtime")]
pub use timer::{recurring, TimerHandle};
