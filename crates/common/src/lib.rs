//! Common utilities shared across StudySync crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: wall-clock abstraction and display formatting
//! - `runtime`: tokio timers and the debouncer
//! - `test-utils`: async assertions for integration tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use time::{Debouncer, TimerHandle};
#[cfg(feature = "foundation")]
pub use time::{Clock, MockClock, SystemClock};
