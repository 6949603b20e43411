//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: polling assertions and timeouts for async tests
//!
//! Clock mocking lives in [`crate::time::clock`], since production code
//! accepts any [`crate::time::Clock`].

pub mod async_utils;

// Re-export commonly used items
// Note: Macros exported with #[macro_export] are available at crate root
pub use async_utils::{poll_until, timeout_ok};
