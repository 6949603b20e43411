//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Local store layout
pub const DEFAULT_STORE_PREFIX: &str = "studysync";
pub const TIMER_STATE_KEY_SUFFIX: &str = "timerState";
pub const PENDING_WRITES_KEY_SUFFIX: &str = "pendingWrites";
pub const BUCKET_KEY_SEGMENT: &str = "bucket";

// Timer display
pub const DEFAULT_DISPLAY_REFRESH_MS: u64 = 1_000;

// Cloud sync debounce windows
pub const LOCAL_EDIT_DEBOUNCE_MS: u64 = 800;
pub const CROSS_TAB_EDIT_DEBOUNCE_MS: u64 = 1_200;

// Remote transport
pub const DEFAULT_REMOTE_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 5_000;

// Channel capacity for in-memory broadcast hubs
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Sender id used for states that arrive through the store change path,
/// where the writing process is unknown.
pub const STORAGE_SENDER_ID: &str = "storage";
