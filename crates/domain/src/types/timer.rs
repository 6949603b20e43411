//! Study timer state
//!
//! The timer never counts ticks. Elapsed time is always derived from
//! wall-clock timestamps, so a suspended process picks up the right value
//! the moment it wakes.

use serde::{Deserialize, Serialize};
use thiserror::Error;
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

/// Lifecycle of the current session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    Paused,
}

crate::impl_domain_status_conversions!(TimerPhase {
    Idle => "idle",
    Running => "running",
    Paused => "paused",
});

/// TimerState - the single replicated timer record of a browser profile
///
/// All timestamps are milliseconds since the Unix epoch. `last_updated` is
/// the logical clock used for last-write-wins between replicas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct TimerState {
    pub phase: TimerPhase,
    #[cfg_attr(feature = "ts-gen", ts(type = "number | null"))]
    pub start_time: Option<i64>,
    #[cfg_attr(feature = "ts-gen", ts(type = "number | null"))]
    pub session_start_time: Option<i64>,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub elapsed_before_pause: u64,
    pub session_id: Option<String>,
    pub current_tag: String,
    pub current_notes: String,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub last_updated: i64,
}

impl TimerState {
    /// Elapsed milliseconds of the current session at `now`.
    ///
    /// Clock skew backwards (`now < start_time`) counts as zero for the
    /// running interval rather than subtracting from paused time.
    pub fn elapsed_ms(&self, now: i64) -> u64 {
        match (self.phase, self.start_time) {
            (TimerPhase::Running, Some(start)) => {
                self.elapsed_before_pause.saturating_add(running_interval_ms(start, now))
            }
            (TimerPhase::Running, None) | (TimerPhase::Paused, _) => self.elapsed_before_pause,
            (TimerPhase::Idle, _) => 0,
        }
    }

    /// Last-write-wins acceptance test: strictly newer only.
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.last_updated > other.last_updated
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn is_idle(&self) -> bool {
        self.phase == TimerPhase::Idle
    }

    /// A running timer has a `start_time`; paused and idle timers do not.
    pub fn is_consistent(&self) -> bool {
        self.start_time.is_some() == self.is_running()
    }
}

/// `max(0, now - start)` in milliseconds
pub fn running_interval_ms(start: i64, now: i64) -> u64 {
    u64::try_from(now.saturating_sub(start)).unwrap_or(0)
}

/// Reason a session transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum TransitionError {
    #[error("a session is already in progress")]
    AlreadyRunning,
    #[error("the timer is not running")]
    NotRunning,
    #[error("the timer is not paused")]
    NotPaused,
}

impl TransitionError {
    /// Stable wire label (`already-running`, `not-running`, `not-paused`)
    pub fn reason(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "already-running",
            Self::NotRunning => "not-running",
            Self::NotPaused => "not-paused",
        }
    }
}

/// Result of stopping a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct StopOutcome {
    pub ok: bool,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub duration_seconds: u64,
    #[cfg_attr(feature = "ts-gen", ts(type = "number | null"))]
    pub session_start_time: Option<i64>,
    pub session_id: Option<String>,
    /// Tag and notes of the stopped session
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub notes: String,
}

impl StopOutcome {
    /// Stop requested while idle: nothing to report.
    pub fn noop() -> Self {
        Self {
            ok: false,
            duration_seconds: 0,
            session_start_time: None,
            session_id: None,
            tag: String::new(),
            notes: String::new(),
        }
    }
}

/// Value pushed to the display on every refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct TimerDisplay {
    pub phase: TimerPhase,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub elapsed_ms: u64,
}

/// One finished session, as stored in the `timer-sessions` bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    pub id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub duration_seconds: u64,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub notes: String,
}
