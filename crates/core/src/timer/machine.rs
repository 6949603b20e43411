//! Pure session transitions
//!
//! Each function takes the current state and the wall-clock reading and
//! returns the next state, stamped with a fresh logical version. Nothing here
//! touches the store or the replication bus, and a refused transition leaves
//! the caller's state untouched.

use studysync_domain::{running_interval_ms, StopOutcome, TimerPhase, TimerState, TransitionError};

/// Next logical version after `previous`, at least `now`.
///
/// Two mutations within the same millisecond still get distinct, strictly
/// increasing versions, and a clock that jumps backwards never rewinds the
/// version.
pub fn next_version(previous: i64, now: i64) -> i64 {
    now.max(previous.saturating_add(1))
}

/// `idle → running` with a fresh session id
pub fn start_new_session(
    state: &TimerState,
    now: i64,
    session_id: String,
) -> Result<TimerState, TransitionError> {
    if !state.is_idle() {
        return Err(TransitionError::AlreadyRunning);
    }

    Ok(TimerState {
        phase: TimerPhase::Running,
        start_time: Some(now),
        session_start_time: Some(now),
        elapsed_before_pause: 0,
        session_id: Some(session_id),
        current_tag: state.current_tag.clone(),
        current_notes: state.current_notes.clone(),
        last_updated: next_version(state.last_updated, now),
    })
}

/// `paused → running`
pub fn resume_session(state: &TimerState, now: i64) -> Result<TimerState, TransitionError> {
    if state.phase != TimerPhase::Paused {
        return Err(TransitionError::NotPaused);
    }

    Ok(TimerState {
        phase: TimerPhase::Running,
        start_time: Some(now),
        last_updated: next_version(state.last_updated, now),
        ..state.clone()
    })
}

/// `running → paused`, banking the running interval
pub fn pause_session(state: &TimerState, now: i64) -> Result<TimerState, TransitionError> {
    let start = match (state.phase, state.start_time) {
        (TimerPhase::Running, Some(start)) => start,
        _ => return Err(TransitionError::NotRunning),
    };

    Ok(TimerState {
        phase: TimerPhase::Paused,
        start_time: None,
        elapsed_before_pause: state
            .elapsed_before_pause
            .saturating_add(running_interval_ms(start, now)),
        last_updated: next_version(state.last_updated, now),
        ..state.clone()
    })
}

/// End the session and report its length.
///
/// Returns `None` when idle: there is nothing to stop and nothing changes.
/// The tag survives into the next session; notes do not.
pub fn stop_session(state: &TimerState, now: i64) -> Option<(TimerState, StopOutcome)> {
    if state.is_idle() {
        return None;
    }

    let outcome = StopOutcome {
        ok: true,
        duration_seconds: state.elapsed_ms(now) / 1_000,
        session_start_time: state.session_start_time,
        session_id: state.session_id.clone(),
        tag: state.current_tag.clone(),
        notes: state.current_notes.clone(),
    };

    Some((idle_from(state, now), outcome))
}

/// Force idle from any phase without reporting a duration
pub fn reset_session(state: &TimerState, now: i64) -> TimerState {
    idle_from(state, now)
}

pub fn set_tag(state: &TimerState, now: i64, tag: String) -> TimerState {
    TimerState {
        current_tag: tag,
        last_updated: next_version(state.last_updated, now),
        ..state.clone()
    }
}

pub fn set_notes(state: &TimerState, now: i64, notes: String) -> TimerState {
    TimerState {
        current_notes: notes,
        last_updated: next_version(state.last_updated, now),
        ..state.clone()
    }
}

fn idle_from(state: &TimerState, now: i64) -> TimerState {
    TimerState {
        current_tag: state.current_tag.clone(),
        last_updated: next_version(state.last_updated, now),
        ..TimerState::default()
    }
}
