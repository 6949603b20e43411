//! Study timer commands

use std::time::Instant;

use studysync_domain::{
    Bucket, CompletedSession, StopOutcome, TimerDisplay, TimerState, TransitionError,
};
use tracing::{info, warn};

use super::error::{CommandError, CommandResult};
use crate::utils::logging::{error_label, log_command_execution};
use crate::AppContext;

/// Log and hand back a command result
pub(crate) fn finish<T>(command: &str, start: Instant, result: CommandResult<T>) -> CommandResult<T> {
    log_command_execution(command, start.elapsed(), result.as_ref().err().map(error_label));
    result
}

fn transition(
    command: &str,
    result: Result<TimerState, TransitionError>,
    start: Instant,
) -> CommandResult<TimerState> {
    finish(command, start, result.map_err(CommandError::from))
}

/// Start a new session from idle
pub fn start_session(ctx: &AppContext) -> CommandResult<TimerState> {
    let start = Instant::now();
    info!(command = "timer::start_session", "Starting study session");
    transition("timer::start_session", ctx.timer.start_new_session(), start)
}

/// Continue a paused session
pub fn resume_session(ctx: &AppContext) -> CommandResult<TimerState> {
    let start = Instant::now();
    transition("timer::resume_session", ctx.timer.resume_session(), start)
}

/// Pause the running session
pub fn pause_session(ctx: &AppContext) -> CommandResult<TimerState> {
    let start = Instant::now();
    transition("timer::pause_session", ctx.timer.pause_session(), start)
}

/// Stop the session and record it in the `timer-sessions` bucket.
///
/// Stopping an idle timer reports `ok: false` and records nothing.
pub fn stop_session(ctx: &AppContext) -> CommandResult<StopOutcome> {
    let command = "timer::stop_session";
    let start = Instant::now();

    let outcome = ctx.timer.stop_session();
    if !outcome.ok {
        return finish(command, start, Ok(outcome));
    }

    let end_time = ctx.clock.timestamp_ms();
    let duration_ms = i64::try_from(outcome.duration_seconds.saturating_mul(1_000)).unwrap_or(i64::MAX);
    let session = CompletedSession {
        id: outcome.session_id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        start_time: outcome.session_start_time.unwrap_or(end_time.saturating_sub(duration_ms)),
        end_time,
        duration_seconds: outcome.duration_seconds,
        tag: outcome.tag.clone(),
        notes: outcome.notes.clone(),
    };
    info!(
        session_id = %session.id,
        duration_seconds = session.duration_seconds,
        "Study session completed"
    );

    let result = append_completed_session(ctx, session).map(|_| outcome);
    finish(command, start, result)
}

/// Force the timer back to idle without recording a session
pub fn reset_session(ctx: &AppContext) -> TimerState {
    let start = Instant::now();
    let state = ctx.timer.reset_session();
    log_command_execution("timer::reset_session", start.elapsed(), None);
    state
}

pub fn set_tag(ctx: &AppContext, tag: &str) -> TimerState {
    ctx.timer.set_tag(tag)
}

pub fn set_notes(ctx: &AppContext, notes: &str) -> TimerState {
    ctx.timer.set_notes(notes)
}

pub fn timer_state(ctx: &AppContext) -> TimerState {
    ctx.timer.state()
}

/// Latest display value (phase and elapsed time)
pub fn timer_display(ctx: &AppContext) -> TimerDisplay {
    *ctx.timer.display().borrow()
}

/// Sessions recorded in the `timer-sessions` bucket, oldest first
pub fn list_completed_sessions(ctx: &AppContext) -> CommandResult<Vec<CompletedSession>> {
    let start = Instant::now();
    let result = read_completed_sessions(ctx).map_err(CommandError::from);
    finish("timer::list_completed_sessions", start, result)
}

fn read_completed_sessions(ctx: &AppContext) -> studysync_domain::Result<Vec<CompletedSession>> {
    let key = ctx.keys.bucket(Bucket::TimerSessions);
    let Some(raw) = ctx.store.get(&key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&raw) {
        Ok(sessions) => Ok(sessions),
        Err(err) => {
            warn!(error = %err, "Completed session list is malformed; starting a new one");
            Ok(Vec::new())
        }
    }
}

fn append_completed_session(ctx: &AppContext, session: CompletedSession) -> CommandResult<usize> {
    let mut sessions = read_completed_sessions(ctx)?;
    sessions.push(session);
    let raw = serde_json::to_string(&sessions).map_err(studysync_domain::StudySyncError::from)?;
    ctx.store.set(&ctx.keys.bucket(Bucket::TimerSessions), &raw)?;
    Ok(sessions.len())
}
