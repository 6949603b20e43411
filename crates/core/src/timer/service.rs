//! Timer service - owns the replicated timer state of one process

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use studysync_common::time::{recurring, Clock, TimerHandle};
use studysync_domain::{
    ChannelMessage, InstanceId, StopOutcome, TimerConfig, TimerDisplay, TimerState,
    TransitionError,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::machine;
use super::ports::ReplicationTransport;
use crate::store::{LocalStore, StoreKeys};

/// Timer service
///
/// Transitions run under one lock in call order. Every successful mutation
/// is persisted to the store and published to siblings; adopting a sibling's
/// state is persisted but not re-published.
pub struct TimerService {
    store: Arc<dyn LocalStore>,
    clock: Arc<dyn Clock>,
    instance_id: InstanceId,
    state_key: String,
    state: Arc<Mutex<TimerState>>,
    publisher: RwLock<Option<Arc<dyn ReplicationTransport>>>,
    display: Arc<watch::Sender<TimerDisplay>>,
    ticker: Mutex<Option<TimerHandle>>,
    refresh: Duration,
}

impl TimerService {
    /// Create the service, loading the last persisted state from the store
    pub fn new(
        store: Arc<dyn LocalStore>,
        clock: Arc<dyn Clock>,
        instance_id: InstanceId,
        keys: &StoreKeys,
        config: &TimerConfig,
    ) -> Self {
        let state_key = keys.timer_state();
        let initial = load_state(store.as_ref(), &state_key);
        let (display, _) = watch::channel(TimerDisplay {
            phase: initial.phase,
            elapsed_ms: initial.elapsed_ms(clock.timestamp_ms()),
        });

        let service = Self {
            store,
            clock,
            instance_id,
            state_key,
            state: Arc::new(Mutex::new(initial.clone())),
            publisher: RwLock::new(None),
            display: Arc::new(display),
            ticker: Mutex::new(None),
            refresh: config.display_refresh(),
        };
        service.refresh_display(&initial);
        service
    }

    /// Route published state through `transport`
    pub fn attach_transport(&self, transport: Arc<dyn ReplicationTransport>) {
        debug!(transport = %transport.kind(), "Timer publisher attached");
        *self.publisher.write() = Some(transport);
    }

    pub fn detach_transport(&self) {
        *self.publisher.write() = None;
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    pub fn start_new_session(&self) -> Result<TimerState, TransitionError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.transition("start", |state, now| machine::start_new_session(state, now, session_id))
    }

    pub fn resume_session(&self) -> Result<TimerState, TransitionError> {
        self.transition("resume", machine::resume_session)
    }

    pub fn pause_session(&self) -> Result<TimerState, TransitionError> {
        self.transition("pause", machine::pause_session)
    }

    /// Stop the session. While idle this reports `ok: false` and changes
    /// nothing.
    pub fn stop_session(&self) -> StopOutcome {
        let mut state = self.state.lock();
        let now = self.clock.timestamp_ms();
        let Some((next, outcome)) = machine::stop_session(&state, now) else {
            debug!("Stop requested while idle");
            return StopOutcome::noop();
        };

        *state = next;
        self.commit(&state, true);
        info!(
            session_id = outcome.session_id.as_deref().unwrap_or_default(),
            duration_seconds = outcome.duration_seconds,
            "Study session stopped"
        );
        outcome
    }

    pub fn reset_session(&self) -> TimerState {
        let mut state = self.state.lock();
        *state = machine::reset_session(&state, self.clock.timestamp_ms());
        self.commit(&state, true);
        debug!("Timer reset");
        state.clone()
    }

    pub fn set_tag(&self, tag: impl Into<String>) -> TimerState {
        let tag = tag.into();
        let mut state = self.state.lock();
        *state = machine::set_tag(&state, self.clock.timestamp_ms(), tag);
        self.commit(&state, true);
        state.clone()
    }

    pub fn set_notes(&self, notes: impl Into<String>) -> TimerState {
        let notes = notes.into();
        let mut state = self.state.lock();
        *state = machine::set_notes(&state, self.clock.timestamp_ms(), notes);
        self.commit(&state, true);
        state.clone()
    }

    /// Current state
    pub fn state(&self) -> TimerState {
        self.state.lock().clone()
    }

    /// Current state together with the elapsed time derived from it
    pub fn snapshot(&self) -> (TimerState, u64) {
        let state = self.state.lock().clone();
        let elapsed = state.elapsed_ms(self.clock.timestamp_ms());
        (state, elapsed)
    }

    /// Display updates, refreshed while a session is running
    pub fn display(&self) -> watch::Receiver<TimerDisplay> {
        self.display.subscribe()
    }

    /// Adopt a sibling's state if it is strictly newer than ours.
    ///
    /// A state whose `start_time` disagrees with its phase is dropped.
    /// Returns whether the state was adopted.
    pub fn adopt_external(&self, incoming: TimerState) -> bool {
        if !incoming.is_consistent() {
            warn!(
                phase = %incoming.phase,
                has_start_time = incoming.start_time.is_some(),
                version = incoming.last_updated,
                "Dropping inconsistent sibling timer state"
            );
            return false;
        }

        let mut state = self.state.lock();
        if !incoming.is_newer_than(&state) {
            debug!(
                incoming = incoming.last_updated,
                current = state.last_updated,
                "Discarding stale timer state"
            );
            return false;
        }

        *state = incoming;
        self.commit(&state, false);
        debug!(version = state.last_updated, phase = %state.phase, "Adopted sibling timer state");
        true
    }

    /// Stop the display ticker and detach from replication
    pub fn shutdown(&self) {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.cancel();
        }
        self.detach_transport();
    }

    fn transition<F>(&self, name: &'static str, apply: F) -> Result<TimerState, TransitionError>
    where
        F: FnOnce(&TimerState, i64) -> Result<TimerState, TransitionError>,
    {
        let mut state = self.state.lock();
        let next = apply(&state, self.clock.timestamp_ms()).map_err(|err| {
            debug!(transition = name, reason = err.reason(), "Timer transition refused");
            err
        })?;

        *state = next;
        self.commit(&state, true);
        debug!(transition = name, version = state.last_updated, "Timer transition applied");
        Ok(state.clone())
    }

    /// Persist, optionally publish, and refresh the display. Called with the
    /// state lock held so store writes land in transition order.
    fn commit(&self, state: &TimerState, publish: bool) {
        match serde_json::to_string(state) {
            Ok(raw) => {
                if let Err(err) = self.store.set(&self.state_key, &raw) {
                    warn!(error = %err, "Failed to persist timer state");
                }
            }
            Err(err) => warn!(error = %err, "Failed to serialize timer state"),
        }

        if publish {
            if let Some(transport) = self.publisher.read().as_ref() {
                let message = ChannelMessage::SyncState {
                    sender_id: self.instance_id.clone(),
                    state: state.clone(),
                };
                if let Err(err) = transport.publish(&message) {
                    warn!(transport = %transport.kind(), error = %err, "Failed to publish timer state");
                }
            }
        }

        self.refresh_display(state);
    }

    fn refresh_display(&self, state: &TimerState) {
        self.display.send_replace(TimerDisplay {
            phase: state.phase,
            elapsed_ms: state.elapsed_ms(self.clock.timestamp_ms()),
        });

        let mut ticker = self.ticker.lock();
        if !state.is_running() {
            if let Some(handle) = ticker.take() {
                handle.cancel();
            }
            return;
        }
        if ticker.is_some() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            debug!("No async runtime; display refreshes only on transitions");
            return;
        }

        let shared = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let display = Arc::clone(&self.display);
        *ticker = Some(recurring(self.refresh, move || {
            let state = shared.lock();
            display.send_replace(TimerDisplay {
                phase: state.phase,
                elapsed_ms: state.elapsed_ms(clock.timestamp_ms()),
            });
        }));
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.get_mut().take() {
            ticker.cancel();
        }
    }
}

fn load_state(store: &dyn LocalStore, key: &str) -> TimerState {
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str::<TimerState>(&raw) {
            Ok(state) if state.is_consistent() => state,
            Ok(state) => {
                warn!(key, phase = %state.phase, "Stored timer state is inconsistent; starting idle");
                TimerState::default()
            }
            Err(err) => {
                warn!(key, error = %err, "Stored timer state is malformed; starting idle");
                TimerState::default()
            }
        },
        Ok(None) => TimerState::default(),
        Err(err) => {
            warn!(key, error = %err, "Failed to read timer state; starting idle");
            TimerState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use studysync_common::time::MockClock;
    use studysync_domain::TimerPhase;

    use super::*;
    use crate::testing::{RecordingStore, RecordingTransport};
    use crate::timer::TransportKind;

    struct Fixture {
        store: Arc<RecordingStore>,
        clock: MockClock,
        transport: Arc<RecordingTransport>,
        service: TimerService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(RecordingStore::new());
        let clock = MockClock::at_millis(1_000_000);
        let transport = Arc::new(RecordingTransport::new(TransportKind::BroadcastChannel));
        let service = TimerService::new(
            store.clone(),
            Arc::new(clock.clone()),
            InstanceId::from("tab-a"),
            &StoreKeys::default(),
            &TimerConfig::default(),
        );
        service.attach_transport(transport.clone());
        Fixture { store, clock, transport, service }
    }

    fn persisted(store: &RecordingStore) -> TimerState {
        let raw = store.get("studysync.timerState").unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_start_persists_and_publishes() {
        let fx = fixture();
        let state = fx.service.start_new_session().unwrap();

        assert_eq!(persisted(&fx.store), state);
        let published = fx.transport.published();
        assert_eq!(published.len(), 1);
        match &published[0] {
            ChannelMessage::SyncState { sender_id, state: sent } => {
                assert_eq!(sender_id.as_str(), "tab-a");
                assert_eq!(sent, &state);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_double_start_keeps_original_session() {
        let fx = fixture();
        let first = fx.service.start_new_session().unwrap();
        fx.clock.advance(Duration::from_secs(2));

        assert_eq!(fx.service.start_new_session(), Err(TransitionError::AlreadyRunning));
        assert_eq!(fx.service.state().session_id, first.session_id);
        assert_eq!(fx.transport.published().len(), 1);
    }

    #[test]
    fn test_elapsed_round_trip() {
        let fx = fixture();
        fx.service.start_new_session().unwrap();
        fx.clock.advance(Duration::from_millis(2_500));
        let paused = fx.service.pause_session().unwrap();
        assert_eq!(paused.elapsed_before_pause, 2_500);

        fx.clock.advance(Duration::from_secs(60));
        fx.service.resume_session().unwrap();
        fx.clock.advance(Duration::from_millis(1_800));

        let (_, elapsed) = fx.service.snapshot();
        assert_eq!(elapsed, 4_300);

        let outcome = fx.service.stop_session();
        assert!(outcome.ok);
        assert_eq!(outcome.duration_seconds, 4);
        assert_eq!(outcome.session_start_time, Some(1_000_000));
        assert!(fx.service.state().is_idle());
    }

    #[test]
    fn test_stop_reports_tag_and_notes_of_stopped_session() {
        let fx = fixture();
        fx.service.set_tag("geometry");
        fx.service.set_notes("proofs");
        fx.service.start_new_session().unwrap();

        let outcome = fx.service.stop_session();

        assert_eq!(outcome.tag, "geometry");
        assert_eq!(outcome.notes, "proofs");
        assert_eq!(fx.service.state().current_notes, "");
    }

    #[test]
    fn test_stop_on_idle_does_not_mutate() {
        let fx = fixture();
        let before = fx.service.state();

        assert_eq!(fx.service.stop_session(), StopOutcome::noop());
        assert_eq!(fx.service.state(), before);
        assert!(fx.store.get("studysync.timerState").unwrap().is_none());
        assert!(fx.transport.published().is_empty());
    }

    #[test]
    fn test_adopt_requires_strictly_newer_state() {
        let fx = fixture();
        let local = fx.service.set_tag("math");

        let tie = TimerState { current_tag: "tie".into(), ..local.clone() };
        assert!(!fx.service.adopt_external(tie));

        let newer = TimerState {
            current_tag: "physics".into(),
            last_updated: local.last_updated + 1,
            ..local
        };
        assert!(fx.service.adopt_external(newer.clone()));
        assert_eq!(fx.service.state(), newer);
        assert_eq!(persisted(&fx.store), newer);
        // adoption is never re-broadcast
        assert_eq!(fx.transport.published().len(), 1);
    }

    #[test]
    fn test_inconsistent_sibling_state_is_dropped() {
        let fx = fixture();
        let local = fx.service.set_tag("math");

        let running_without_start: TimerState =
            serde_json::from_str(r#"{"phase":"running","lastUpdated":99000000}"#).unwrap();
        assert!(!fx.service.adopt_external(running_without_start));

        let paused_with_start = TimerState {
            phase: TimerPhase::Paused,
            start_time: Some(1_000_000),
            last_updated: local.last_updated + 10,
            ..local.clone()
        };
        assert!(!fx.service.adopt_external(paused_with_start));

        assert_eq!(fx.service.state(), local);
        assert_eq!(persisted(&fx.store), local);
        // still a normal idle timer
        assert!(fx.service.start_new_session().is_ok());
        assert!(fx.service.pause_session().is_ok());
    }

    #[test]
    fn test_inconsistent_persisted_state_loads_idle() {
        let store = Arc::new(RecordingStore::new());
        store.set("studysync.timerState", r#"{"phase":"running","lastUpdated":5}"#).unwrap();

        let service = TimerService::new(
            store,
            Arc::new(MockClock::at_millis(0)),
            InstanceId::new(),
            &StoreKeys::default(),
            &TimerConfig::default(),
        );
        assert_eq!(service.state(), TimerState::default());
    }

    #[test]
    fn test_versions_increase_within_one_millisecond() {
        let fx = fixture();
        let first = fx.service.set_tag("a");
        let second = fx.service.set_notes("b");
        assert!(second.last_updated > first.last_updated);
    }

    #[test]
    fn test_malformed_persisted_state_loads_idle() {
        let store = Arc::new(RecordingStore::new());
        store.set("studysync.timerState", "{not json").unwrap();

        let service = TimerService::new(
            store,
            Arc::new(MockClock::at_millis(0)),
            InstanceId::new(),
            &StoreKeys::default(),
            &TimerConfig::default(),
        );
        assert_eq!(service.state(), TimerState::default());
    }

    #[test]
    fn test_loads_running_state_from_store() {
        let store = Arc::new(RecordingStore::new());
        let saved = TimerState {
            phase: TimerPhase::Running,
            start_time: Some(10_000),
            session_start_time: Some(10_000),
            session_id: Some("s".into()),
            last_updated: 10_000,
            ..TimerState::default()
        };
        store.set("studysync.timerState", &serde_json::to_string(&saved).unwrap()).unwrap();

        let service = TimerService::new(
            store,
            Arc::new(MockClock::at_millis(25_000)),
            InstanceId::new(),
            &StoreKeys::default(),
            &TimerConfig::default(),
        );
        assert_eq!(service.snapshot().1, 15_000);
        assert_eq!(service.display().borrow().elapsed_ms, 15_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_ticks_while_running() {
        let fx = fixture();
        let mut display = fx.service.display();
        fx.service.start_new_session().unwrap();
        display.borrow_and_update();

        fx.clock.advance(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(1_050)).await;
        assert!(display.has_changed().unwrap());
        assert_eq!(display.borrow_and_update().elapsed_ms, 1_000);

        fx.service.pause_session().unwrap();
        display.borrow_and_update();
        fx.clock.advance(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!display.has_changed().unwrap());
        assert_eq!(display.borrow().phase, TimerPhase::Paused);
    }
}
