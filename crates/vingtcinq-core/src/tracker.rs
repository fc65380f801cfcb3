//! The session tracker: focus timer, break timer and history behind one clock.
//!
//! Hosts talk to this type rather than to the engines directly. It reads the
//! clock for every command and turns a finalized accumulator into a numbered
//! history entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::clock::Clock;
use crate::events::{event_time, Event};
use crate::session::{CompletedSession, SessionHistory, SyncOutcome};
use crate::stats::{self, Statistics};
use crate::time_format::{format_clock, parse_time_to_seconds};
use crate::timer::{BreakEngine, BreakKind, TimerEngine, TimerState};

/// What a host needs to resume a tracker in a later process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerState {
    pub timer: TimerEngine,
    #[serde(default)]
    pub breaks: BreakEngine,
    /// Sessions the store does not hold (yet).
    #[serde(default)]
    pub local_sessions: Vec<CompletedSession>,
    /// Names given to the session in progress before it was recorded.
    #[serde(default)]
    pub pending_names: BTreeMap<u64, String>,
}

/// Epochs of the recomputations currently scheduled, see [`Tracker::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub timer_epoch: u64,
    pub break_epoch: u64,
    /// `None` when neither engine needs periodic recomputation.
    pub delay: Option<Duration>,
}

pub struct Tracker<C: Clock> {
    clock: C,
    timer: TimerEngine,
    breaks: BreakEngine,
    history: SessionHistory,
}

impl<C: Clock> Tracker<C> {
    pub fn new(clock: C, history: SessionHistory) -> Self {
        Self::with_state(clock, history, TrackerState::default())
    }

    pub fn with_state(clock: C, mut history: SessionHistory, state: TrackerState) -> Self {
        history.restore(state.local_sessions);
        history.restore_pending_names(state.pending_names);
        Self {
            clock,
            timer: state.timer,
            breaks: state.breaks,
            history,
        }
    }

    pub fn state(&self) -> TrackerState {
        TrackerState {
            timer: self.timer.clone(),
            breaks: self.breaks.clone(),
            local_sessions: self.history.unsynced(),
            pending_names: self.history.pending_names().clone(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    pub fn breaks(&self) -> &BreakEngine {
        &self.breaks
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut SessionHistory {
        &mut self.history
    }

    // ── Focus timer ──────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        let event = self.timer.start(now);
        self.record(event)
    }

    pub fn pause(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        self.timer.pause(now)
    }

    pub fn toggle(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        let event = self.timer.toggle(now);
        self.record(event)
    }

    pub fn reset(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        self.timer.reset(now)
    }

    pub fn set_remaining(&mut self, secs: i64) -> bool {
        self.timer.set_remaining(secs)
    }

    /// Set the duration from user-typed text (`25:00`, `2500`, `1h 05m 00s`).
    pub fn set_time_string(&mut self, input: &str) -> bool {
        let secs = parse_time_to_seconds(input);
        self.timer.set_remaining(i64::try_from(secs).unwrap_or(i64::MAX))
    }

    pub fn add_extra_time(&mut self, secs: i64) -> Option<Event> {
        let now = self.clock.now_ms();
        self.timer.add_extra_time(secs, now)
    }

    pub fn start_new_session(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        let event = self.timer.start_new_session(now);
        self.record(event)
    }

    // ── Break timer ──────────────────────────────────────────────────

    pub fn start_break(&mut self, kind: BreakKind) -> Option<Event> {
        let now = self.clock.now_ms();
        self.breaks.start(kind, now)
    }

    pub fn pause_break(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        self.breaks.pause(now)
    }

    pub fn resume_break(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        self.breaks.resume(now)
    }

    pub fn reset_break(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        self.breaks.reset(now)
    }

    pub fn skip_break(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        self.breaks.skip(now)
    }

    /// The focus timer has completed and no break has been taken since.
    pub fn break_suggested(&self) -> bool {
        self.timer.state() == TimerState::Completed
            && !self.breaks.has_started()
            && !self.breaks.is_completed()
    }

    // ── Recomputation ────────────────────────────────────────────────

    /// Recompute both engines now, e.g. when the host regains focus.
    pub fn tick(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        [self.timer.tick(now), self.breaks.tick(now)]
            .into_iter()
            .flatten()
            .collect()
    }

    /// The recomputation a periodic driver should schedule next.
    pub fn schedule(&self, running: Duration, paused: Duration) -> Schedule {
        let scale = |cadence: Duration| {
            if cadence == crate::timer::RUNNING_CADENCE {
                running
            } else {
                paused
            }
        };
        let delay = [self.timer.cadence(), self.breaks.cadence()]
            .into_iter()
            .flatten()
            .map(scale)
            .min();
        Schedule {
            timer_epoch: self.timer.epoch(),
            break_epoch: self.breaks.epoch(),
            delay,
        }
    }

    /// Recompute on behalf of a callback scheduled with `schedule`. Engines
    /// whose epoch moved on since then are left alone.
    pub fn tick_scheduled(&mut self, schedule: Schedule) -> Vec<Event> {
        let now = self.clock.now_ms();
        [
            self.timer.tick_if_current(schedule.timer_epoch, now),
            self.breaks.tick_if_current(schedule.break_epoch, now),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    // ── History ──────────────────────────────────────────────────────

    /// The number the session in progress will receive.
    pub fn current_session_number(&self) -> u64 {
        self.history.next_session_number()
    }

    pub fn rename_session(&mut self, session_number: u64, name: &str) -> SyncOutcome {
        self.history.rename(session_number, name)
    }

    pub fn delete_session(&mut self, session_number: u64) -> SyncOutcome {
        self.history.delete(session_number)
    }

    /// Subscribe, reload from the store and apply pending push updates.
    pub fn sync(&mut self) -> SyncOutcome {
        let outcome = self.history.connect();
        if outcome == SyncOutcome::Persisted {
            self.history.sync_pending();
            self.history.poll_remote();
        }
        outcome
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::compute(self.history.sessions())
    }

    pub fn today_total_secs(&self) -> f64 {
        let now = event_time(self.clock.now_ms()).with_timezone(&chrono::Local);
        stats::today_total_secs(self.history.sessions(), &now)
    }

    pub fn snapshot(&self) -> Event {
        let now = self.clock.now_ms();
        Event::StateSnapshot {
            state: self.timer.state(),
            remaining_secs: self.timer.remaining_secs(),
            display: format_clock(self.timer.remaining_secs()),
            session: self.timer.session_data(),
            next_session_number: self.history.next_session_number(),
            break_kind: self.breaks.kind(),
            break_remaining_secs: self.breaks.remaining_secs(),
            break_suggested: self.break_suggested(),
            at: event_time(now),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        event_time(self.clock.now_ms())
    }

    /// Hand a finalized accumulator to the history and report the numbered session.
    fn record(&mut self, event: Option<Event>) -> Option<Event> {
        match event {
            Some(Event::SessionFinalized { data, at }) => {
                let finalized = self.history.finalize(data, at);
                Some(Event::SessionCompleted {
                    session: finalized.session,
                })
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticIdentity;
    use crate::clock::ManualClock;
    use crate::storage::{MemoryCounter, SqliteSessionStore};
    use std::sync::Arc;

    fn tracker() -> (ManualClock, Tracker<ManualClock>) {
        let clock = ManualClock::new(1_700_000_000_000);
        let history = SessionHistory::new(
            Arc::new(SqliteSessionStore::open_memory().unwrap()),
            Arc::new(StaticIdentity::anonymous()),
            Box::new(MemoryCounter::new()),
        );
        (clock.clone(), Tracker::new(clock, history))
    }

    #[test]
    fn full_cycle_records_a_numbered_session() {
        let (clock, mut t) = tracker();
        assert!(t.set_time_string("00:10"));
        t.start();
        clock.advance_secs(4);
        t.pause();
        clock.advance_secs(3);
        t.start();
        clock.advance_secs(6);
        assert!(matches!(t.tick().as_slice(), [Event::TimerCompleted { .. }]));
        assert!(t.break_suggested());

        match t.start() {
            Some(Event::SessionCompleted { session }) => {
                assert_eq!(session.session_number, 1);
                assert_eq!(session.data.active_secs, 10.0);
                assert_eq!(session.data.pause_secs, 3.0);
                assert_eq!(session.data.total_secs, 10.0);
            }
            other => panic!("Expected SessionCompleted, got {other:?}"),
        }
        assert_eq!(t.current_session_number(), 2);
        assert_eq!(t.statistics().total_sessions, 1);
    }

    #[test]
    fn starting_a_break_clears_the_suggestion() {
        let (clock, mut t) = tracker();
        t.set_remaining(1);
        t.start();
        clock.advance_secs(1);
        t.tick();
        assert!(t.break_suggested());
        t.start_break(BreakKind::Short);
        assert!(!t.break_suggested());
    }

    #[test]
    fn schedule_uses_the_fastest_running_engine() {
        let (clock, mut t) = tracker();
        let running = Duration::from_millis(50);
        let paused = Duration::from_millis(500);
        assert_eq!(t.schedule(running, paused).delay, None);

        t.set_remaining(60);
        t.start();
        clock.advance_secs(1);
        t.pause();
        assert_eq!(t.schedule(running, paused).delay, Some(paused));

        t.start_break(BreakKind::Long);
        assert_eq!(t.schedule(running, paused).delay, Some(running));
    }

    #[test]
    fn stale_schedule_does_nothing() {
        let (clock, mut t) = tracker();
        t.set_remaining(60);
        t.start();
        let scheduled = t.schedule(Duration::from_millis(100), Duration::from_secs(1));
        clock.advance_secs(10);
        t.pause();
        t.start();
        clock.advance_secs(100);
        assert!(t.tick_scheduled(scheduled).is_empty());
        assert!(t.timer().is_running());
    }

    #[test]
    fn state_round_trips_local_sessions() {
        let (clock, mut t) = tracker();
        t.set_remaining(5);
        t.start();
        clock.advance_secs(2);
        t.start_new_session();
        let state = t.state();
        assert_eq!(state.local_sessions.len(), 1);

        let json = serde_json::to_string(&state).unwrap();
        let history = SessionHistory::new(
            Arc::new(SqliteSessionStore::open_memory().unwrap()),
            Arc::new(StaticIdentity::anonymous()),
            Box::new(MemoryCounter::starting_at(2)),
        );
        let restored =
            Tracker::with_state(clock, history, serde_json::from_str(&json).unwrap());
        assert_eq!(restored.history().len(), 1);
        assert_eq!(restored.current_session_number(), 2);
    }

    #[test]
    fn pending_name_survives_a_state_round_trip() {
        let (clock, mut t) = tracker();
        t.set_time_string("00:05");
        t.start();
        assert_eq!(t.rename_session(1, "Planning"), SyncOutcome::LocalOnly);

        let json = serde_json::to_string(&t.state()).unwrap();
        let state: TrackerState = serde_json::from_str(&json).unwrap();
        let history = SessionHistory::new(
            Arc::new(SqliteSessionStore::open_memory().unwrap()),
            Arc::new(StaticIdentity::anonymous()),
            Box::new(MemoryCounter::new()),
        );
        let mut resumed = Tracker::with_state(clock.clone(), history, state);

        clock.advance_secs(5);
        resumed.tick();
        match resumed.start() {
            Some(Event::SessionCompleted { session }) => {
                assert_eq!(session.name.as_deref(), Some("Planning"));
            }
            other => panic!("Expected SessionCompleted, got {other:?}"),
        }
        assert!(resumed.state().pending_names.is_empty());
    }

    #[test]
    fn snapshot_reports_display_and_next_number() {
        let (_, mut t) = tracker();
        t.set_time_string("2500");
        match t.snapshot() {
            Event::StateSnapshot {
                state,
                display,
                next_session_number,
                break_suggested,
                ..
            } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(display, "25:00");
                assert_eq!(next_session_number, 1);
                assert!(!break_suggested);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
