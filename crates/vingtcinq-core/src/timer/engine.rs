//! Main focus timer engine.
//!
//! The engine is a wall-clock-based state machine. It does not use
//! internal threads: every operation receives the current instant and the
//! caller (or [`crate::ticker`]) is responsible for calling `tick()`
//! periodically and whenever the host regains visibility or focus.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!        Completed --start()--> Idle (session finalized)
//! ```
//!
//! Reaching zero never finalizes the session by itself. The next `start()`
//! finalizes it and returns the timer to an editable idle state.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::countdown::{Countdown, PAUSED_CADENCE, RUNNING_CADENCE};
use crate::events::{event_time, Event};
use crate::session::{SessionAccumulator, SessionData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Countdown reached zero; waiting for the next start to finalize.
    Completed,
}

/// Core timer engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerEngine {
    countdown: Countdown,
    accumulator: SessionAccumulator,
    /// Set when the countdown reached zero on its own. Survives extra time
    /// added afterwards, so the next start still rolls the session over.
    #[serde(default)]
    finalize_pending: bool,
}

impl TimerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh engine preloaded with a duration, as if the user had typed it.
    pub fn with_duration(secs: u64) -> Self {
        Self {
            countdown: Countdown::with_remaining(secs),
            ..Self::default()
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        if self.countdown.is_running() {
            TimerState::Running
        } else if !self.countdown.has_started() {
            TimerState::Idle
        } else if self.countdown.remaining_secs() == 0 || self.finalize_pending {
            TimerState::Completed
        } else {
            TimerState::Paused
        }
    }

    pub fn remaining_secs(&self) -> u64 {
        self.countdown.remaining_secs()
    }

    pub fn is_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn has_started(&self) -> bool {
        self.countdown.has_started()
    }

    /// `remaining == 0` on a started timer.
    pub fn is_completed(&self) -> bool {
        self.countdown.has_started() && self.countdown.remaining_secs() == 0
    }

    pub fn end_ms(&self) -> Option<u64> {
        if self.countdown.is_running() {
            self.countdown.end_ms()
        } else {
            None
        }
    }

    pub fn session_data(&self) -> SessionData {
        self.accumulator.data()
    }

    /// Identifies the currently scheduled periodic recomputation.
    pub fn epoch(&self) -> u64 {
        self.countdown.epoch()
    }

    /// How often the periodic recomputation should fire, if at all.
    pub fn cadence(&self) -> Option<Duration> {
        if self.countdown.is_running() {
            Some(RUNNING_CADENCE)
        } else if self.accumulator.is_tracking_pause() {
            Some(PAUSED_CADENCE)
        } else {
            None
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now_ms: u64) -> Option<Event> {
        if self.countdown.is_running() {
            return None;
        }

        if self.finalize_pending
            || (self.countdown.remaining_secs() == 0 && self.countdown.has_started())
        {
            let data = self.finalize(now_ms);
            return Some(Event::SessionFinalized {
                data,
                at: event_time(now_ms),
            });
        }

        if self.countdown.remaining_secs() == 0 {
            return self.reset(now_ms);
        }

        if !self.countdown.has_started() {
            self.accumulator = SessionAccumulator::new();
        }
        self.countdown.arm(now_ms);
        self.accumulator.begin_active(now_ms);
        debug!(
            remaining_secs = self.countdown.remaining_secs(),
            end_ms = ?self.countdown.end_ms(),
            "timer started"
        );
        Some(Event::TimerStarted {
            remaining_secs: self.countdown.remaining_secs(),
            at: event_time(now_ms),
        })
    }

    pub fn pause(&mut self, now_ms: u64) -> Option<Event> {
        if !self.countdown.is_running() {
            return None;
        }
        // Bring the display up to date first; it may have hit zero meanwhile.
        if let Some(completed) = self.tick(now_ms) {
            return Some(completed);
        }
        self.countdown.halt();
        self.accumulator.begin_pause(now_ms);
        debug!(remaining_secs = self.countdown.remaining_secs(), "timer paused");
        Some(Event::TimerPaused {
            remaining_secs: self.countdown.remaining_secs(),
            at: event_time(now_ms),
        })
    }

    pub fn toggle(&mut self, now_ms: u64) -> Option<Event> {
        if self.countdown.is_running() {
            self.pause(now_ms)
        } else {
            self.start(now_ms)
        }
    }

    /// Unconditionally back to idle; the current accumulator is discarded.
    pub fn reset(&mut self, now_ms: u64) -> Option<Event> {
        self.countdown.clear();
        self.accumulator = SessionAccumulator::new();
        self.finalize_pending = false;
        debug!("timer reset");
        Some(Event::TimerReset {
            at: event_time(now_ms),
        })
    }

    /// Edit the duration of a fresh timer. Ignored once started.
    pub fn set_remaining(&mut self, secs: i64) -> bool {
        if self.countdown.has_started() {
            return false;
        }
        self.countdown.set_remaining(secs.max(0) as u64);
        true
    }

    /// Add (or with a negative value, remove) bonus time on a started timer.
    pub fn add_extra_time(&mut self, secs: i64, now_ms: u64) -> Option<Event> {
        if !self.countdown.has_started() {
            return None;
        }
        self.countdown.extend(secs);
        self.accumulator.add_extra(secs);
        debug!(
            seconds = secs,
            remaining_secs = self.countdown.remaining_secs(),
            "extra time added"
        );
        Some(Event::ExtraTimeAdded {
            seconds: secs,
            remaining_secs: self.countdown.remaining_secs(),
            at: event_time(now_ms),
        })
    }

    /// Explicit "new session": close the current one if anything was started.
    pub fn start_new_session(&mut self, now_ms: u64) -> Option<Event> {
        if self.countdown.has_started() {
            let data = self.finalize(now_ms);
            self.countdown.clear();
            return Some(Event::SessionFinalized {
                data,
                at: event_time(now_ms),
            });
        }
        self.countdown.clear();
        self.accumulator = SessionAccumulator::new();
        None
    }

    /// Periodic recomputation. Returns `Some(TimerCompleted)` when the
    /// countdown reaches zero during this call.
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        if self.countdown.is_running() {
            let reached_zero = self.countdown.recompute(now_ms);
            self.accumulator.record_active(now_ms);
            if reached_zero {
                self.accumulator.halt(now_ms);
                self.finalize_pending = true;
                debug!("timer reached zero");
                return Some(Event::TimerCompleted {
                    at: event_time(now_ms),
                });
            }
            return None;
        }
        self.accumulator.record_pause(now_ms);
        None
    }

    /// `tick()` on behalf of a periodic callback scheduled at `epoch`.
    /// A callback that outlived a pause, reset or restart does nothing.
    pub fn tick_if_current(&mut self, epoch: u64, now_ms: u64) -> Option<Event> {
        if epoch != self.countdown.epoch() {
            return None;
        }
        self.tick(now_ms)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Freeze the accumulator, start a fresh one and make the timer editable.
    /// Time added after completion is carried into the next session's duration.
    fn finalize(&mut self, now_ms: u64) -> SessionData {
        let data = self.accumulator.close(now_ms);
        self.accumulator = SessionAccumulator::new();
        self.countdown.unstart();
        self.finalize_pending = false;
        debug!(
            active = data.active_secs,
            pause = data.pause_secs,
            extra = data.extra_secs,
            "session finalized"
        );
        data
    }
}
