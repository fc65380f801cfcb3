//! Break timer.
//!
//! Same countdown as the focus timer, fixed to one of two durations and
//! never coupled to session statistics. Reaching zero is terminal until
//! `reset()` or `skip()`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::countdown::{Countdown, RUNNING_CADENCE};
use crate::events::{event_time, Event};

pub const SHORT_BREAK_SECS: u64 = 5 * 60;
pub const LONG_BREAK_SECS: u64 = 15 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Long,
}

impl BreakKind {
    pub fn duration_secs(&self) -> u64 {
        match self {
            BreakKind::Short => SHORT_BREAK_SECS,
            BreakKind::Long => LONG_BREAK_SECS,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BreakKind::Short => "Short Break",
            BreakKind::Long => "Long Break",
        }
    }
}

impl std::str::FromStr for BreakKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(BreakKind::Short),
            "long" => Ok(BreakKind::Long),
            other => Err(format!("unknown break kind '{other}' (expected short or long)")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreakEngine {
    countdown: Countdown,
    kind: Option<BreakKind>,
    completed: bool,
}

impl BreakEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(&self) -> Option<BreakKind> {
        self.kind
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

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn epoch(&self) -> u64 {
        self.countdown.epoch()
    }

    pub fn cadence(&self) -> Option<Duration> {
        self.countdown.is_running().then_some(RUNNING_CADENCE)
    }

    /// Arm the fixed duration for `kind` and begin counting down.
    /// Any previous break progress is discarded.
    pub fn start(&mut self, kind: BreakKind, now_ms: u64) -> Option<Event> {
        if self.completed {
            return None;
        }
        self.countdown.clear();
        self.countdown.set_remaining(kind.duration_secs());
        self.countdown.arm(now_ms);
        self.kind = Some(kind);
        debug!(kind = kind.label(), "break started");
        Some(Event::BreakStarted {
            kind,
            duration_secs: kind.duration_secs(),
            at: event_time(now_ms),
        })
    }

    pub fn pause(&mut self, now_ms: u64) -> Option<Event> {
        if !self.countdown.is_running() {
            return None;
        }
        if let Some(completed) = self.tick(now_ms) {
            return Some(completed);
        }
        self.countdown.halt();
        Some(Event::BreakPaused {
            remaining_secs: self.countdown.remaining_secs(),
            at: event_time(now_ms),
        })
    }

    /// Continue a paused break from a freshly computed end instant.
    pub fn resume(&mut self, now_ms: u64) -> Option<Event> {
        if self.completed
            || self.countdown.is_running()
            || !self.countdown.has_started()
            || self.countdown.remaining_secs() == 0
        {
            return None;
        }
        self.countdown.arm(now_ms);
        Some(Event::BreakResumed {
            remaining_secs: self.countdown.remaining_secs(),
            at: event_time(now_ms),
        })
    }

    pub fn reset(&mut self, now_ms: u64) -> Option<Event> {
        self.countdown.clear();
        self.kind = None;
        self.completed = false;
        debug!("break reset");
        Some(Event::BreakReset {
            at: event_time(now_ms),
        })
    }

    pub fn skip(&mut self, now_ms: u64) -> Option<Event> {
        self.reset(now_ms)
    }

    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        if !self.countdown.recompute(now_ms) {
            return None;
        }
        self.completed = true;
        let kind = self.kind.unwrap_or(BreakKind::Short);
        debug!(kind = kind.label(), "break completed");
        Some(Event::BreakCompleted {
            kind,
            at: event_time(now_ms),
        })
    }

    pub fn tick_if_current(&mut self, epoch: u64, now_ms: u64) -> Option<Event> {
        if epoch != self.countdown.epoch() {
            return None;
        }
        self.tick(now_ms)
    }
}
