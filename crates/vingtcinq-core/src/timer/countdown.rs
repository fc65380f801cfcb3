//! Drift-free countdown shared by the main timer and the break timer.
//!
//! The displayed value is always re-derived as `ceil((end - now) / 1000)`;
//! nothing is ever decremented per tick. A throttled or suspended caller
//! that ticks once after a long gap lands on the correct value in one step.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recomputation cadence while a countdown is running.
pub const RUNNING_CADENCE: Duration = Duration::from_millis(100);
/// Recomputation cadence for pause-time accounting.
pub const PAUSED_CADENCE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Countdown {
    remaining_secs: u64,
    running: bool,
    started: bool,
    /// Absolute instant (epoch ms) at which `remaining_secs` reaches zero.
    /// Only meaningful while running; kept after a pause but never reused.
    #[serde(default)]
    end_ms: Option<u64>,
    /// Bumped on every transition that cancels the periodic recomputation.
    #[serde(default)]
    epoch: u64,
}

impl Countdown {
    pub fn with_remaining(secs: u64) -> Self {
        Self {
            remaining_secs: secs,
            ..Self::default()
        }
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn end_ms(&self) -> Option<u64> {
        self.end_ms
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Begin running from the current remaining value with a freshly computed end.
    pub fn arm(&mut self, now_ms: u64) {
        self.running = true;
        self.started = true;
        self.end_ms = Some(now_ms.saturating_add(self.remaining_secs.saturating_mul(1000)));
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Stop running. The stale end instant is retained but ignored on the next `arm`.
    pub fn halt(&mut self) {
        self.running = false;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Back to a fresh, editable, idle countdown.
    pub fn clear(&mut self) {
        self.remaining_secs = 0;
        self.running = false;
        self.started = false;
        self.end_ms = None;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Forget that the countdown was ever started, keeping `remaining_secs`.
    pub fn unstart(&mut self) {
        self.started = false;
        self.running = false;
        self.end_ms = None;
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub fn set_remaining(&mut self, secs: u64) {
        self.remaining_secs = secs;
    }

    /// Re-derive `remaining_secs` from the end instant.
    ///
    /// Returns `true` exactly when this call observed the countdown reaching
    /// zero; the countdown then stops and clears its end instant.
    pub fn recompute(&mut self, now_ms: u64) -> bool {
        if !self.running {
            return false;
        }
        let Some(end) = self.end_ms else {
            return false;
        };
        self.remaining_secs = remaining_between(now_ms, end);
        if self.remaining_secs == 0 {
            self.running = false;
            self.end_ms = None;
            self.epoch = self.epoch.wrapping_add(1);
            return true;
        }
        false
    }

    /// Shift the remaining time by `secs` (floored at zero). A running
    /// countdown has its end instant moved in place.
    pub fn extend(&mut self, secs: i64) {
        self.remaining_secs = self.remaining_secs.saturating_add_signed(secs);
        if self.running {
            if let Some(end) = self.end_ms {
                self.end_ms = Some(end.saturating_add_signed(secs.saturating_mul(1000)));
            }
        }
    }
}

/// `max(0, ceil((end - now) / 1000))`.
pub fn remaining_between(now_ms: u64, end_ms: u64) -> u64 {
    end_ms.saturating_sub(now_ms).div_ceil(1000)
}
