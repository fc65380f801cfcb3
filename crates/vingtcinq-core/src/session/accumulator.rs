//! Per-session time attribution.
//!
//! Wall-clock time is attributed to exactly one of active, pause or extra.
//! Each bucket has its own "last update" mark; a transition flushes the
//! outgoing bucket up to the transition instant and opens the incoming
//! bucket at that same instant, so no interval is counted twice or dropped.

use serde::{Deserialize, Serialize};

/// Immutable time totals of one session, in seconds.
///
/// `total_secs` is always `active_secs + extra_secs`; pause time never
/// contributes to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub active_secs: f64,
    pub pause_secs: f64,
    pub extra_secs: f64,
    pub total_secs: f64,
}

impl SessionData {
    pub fn new(active_secs: f64, pause_secs: f64, extra_secs: f64) -> Self {
        let mut data = Self {
            active_secs: active_secs.max(0.0),
            pause_secs: pause_secs.max(0.0),
            extra_secs: extra_secs.max(0.0),
            total_secs: 0.0,
        };
        data.recompute_total();
        data
    }

    fn recompute_total(&mut self) {
        self.total_secs = self.active_secs + self.extra_secs;
    }

    /// Copy with every bucket rounded to whole seconds.
    pub fn rounded(&self) -> Self {
        Self::new(
            self.active_secs.round(),
            self.pause_secs.round(),
            self.extra_secs.round(),
        )
    }
}

/// Accumulator for the session currently in progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionAccumulator {
    data: SessionData,
    #[serde(default)]
    active_mark_ms: Option<u64>,
    #[serde(default)]
    pause_mark_ms: Option<u64>,
}

impl SessionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> SessionData {
        self.data
    }

    pub fn is_tracking_active(&self) -> bool {
        self.active_mark_ms.is_some()
    }

    pub fn is_tracking_pause(&self) -> bool {
        self.pause_mark_ms.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.data == SessionData::default()
    }

    /// Close any open pause interval and begin attributing time to active.
    pub fn begin_active(&mut self, now_ms: u64) {
        self.record_pause(now_ms);
        self.pause_mark_ms = None;
        self.active_mark_ms = Some(now_ms);
    }

    /// Close the open active interval and begin attributing time to pause.
    pub fn begin_pause(&mut self, now_ms: u64) {
        self.record_active(now_ms);
        self.active_mark_ms = None;
        self.pause_mark_ms = Some(now_ms);
    }

    /// Close every open interval without opening a new one.
    pub fn halt(&mut self, now_ms: u64) {
        self.record_active(now_ms);
        self.record_pause(now_ms);
        self.active_mark_ms = None;
        self.pause_mark_ms = None;
    }

    /// Add the wall-clock delta since the last active mark.
    pub fn record_active(&mut self, now_ms: u64) {
        if let Some(mark) = self.active_mark_ms {
            self.data.active_secs += elapsed_secs(mark, now_ms);
            self.active_mark_ms = Some(now_ms.max(mark));
            self.data.recompute_total();
        }
    }

    /// Add the wall-clock delta since the last pause mark.
    pub fn record_pause(&mut self, now_ms: u64) {
        if let Some(mark) = self.pause_mark_ms {
            self.data.pause_secs += elapsed_secs(mark, now_ms);
            self.pause_mark_ms = Some(now_ms.max(mark));
            self.data.recompute_total();
        }
    }

    /// Bonus time goes straight to `extra_secs`; the bucket never drops below zero.
    pub fn add_extra(&mut self, secs: i64) {
        self.data.extra_secs = (self.data.extra_secs + secs as f64).max(0.0);
        self.data.recompute_total();
    }

    /// Flush open intervals and hand back an independent copy.
    pub fn close(&mut self, now_ms: u64) -> SessionData {
        self.halt(now_ms);
        self.data
    }
}

/// Seconds between two epoch-ms instants; a clock that went backwards yields zero.
fn elapsed_secs(from_ms: u64, to_ms: u64) -> f64 {
    to_ms.saturating_sub(from_ms) as f64 / 1000.0
}
