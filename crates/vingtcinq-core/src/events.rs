use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{CompletedSession, SessionData};
use crate::timer::{BreakKind, TimerState};

/// Every state change in the engines produces an Event.
/// The CLI prints them; listeners react to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero. The session is not finalized until the next start.
    TimerCompleted {
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    ExtraTimeAdded {
        seconds: i64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// The accumulator was frozen; the history manager assigns the number.
    SessionFinalized {
        data: SessionData,
        at: DateTime<Utc>,
    },
    /// A numbered session was recorded in the history.
    SessionCompleted {
        session: CompletedSession,
    },
    BreakStarted {
        kind: BreakKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    BreakPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    BreakResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    BreakCompleted {
        kind: BreakKind,
        at: DateTime<Utc>,
    },
    BreakReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        remaining_secs: u64,
        display: String,
        session: SessionData,
        next_session_number: u64,
        break_kind: Option<BreakKind>,
        break_remaining_secs: u64,
        break_suggested: bool,
        at: DateTime<Utc>,
    },
}

/// Convert an epoch-ms instant into an event timestamp.
pub fn event_time(now_ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now_ms as i64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::TimerPaused {
            remaining_secs: 42,
            at: event_time(0),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TimerPaused");
        assert_eq!(json["remaining_secs"], 42);
    }

    #[test]
    fn event_time_uses_epoch_millis() {
        let at = event_time(1_700_000_000_123);
        assert_eq!(at.timestamp_millis(), 1_700_000_000_123);
    }
}
