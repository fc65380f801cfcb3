mod breaks;
mod countdown;
mod engine;

pub use breaks::{BreakEngine, BreakKind, LONG_BREAK_SECS, SHORT_BREAK_SECS};
pub use countdown::{remaining_between, Countdown, PAUSED_CADENCE, RUNNING_CADENCE};
pub use engine::{TimerEngine, TimerState};
