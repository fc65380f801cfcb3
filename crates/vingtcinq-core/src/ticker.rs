//! Periodic recomputation driver.
//!
//! Schedules one recomputation at a time: read the epochs and cadence, sleep
//! one cadence, then tick only the engines whose epoch is unchanged. A pause,
//! reset or restart in between therefore cancels the pending callback.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clock::Clock;
use crate::events::Event;
use crate::storage::TimerConfig;
use crate::timer::{PAUSED_CADENCE, RUNNING_CADENCE};
use crate::tracker::Tracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerConfig {
    pub running_cadence: Duration,
    pub paused_cadence: Duration,
    /// Return once neither engine needs recomputation.
    pub stop_when_idle: bool,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            running_cadence: RUNNING_CADENCE,
            paused_cadence: PAUSED_CADENCE,
            stop_when_idle: false,
        }
    }
}

impl From<&TimerConfig> for TickerConfig {
    fn from(config: &TimerConfig) -> Self {
        Self {
            running_cadence: config.running_cadence(),
            paused_cadence: config.paused_cadence(),
            stop_when_idle: false,
        }
    }
}

/// Why [`run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerExit {
    Cancelled,
    Idle,
}

/// Drive `tracker` until `shutdown` is cancelled (or, with
/// `stop_when_idle`, until nothing is running or tracking pause time).
/// Every event produced by a recomputation is handed to `on_event`, along
/// with the tracker so the callback can render state.
pub async fn run<C, F>(
    tracker: Arc<Mutex<Tracker<C>>>,
    config: TickerConfig,
    shutdown: CancellationToken,
    mut on_event: F,
) -> TickerExit
where
    C: Clock,
    F: FnMut(&Tracker<C>, Option<&Event>),
{
    loop {
        let schedule = {
            let guard = tracker.lock().await;
            guard.schedule(config.running_cadence, config.paused_cadence)
        };

        let delay = match schedule.delay {
            Some(delay) => delay,
            None if config.stop_when_idle => {
                debug!("ticker idle, stopping");
                return TickerExit::Idle;
            }
            // Nothing to recompute; look again later in case a command arrives.
            None => config.paused_cadence,
        };

        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("ticker cancelled");
                return TickerExit::Cancelled;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let mut guard = tracker.lock().await;
        let events = guard.tick_scheduled(schedule);
        if events.is_empty() {
            on_event(&guard, None);
        }
        for event in &events {
            on_event(&guard, Some(event));
        }
    }
}
