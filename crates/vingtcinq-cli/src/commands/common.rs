//! Shared setup for every command: config, local database and the tracker.
//!
//! The tracker is wall-clock based, so the state saved by one invocation is
//! resumed exactly by the next; nothing runs between invocations.

use std::sync::Arc;

use vingtcinq_core::storage::{data_dir, database::DB_FILE, Database, SqliteSessionStore};
use vingtcinq_core::{
    Config, Event, SessionHistory, StaticIdentity, SystemClock, TimerEngine, Tracker, TrackerState,
};

const STATE_KEY: &str = "tracker_state";

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub struct Workspace {
    pub config: Config,
    pub db: Database,
    pub tracker: Tracker<SystemClock>,
}

impl Workspace {
    /// Load everything and bring the engines up to date with the wall clock.
    /// Returns the events that happened while no command was running.
    pub fn open() -> Result<(Self, Vec<Event>), Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let path = data_dir()?.join(DB_FILE);
        let db = Database::open_at(&path)?;

        let identity = match config.account.user() {
            Some(user) => StaticIdentity::signed_in(user),
            None => StaticIdentity::anonymous(),
        };
        let history = SessionHistory::new(
            Arc::new(SqliteSessionStore::open_at(&path)?),
            Arc::new(identity),
            Box::new(Database::open_at(&path)?),
        );

        let state = load_state(&db, &config);
        let mut tracker = Tracker::with_state(SystemClock, history, state);
        tracker.sync();
        let events = tracker.tick();

        Ok((
            Self {
                config,
                db,
                tracker,
            },
            events,
        ))
    }

    pub fn save(&self) -> CliResult {
        save_state(&self.db, &self.tracker.state())
    }
}

fn load_state(db: &Database, config: &Config) -> TrackerState {
    if let Ok(Some(json)) = db.kv_get(STATE_KEY) {
        match serde_json::from_str::<TrackerState>(&json) {
            Ok(state) => return state,
            Err(e) => tracing::warn!(error = %e, "discarding unreadable tracker state"),
        }
    }
    TrackerState {
        timer: TimerEngine::with_duration(config.timer.default_duration_secs),
        ..TrackerState::default()
    }
}

pub fn save_state(db: &Database, state: &TrackerState) -> CliResult {
    let json = serde_json::to_string(state)?;
    db.kv_set(STATE_KEY, &json)?;
    Ok(())
}

/// One JSON document per line on stdout.
pub fn emit<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

pub fn emit_all(events: &[Event]) -> CliResult {
    for event in events {
        emit(event)?;
    }
    Ok(())
}
