//! # Vingt-Cinq Core Library
//!
//! Core logic for the Vingt-Cinq focus timer: a drift-free countdown, a
//! per-session time accumulator, session numbering and history with an
//! optional remote store, and a fixed-duration break timer.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine. Every operation
//!   receives the current instant; the caller (or [`ticker`]) invokes
//!   `tick()` periodically and whenever the host wakes up
//! - **Session History**: Numbering, naming and merging of local and
//!   remote sessions, with best-effort persistence
//! - **Storage**: SQLite key-value state and session rows, TOML configuration
//! - **Tracker**: One facade over both engines, the history and a [`Clock`]
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Focus timer state machine
//! - [`BreakEngine`]: Short/long break timer
//! - [`SessionHistory`]: Completed sessions and their sync state
//! - [`Tracker`]: Host-facing facade
//! - [`Config`]: Application configuration management

pub mod auth;
pub mod clock;
pub mod error;
pub mod events;
pub mod session;
pub mod stats;
pub mod storage;
pub mod ticker;
pub mod time_format;
pub mod timer;
pub mod tracker;

pub use auth::{Identity, StaticIdentity, User};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, StoreError};
pub use events::Event;
pub use session::{CompletedSession, SessionAccumulator, SessionData, SessionHistory, SyncOutcome};
pub use stats::{Export, Statistics};
pub use storage::{Config, Database, SessionStore, SqliteSessionStore};
pub use time_format::{format_clock, parse_time_to_seconds};
pub use timer::{BreakEngine, BreakKind, TimerEngine, TimerState};
pub use tracker::{Tracker, TrackerState};
