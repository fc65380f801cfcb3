mod config;
pub mod counter;
pub mod database;
pub mod session_store;
pub mod sqlite_store;

pub use config::{AccountConfig, Config, GoalsConfig, TimerConfig};
pub use counter::{MemoryCounter, SessionCounter};
pub use database::Database;
pub use session_store::{NewSession, RemoteChange, SessionStore, StoredSession, Subscription};
pub use sqlite_store::SqliteSessionStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/vingtcinq[-dev]/` based on VINGTCINQ_ENV.
///
/// Set VINGTCINQ_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("VINGTCINQ_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("vingtcinq-dev")
    } else {
        base_dir.join("vingtcinq")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
