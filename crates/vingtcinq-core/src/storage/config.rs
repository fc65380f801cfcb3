//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Timer recomputation cadences and the default duration
//! - Daily focus goal
//! - The account the CLI presents to the session store
//!
//! Configuration is stored at `~/.config/vingtcinq/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::auth::User;
use crate::error::ConfigError;

/// Timer-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_running_cadence_ms")]
    pub running_cadence_ms: u64,
    #[serde(default = "default_paused_cadence_ms")]
    pub paused_cadence_ms: u64,
    /// Duration preloaded into a fresh timer. The timer starts at 00:00 by default.
    #[serde(default)]
    pub default_duration_secs: u64,
}

/// Daily goal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalsConfig {
    /// Hours of focus per day; 0 disables the goal.
    #[serde(default)]
    pub daily_goal_hours: u32,
}

/// Account used for session sync. Empty means local-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/vingtcinq/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub goals: GoalsConfig,
    #[serde(default)]
    pub account: AccountConfig,
}

fn default_running_cadence_ms() -> u64 {
    100
}
fn default_paused_cadence_ms() -> u64 {
    1000
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            running_cadence_ms: default_running_cadence_ms(),
            paused_cadence_ms: default_paused_cadence_ms(),
            default_duration_secs: 0,
        }
    }
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self { daily_goal_hours: 0 }
    }
}

impl TimerConfig {
    pub fn running_cadence(&self) -> Duration {
        Duration::from_millis(self.running_cadence_ms.max(1))
    }

    pub fn paused_cadence(&self) -> Duration {
        Duration::from_millis(self.paused_cadence_ms.max(1))
    }
}

impl AccountConfig {
    /// The configured user, if any.
    pub fn user(&self) -> Option<User> {
        let id = self.user_id.trim();
        if id.is_empty() {
            return None;
        }
        let email = self.email.trim();
        Some(User {
            id: id.to_string(),
            email: (!email.is_empty()).then(|| email.to_string()),
        })
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as a non-negative integer")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key in memory. Returns error if the key
    /// is unknown or the value has the wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.running_cadence_ms, 100);
        assert_eq!(parsed.timer.paused_cadence_ms, 1000);
        assert_eq!(parsed.goals.daily_goal_hours, 0);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[goals]\ndaily_goal_hours = 4\n").unwrap();
        assert_eq!(parsed.goals.daily_goal_hours, 4);
        assert_eq!(parsed.timer.running_cadence_ms, 100);
        assert!(parsed.account.user().is_none());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.running_cadence_ms").as_deref(), Some("100"));
        assert_eq!(cfg.get("account.user_id").as_deref(), Some(""));
        assert!(cfg.get("timer").is_none());
        assert!(cfg.get("timer.missing_key").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("goals.daily_goal_hours", "6").unwrap();
        cfg.set("account.user_id", "user-1").unwrap();
        assert_eq!(cfg.goals.daily_goal_hours, 6);
        assert_eq!(cfg.account.user().unwrap().id, "user-1");
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("goals.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("goals.daily_goal_hours", "lots"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(cfg.set("timer", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn load_from_writes_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.timer.running_cadence_ms, 100);

        let mut edited = cfg.clone();
        edited.goals.daily_goal_hours = 3;
        edited.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().goals.daily_goal_hours, 3);
    }

    #[test]
    fn account_user_trims_fields() {
        let account = AccountConfig {
            user_id: "  u-9 ".into(),
            email: " ".into(),
        };
        let user = account.user().unwrap();
        assert_eq!(user.id, "u-9");
        assert!(user.email.is_none());
    }
}
