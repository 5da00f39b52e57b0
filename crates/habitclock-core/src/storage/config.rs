//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Tick cadence for the timer display
//! - Countdown defaults and quick-select presets
//! - Habit form defaults (target time, color palette)
//! - Stats window length
//!
//! Configuration is stored at `~/.config/habitclock/config.toml`. Habits and
//! their history are never written here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

/// Timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Coarse tick period for whole-second displays.
    #[serde(default = "default_display_tick_ms")]
    pub display_tick_ms: u64,
    /// Fine tick period for centisecond displays.
    #[serde(default = "default_fine_tick_ms")]
    pub fine_tick_ms: u64,
    #[serde(default = "default_countdown_minutes")]
    pub default_countdown_minutes: i64,
    #[serde(default)]
    pub default_countdown_seconds: i64,
    /// Quick-select countdown lengths, in minutes.
    #[serde(default = "default_countdown_presets")]
    pub countdown_presets: Vec<i64>,
}

/// Habit form defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitsConfig {
    #[serde(default = "default_target_minutes")]
    pub default_target_minutes: i64,
    #[serde(default = "default_color")]
    pub default_color: String,
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
    /// Target choices offered by the habit form, in minutes.
    #[serde(default = "default_target_presets")]
    pub target_presets: Vec<i64>,
}

/// Stats configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_week_length_days")]
    pub week_length_days: u32,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub habits: HabitsConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

// Default functions
fn default_display_tick_ms() -> u64 {
    1000
}
fn default_fine_tick_ms() -> u64 {
    10
}
fn default_countdown_minutes() -> i64 {
    5
}
fn default_countdown_presets() -> Vec<i64> {
    vec![1, 5, 10, 15, 25, 30]
}
fn default_target_minutes() -> i64 {
    30
}
fn default_color() -> String {
    "#4A90E2".into()
}
fn default_palette() -> Vec<String> {
    [
        "#4A90E2", "#67C23A", "#E6A23C", "#F56C6C", "#909399", "#9B59B6", "#1ABC9C", "#E95F3C",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}
fn default_target_presets() -> Vec<i64> {
    vec![15, 30, 45, 60, 90, 120]
}
fn default_week_length_days() -> u32 {
    7
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            display_tick_ms: default_display_tick_ms(),
            fine_tick_ms: default_fine_tick_ms(),
            default_countdown_minutes: default_countdown_minutes(),
            default_countdown_seconds: 0,
            countdown_presets: default_countdown_presets(),
        }
    }
}

impl Default for HabitsConfig {
    fn default() -> Self {
        Self {
            default_target_minutes: default_target_minutes(),
            default_color: default_color(),
            palette: default_palette(),
            target_presets: default_target_presets(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            week_length_days: default_week_length_days(),
        }
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
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<i64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
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

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from the default location, or return defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, or return defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `path`.
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
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// into the existing field's type. The config is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timer.display_tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timer.display_tick_ms".into(),
                message: "tick period must be positive".into(),
            });
        }
        if self.timer.fine_tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timer.fine_tick_ms".into(),
                message: "tick period must be positive".into(),
            });
        }
        if self.stats.week_length_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "stats.week_length_days".into(),
                message: "window must cover at least one day".into(),
            });
        }
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
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
        let parsed = Config::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.display_tick_ms, 1000);
        assert_eq!(parsed.habits.palette.len(), 8);
        assert_eq!(parsed.stats.week_length_days, 7);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = Config::from_toml_str("[timer]\nfine_tick_ms = 50\n").unwrap();
        assert_eq!(cfg.timer.fine_tick_ms, 50);
        assert_eq!(cfg.timer.display_tick_ms, 1000);
        assert_eq!(cfg.habits.default_target_minutes, 30);
    }

    #[test]
    fn zero_tick_is_rejected() {
        assert!(matches!(
            Config::from_toml_str("[timer]\ndisplay_tick_ms = 0\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn get_and_set_by_dotted_key() {
        let mut cfg = Config::default();
        assert_eq!(cfg.get("habits.default_color").as_deref(), Some("#4A90E2"));
        cfg.set("timer.default_countdown_minutes", "25").unwrap();
        assert_eq!(cfg.timer.default_countdown_minutes, 25);
        cfg.set("timer.countdown_presets", "[2, 4]").unwrap();
        assert_eq!(cfg.timer.countdown_presets, vec![2, 4]);
    }

    #[test]
    fn set_rejects_unknown_or_malformed() {
        let mut cfg = Config::default();
        assert!(matches!(cfg.set("timer.nope", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(
            cfg.set("timer.fine_tick_ms", "fast"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.set("stats.week_length_days", "0").is_err());
        assert_eq!(cfg.stats.week_length_days, 7);
    }

    #[test]
    fn load_from_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg.habits.default_target_minutes, 30);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.habits.default_color = "#67C23A".into();
        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.habits.default_color, "#67C23A");
    }
}
