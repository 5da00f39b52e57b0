mod config;
mod habit;
mod habit_store;

pub use config::{Config, HabitsConfig, StatsConfig, TimerConfig};
pub use habit::{Habit, HabitId, HistoryLog};
pub use habit_store::HabitStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/habitclock[-dev]/` based on HABITCLOCK_ENV.
///
/// Set HABITCLOCK_ENV=dev to use development data directory. Only the
/// configuration file lives here.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HABITCLOCK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("habitclock-dev")
    } else {
        base_dir.join("habitclock")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
