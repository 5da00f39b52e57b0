//! Core error types for habitclock-core.
//!
//! Every fallible operation returns [`CoreError`]. The taxonomy mirrors how
//! callers are expected to react:
//! - [`ValidationError`]: rejected input, nothing changed
//! - [`ConflictError`]: another timer is active, stop it first
//! - [`CoreError::NotFound`]: unknown habit id, treat as a no-op with a warning

use std::path::PathBuf;
use thiserror::Error;

use crate::storage::HabitId;
use crate::timer::TimerPhase;

/// Core error type for habitclock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A second concurrent timer was requested
    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// Unknown habit id
    #[error("Habit not found: {id}")]
    NotFound { id: HabitId },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Habit name is empty after trimming
    #[error("Habit name must not be empty")]
    EmptyName,

    /// A duration that must be non-negative was negative
    #[error("Duration '{field}' must not be negative (got {value_ms} ms)")]
    NegativeDuration { field: String, value_ms: i64 },

    /// Countdown target resolved to zero or less
    #[error("Countdown target must be positive (got {minutes} min {seconds} s)")]
    NonPositiveCountdown { minutes: i64, seconds: i64 },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Conflict errors: the single-active-timer rule would be broken.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// Another habit is already running
    #[error("Habit {running} is already running; stop it first")]
    HabitAlreadyRunning { running: HabitId },

    /// The shared timer is in use and cannot be rebound
    #[error("Timer is busy ({phase:?}); reset or stop it first")]
    TimerBusy { phase: TimerPhase },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl CoreError {
    /// True for errors the presentation layer should surface as a rejected
    /// action rather than a failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_) | CoreError::Conflict(_) | CoreError::NotFound { .. }
        )
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
