//! # Habitclock Core Library
//!
//! This library provides the core logic for the Habitclock habit time
//! tracker: a list of habits with per-day logged time, a stopwatch/countdown
//! timer, and statistics derived from the log. Presentation layers drive it
//! through [`HabitTracker`] and render the values it returns.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine. Elapsed time is
//!   always recomputed from the clock, so missed or late ticks never skew it
//! - **Storage**: In-memory habit store with per-day history, plus TOML-based
//!   configuration
//! - **Stats**: Pure functions from a habit snapshot to totals, streaks, the
//!   weekly series and the ranking
//!
//! ## Key Components
//!
//! - [`HabitTracker`]: Owns the store and the timer, applies commands
//! - [`TimerEngine`]: Core timer state machine
//! - [`HabitStore`]: Habits and their time log
//! - [`StatsAggregator`]: Derived statistics
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod stats;
pub mod storage;
pub mod timer;
pub mod tracker;

pub use clock::{Clock, DayKey, ManualClock, SystemClock};
pub use error::{ConfigError, ConflictError, CoreError, Result, ValidationError};
pub use events::Event;
pub use stats::{HabitRank, LiveSession, Stats, StatsAggregator, TodayEntry, WeeklyBucket};
pub use storage::{Config, Habit, HabitId, HabitStore, HistoryLog};
pub use timer::{
    format_clock, format_duration_long, CountdownSetting, Lap, TimerEngine, TimerMode, TimerPhase,
    TimerReading,
};
pub use tracker::HabitTracker;
