use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::DayKey;
use crate::storage::HabitId;
use crate::timer::{Lap, TimerMode, TimerReading};

/// Every state change in the timer or the habit session produces an Event.
/// The presentation layer renders from them; tick subscribers receive the
/// embedded reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        /// Countdown length; absent for stopwatches.
        target_ms: Option<i64>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        elapsed_ms: i64,
        remaining_ms: Option<i64>,
        at: DateTime<Utc>,
    },
    TimerResumed {
        elapsed_ms: i64,
        at: DateTime<Utc>,
    },
    /// Uncommitted time was thrown away.
    TimerReset {
        discarded_ms: i64,
        at: DateTime<Utc>,
    },
    LapRecorded {
        lap: Lap,
        at: DateTime<Utc>,
    },
    ModeChanged {
        mode: TimerMode,
        at: DateTime<Utc>,
    },
    CountdownConfigured {
        target_ms: i64,
        at: DateTime<Utc>,
    },
    /// Periodic re-read of the running timer.
    Tick {
        reading: TimerReading,
    },
    CountdownFinished {
        target_ms: i64,
        at: DateTime<Utc>,
    },
    HabitStarted {
        habit_id: HabitId,
        at: DateTime<Utc>,
    },
    /// Elapsed time was written to the habit's history.
    SessionCommitted {
        habit_id: HabitId,
        elapsed_ms: i64,
        day: DayKey,
        /// Total logged on `day` after this commit.
        day_total_ms: i64,
        at: DateTime<Utc>,
    },
    /// The habit's running session ended without recording time.
    SessionDiscarded {
        habit_id: HabitId,
        discarded_ms: i64,
        at: DateTime<Utc>,
    },
}
