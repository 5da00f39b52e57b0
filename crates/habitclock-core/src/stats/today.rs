//! Per-habit view of today's progress.
//!
//! Committed history is the source for every habit. The running habit also
//! shows the timer's live, not yet committed reading; that reading is written
//! to history only when the session stops and the timer resets, so no
//! millisecond is counted twice.

use serde::{Deserialize, Serialize};

use super::aggregator::completion_pct;
use crate::clock::DayKey;
use crate::storage::{Habit, HabitId};

/// Uncommitted time on the running habit's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSession {
    pub habit_id: HabitId,
    pub elapsed_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayEntry {
    pub habit_id: HabitId,
    pub name: String,
    pub color: String,
    pub target_ms: i64,
    /// Logged in history today.
    pub committed_ms: i64,
    /// Live timer reading, running habit only.
    pub live_ms: i64,
    /// `committed_ms + live_ms`.
    pub today_ms: i64,
    pub is_running: bool,
    /// Today's time against the daily target, 0..=100.
    pub completion_pct: f64,
}

/// Annotate each habit with today's time and running flag.
pub fn today_view(habits: &[Habit], today: DayKey, live: Option<LiveSession>) -> Vec<TodayEntry> {
    habits
        .iter()
        .map(|h| {
            let committed_ms = h.logged_on(today);
            let live_ms = live
                .filter(|s| s.habit_id == h.id() && h.is_running())
                .map_or(0, |s| s.elapsed_ms.max(0));
            let today_ms = committed_ms.saturating_add(live_ms);
            TodayEntry {
                habit_id: h.id(),
                name: h.name().to_string(),
                color: h.color().to_string(),
                target_ms: h.target_ms(),
                committed_ms,
                live_ms,
                today_ms,
                is_running: h.is_running(),
                completion_pct: completion_pct(today_ms, h.target_ms()),
            }
        })
        .collect()
}
