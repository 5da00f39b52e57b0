//! Daily, weekly, streak and ranking statistics.
//!
//! Everything here is a pure function of a habit snapshot and the current
//! calendar day. Only committed history is counted; time on a running timer
//! is invisible until it is stopped.

use std::collections::BTreeSet;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::clock::DayKey;
use crate::storage::{Habit, HabitId};

/// One day of the weekly series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    pub day: DayKey,
    pub weekday: Weekday,
    pub day_of_month: u32,
    /// Sum of all habits' logged time on `day`.
    pub total_ms: i64,
}

/// A habit's position in the all-time ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitRank {
    pub id: HabitId,
    pub name: String,
    pub color: String,
    pub total_time_ms: i64,
    pub target_time_ms: i64,
    /// `total / target`, capped at 1.0; 0.0 without a target.
    pub completion_rate: f64,
}

/// Derived statistics for the whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Logged today across all habits.
    pub today_time_ms: i64,
    /// Sum of every habit's total.
    pub total_time_ms: i64,
    /// Sum of every habit's daily target.
    pub target_time_ms: i64,
    /// Today's time against the summed target, 0..=100.
    pub today_completion_pct: f64,
    /// Distinct days with any logged time.
    pub active_days: usize,
    /// Consecutive logged days ending today; 0 if today is empty.
    pub current_streak: u32,
    /// Daily totals, oldest first, ending today.
    pub weekly_time: Vec<i64>,
    /// Same series with calendar labels.
    pub weekly: Vec<WeeklyBucket>,
    /// Habits by total time, descending; ties keep insertion order.
    pub habit_ranking: Vec<HabitRank>,
}

/// Computes [`Stats`] from a snapshot of habits.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    /// Number of days in the weekly series.
    pub week_length_days: u32,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self {
            week_length_days: 7,
        }
    }
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_week_length(week_length_days: u32) -> Self {
        Self { week_length_days }
    }

    pub fn compute(&self, habits: &[Habit], today: DayKey) -> Stats {
        let today_time_ms = today_time(habits, today);
        let target_time_ms = saturating_sum(habits.iter().map(Habit::target_ms));
        let active = active_days(habits);
        let weekly = weekly_series(habits, today, self.week_length_days);

        Stats {
            today_time_ms,
            total_time_ms: saturating_sum(habits.iter().map(Habit::total_ms)),
            target_time_ms,
            today_completion_pct: completion_pct(today_time_ms, target_time_ms),
            active_days: active.len(),
            current_streak: current_streak(&active, today),
            weekly_time: weekly.iter().map(|b| b.total_ms).collect(),
            weekly,
            habit_ranking: ranking(habits),
        }
    }
}

/// Time logged on `today` across all habits.
pub fn today_time(habits: &[Habit], today: DayKey) -> i64 {
    saturating_sum(habits.iter().map(|h| h.logged_on(today)))
}

/// Every day that has a history entry in any habit.
pub fn active_days(habits: &[Habit]) -> BTreeSet<DayKey> {
    habits
        .iter()
        .flat_map(|h| h.history().map(|log| log.day))
        .collect()
}

/// Walks back from `today` while each day is active.
pub fn current_streak(active: &BTreeSet<DayKey>, today: DayKey) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while active.contains(&day) {
        streak += 1;
        let prev = day.pred();
        if prev == day {
            break;
        }
        day = prev;
    }
    streak
}

/// Daily totals for the `days` days ending at `today`, oldest first.
pub fn weekly_series(habits: &[Habit], today: DayKey, days: u32) -> Vec<WeeklyBucket> {
    (0..u64::from(days))
        .rev()
        .map(|offset| {
            let day = today.days_before(offset);
            WeeklyBucket {
                day,
                weekday: day.weekday(),
                day_of_month: day.day_of_month(),
                total_ms: saturating_sum(habits.iter().map(|h| h.logged_on(day))),
            }
        })
        .collect()
}

/// Habits sorted by total time, descending. The sort is stable.
pub fn ranking(habits: &[Habit]) -> Vec<HabitRank> {
    let mut ranked: Vec<&Habit> = habits.iter().collect();
    ranked.sort_by(|a, b| b.total_ms().cmp(&a.total_ms()));
    ranked
        .into_iter()
        .map(|h| HabitRank {
            id: h.id(),
            name: h.name().to_string(),
            color: h.color().to_string(),
            total_time_ms: h.total_ms(),
            target_time_ms: h.target_ms(),
            completion_rate: completion_rate(h.total_ms(), h.target_ms()),
        })
        .collect()
}

/// Sums durations, pinning at `i64::MAX` instead of overflowing. Each habit
/// is bounded on its own, but the store-wide sum is not.
pub(crate) fn saturating_sum(values: impl IntoIterator<Item = i64>) -> i64 {
    values.into_iter().fold(0, i64::saturating_add)
}

/// `total / target` capped at 1.0, defined as 0.0 when there is no target.
pub fn completion_rate(total_ms: i64, target_ms: i64) -> f64 {
    if target_ms <= 0 {
        return 0.0;
    }
    (total_ms as f64 / target_ms as f64).clamp(0.0, 1.0)
}

/// [`completion_rate`] as a percentage.
pub fn completion_pct(done_ms: i64, target_ms: i64) -> f64 {
    completion_rate(done_ms, target_ms) * 100.0
}
