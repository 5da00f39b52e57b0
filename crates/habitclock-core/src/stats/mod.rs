//! Statistics module for Habitclock
//!
//! This module derives read-only views from the habit store: today's time,
//! all-time totals, active days, the current streak, the weekly series and
//! the habit ranking. Results are recomputed on every call from a snapshot.

mod aggregator;
mod today;

pub use aggregator::{
    active_days, completion_pct, completion_rate, current_streak, ranking, today_time,
    weekly_series, HabitRank, Stats, StatsAggregator, WeeklyBucket,
};

pub use today::{today_view, LiveSession, TodayEntry};
