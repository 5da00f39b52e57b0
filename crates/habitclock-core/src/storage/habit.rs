//! Habit and history log records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::DayKey;

/// Stable identifier of a habit for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(Uuid);

impl HabitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for HabitId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One day's accumulated duration for a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLog {
    pub day: DayKey,
    pub duration_ms: i64,
}

/// A user-defined, time-tracked activity.
///
/// Fields are private: only [`HabitStore`](super::HabitStore) mutates a habit,
/// and every copy handed out is a clone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    id: HabitId,
    name: String,
    color: String,
    target_ms: i64,
    total_ms: i64,
    started_at: Option<DateTime<Local>>,
    created_at: DateTime<Local>,
    history: BTreeMap<DayKey, i64>,
}

impl Habit {
    pub(crate) fn new(name: String, color: String, target_ms: i64, created_at: DateTime<Local>) -> Self {
        Self {
            id: HabitId::new(),
            name,
            color,
            target_ms,
            total_ms: 0,
            started_at: None,
            created_at,
            history: BTreeMap::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> HabitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque display tag.
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Daily goal in milliseconds.
    pub fn target_ms(&self) -> i64 {
        self.target_ms
    }

    /// Cumulative logged time across all days.
    pub fn total_ms(&self) -> i64 {
        self.total_ms
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// History entries, oldest day first.
    pub fn history(&self) -> impl Iterator<Item = HistoryLog> + '_ {
        self.history
            .iter()
            .map(|(&day, &duration_ms)| HistoryLog { day, duration_ms })
    }

    /// Logged duration on `day`, 0 if nothing was logged.
    pub fn logged_on(&self, day: DayKey) -> i64 {
        self.history.get(&day).copied().unwrap_or(0)
    }

    pub fn history_sum_ms(&self) -> i64 {
        self.history.values().sum()
    }

    // ── Mutation (store only) ────────────────────────────────────────

    pub(crate) fn mark_started(&mut self, at: DateTime<Local>) {
        self.started_at = Some(at);
    }

    pub(crate) fn clear_running(&mut self) {
        self.started_at = None;
    }

    /// Adds `duration_ms` to both the total and the `day` entry, or to neither.
    pub(crate) fn record(&mut self, day: DayKey, duration_ms: i64) -> Option<HistoryLog> {
        let total = self.total_ms.checked_add(duration_ms)?;
        let logged = self.logged_on(day).checked_add(duration_ms)?;
        self.total_ms = total;
        self.history.insert(day, logged);
        Some(HistoryLog {
            day,
            duration_ms: logged,
        })
    }
}
