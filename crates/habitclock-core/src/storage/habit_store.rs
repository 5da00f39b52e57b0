//! In-memory time-log store.
//!
//! Holds habits in insertion order together with their per-day history.
//! The store enforces two invariants:
//! - at most one habit is running at any instant
//! - `total_ms` always equals the sum of the habit's history entries
//!
//! Every mutation validates first and applies second, so a rejected command
//! leaves the store untouched.

use std::sync::Arc;

use tracing::{info, warn};

use super::habit::{Habit, HabitId, HistoryLog};
use crate::clock::{Clock, DayKey};
use crate::error::{ConflictError, CoreError, Result, ValidationError};

/// Repository of habits and their history logs.
///
/// Constructed by the composition root and passed by reference; there is no
/// process-wide instance.
pub struct HabitStore {
    habits: Vec<Habit>,
    clock: Arc<dyn Clock>,
}

impl HabitStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            habits: Vec::new(),
            clock,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Copies of all habits in insertion order.
    pub fn get_all_habits(&self) -> Vec<Habit> {
        self.habits.clone()
    }

    pub fn get_habit(&self, id: HabitId) -> Option<Habit> {
        self.find(id).cloned()
    }

    /// Read-only view used by the stats aggregator.
    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn contains(&self, id: HabitId) -> bool {
        self.find(id).is_some()
    }

    pub fn running_habit(&self) -> Option<HabitId> {
        self.habits.iter().find(|h| h.is_running()).map(Habit::id)
    }

    /// Committed time logged for `id` on `day`.
    pub fn today_time(&self, id: HabitId, day: DayKey) -> Result<i64> {
        self.find(id)
            .map(|h| h.logged_on(day))
            .ok_or(CoreError::NotFound { id })
    }

    pub fn len(&self) -> usize {
        self.habits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.habits.is_empty()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Create a habit with zeroed counters.
    ///
    /// # Errors
    /// `ValidationError` if the trimmed name is empty or `target_ms` is negative.
    pub fn add_habit(&mut self, name: &str, color: &str, target_ms: i64) -> Result<Habit> {
        let name = name.trim();
        if name.is_empty() {
            warn!("rejected habit with empty name");
            return Err(ValidationError::EmptyName.into());
        }
        if target_ms < 0 {
            warn!(target_ms, "rejected habit with negative target");
            return Err(ValidationError::NegativeDuration {
                field: "target_ms".into(),
                value_ms: target_ms,
            }
            .into());
        }

        let habit = Habit::new(name.to_string(), color.to_string(), target_ms, self.clock.now());
        info!(id = %habit.id(), name = habit.name(), target_ms, "habit added");
        self.habits.push(habit.clone());
        Ok(habit)
    }

    /// Remove a habit and all of its history.
    ///
    /// A running habit is removed without recording its in-flight time.
    ///
    /// # Errors
    /// `NotFound` if `id` is unknown.
    pub fn delete_habit(&mut self, id: HabitId) -> Result<Habit> {
        let index = self
            .habits
            .iter()
            .position(|h| h.id() == id)
            .ok_or_else(|| not_found(id))?;
        let removed = self.habits.remove(index);
        info!(
            %id,
            was_running = removed.is_running(),
            "habit deleted"
        );
        Ok(removed)
    }

    /// Mark a habit as running.
    ///
    /// # Errors
    /// `NotFound` if `id` is unknown; `Conflict` if any habit (including this
    /// one) is already running. The running habit is left untouched.
    pub fn start_habit(&mut self, id: HabitId) -> Result<()> {
        if self.find(id).is_none() {
            return Err(not_found(id));
        }
        if let Some(running) = self.running_habit() {
            warn!(%id, %running, "start rejected: another habit is running");
            return Err(ConflictError::HabitAlreadyRunning { running }.into());
        }

        let now = self.clock.now();
        if let Some(habit) = self.find_mut(id) {
            habit.mark_started(now);
        }
        info!(%id, "habit started");
        Ok(())
    }

    /// Commit `elapsed_ms` to a running habit and clear its running flag.
    ///
    /// The duration is trusted as given; it is not recomputed from
    /// `started_at`. Returns today's updated log entry, or `None` when the
    /// habit was not running (no-op).
    ///
    /// # Errors
    /// `NotFound` if `id` is unknown; `ValidationError` if `elapsed_ms` is
    /// negative or would overflow the accumulated totals.
    pub fn stop_habit(&mut self, id: HabitId, elapsed_ms: i64) -> Result<Option<HistoryLog>> {
        if elapsed_ms < 0 {
            warn!(%id, elapsed_ms, "stop rejected: negative duration");
            return Err(ValidationError::NegativeDuration {
                field: "elapsed_ms".into(),
                value_ms: elapsed_ms,
            }
            .into());
        }
        let today = self.clock.today();
        let habit = self.find_mut(id).ok_or_else(|| not_found(id))?;
        if !habit.is_running() {
            return Ok(None);
        }

        let log = habit.record(today, elapsed_ms).ok_or_else(|| overflow(elapsed_ms))?;
        habit.clear_running();
        info!(%id, elapsed_ms, day = %today, logged_ms = log.duration_ms, "habit stopped");
        Ok(Some(log))
    }

    /// Clear the running flag without recording any time.
    ///
    /// Returns whether the habit was running.
    ///
    /// # Errors
    /// `NotFound` if `id` is unknown.
    pub fn cancel_habit(&mut self, id: HabitId) -> Result<bool> {
        let habit = self.find_mut(id).ok_or_else(|| not_found(id))?;
        let was_running = habit.is_running();
        habit.clear_running();
        if was_running {
            info!(%id, "habit session discarded");
        }
        Ok(was_running)
    }

    /// Add `duration_ms` to the log of an arbitrary day, e.g. to backfill
    /// time tracked elsewhere. Does not touch the running flag.
    ///
    /// # Errors
    /// `NotFound` if `id` is unknown; `ValidationError` if the duration is
    /// negative or would overflow.
    pub fn insert_log(&mut self, id: HabitId, day: DayKey, duration_ms: i64) -> Result<HistoryLog> {
        if duration_ms < 0 {
            return Err(ValidationError::NegativeDuration {
                field: "duration_ms".into(),
                value_ms: duration_ms,
            }
            .into());
        }
        let habit = self.find_mut(id).ok_or_else(|| not_found(id))?;
        habit.record(day, duration_ms).ok_or_else(|| overflow(duration_ms))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn find(&self, id: HabitId) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id() == id)
    }

    fn find_mut(&mut self, id: HabitId) -> Option<&mut Habit> {
        self.habits.iter_mut().find(|h| h.id() == id)
    }
}

fn not_found(id: HabitId) -> CoreError {
    warn!(%id, "unknown habit id");
    CoreError::NotFound { id }
}

fn overflow(duration_ms: i64) -> CoreError {
    ValidationError::InvalidValue {
        field: "duration_ms".into(),
        message: format!("adding {duration_ms} ms overflows the accumulated total"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Local, TimeZone};

    fn store() -> (HabitStore, ManualClock) {
        let clock = ManualClock::at(Local.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap());
        (HabitStore::new(Arc::new(clock.clone())), clock)
    }

    fn assert_consistent(store: &HabitStore) {
        for h in store.habits() {
            assert_eq!(h.total_ms(), h.history_sum_ms(), "habit {}", h.name());
        }
        assert!(store.habits().iter().filter(|h| h.is_running()).count() <= 1);
    }

    #[test]
    fn add_habit_assigns_fresh_ids_and_zero_counters() {
        let (mut store, _) = store();
        let a = store.add_habit("Study", "#4A90E2", 30 * 60_000).unwrap();
        let b = store.add_habit("Study", "#4A90E2", 30 * 60_000).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.total_ms(), 0);
        assert!(!a.is_running());
        assert_eq!(a.history().count(), 0);
    }

    #[test]
    fn add_habit_validates_input() {
        let (mut store, _) = store();
        assert!(matches!(
            store.add_habit("   ", "#fff", 0),
            Err(CoreError::Validation(ValidationError::EmptyName))
        ));
        assert!(matches!(
            store.add_habit("Read", "#fff", -1),
            Err(CoreError::Validation(ValidationError::NegativeDuration { .. }))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn second_start_conflicts_without_touching_first() {
        let (mut store, _) = store();
        let a = store.add_habit("Study", "#4A90E2", 0).unwrap().id();
        let b = store.add_habit("Read", "#67C23A", 0).unwrap().id();
        store.start_habit(a).unwrap();
        let before = store.get_habit(a).unwrap().started_at();

        let err = store.start_habit(b).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict(ConflictError::HabitAlreadyRunning { running }) if running == a
        ));
        assert_eq!(store.get_habit(a).unwrap().started_at(), before);
        assert!(!store.get_habit(b).unwrap().is_running());
        assert_consistent(&store);
    }

    #[test]
    fn repeated_stops_accumulate_into_one_entry() {
        let (mut store, _) = store();
        let id = store.add_habit("Study", "#4A90E2", 0).unwrap().id();
        store.start_habit(id).unwrap();
        store.stop_habit(id, 60_000).unwrap();
        store.start_habit(id).unwrap();
        let log = store.stop_habit(id, 30_000).unwrap().unwrap();

        let habit = store.get_habit(id).unwrap();
        assert_eq!(log.duration_ms, 90_000);
        assert_eq!(habit.history().count(), 1);
        assert_eq!(habit.total_ms(), 90_000);
        assert_consistent(&store);
    }

    #[test]
    fn stop_twice_records_once() {
        let (mut store, _) = store();
        let id = store.add_habit("Study", "#4A90E2", 0).unwrap().id();
        store.start_habit(id).unwrap();
        assert!(store.stop_habit(id, 5_000).unwrap().is_some());
        assert!(store.stop_habit(id, 5_000).unwrap().is_none());
        assert_eq!(store.get_habit(id).unwrap().total_ms(), 5_000);
    }

    #[test]
    fn negative_stop_is_rejected_and_habit_keeps_running() {
        let (mut store, _) = store();
        let id = store.add_habit("Study", "#4A90E2", 0).unwrap().id();
        store.start_habit(id).unwrap();
        assert!(matches!(
            store.stop_habit(id, -1),
            Err(CoreError::Validation(_))
        ));
        let habit = store.get_habit(id).unwrap();
        assert!(habit.is_running());
        assert_eq!(habit.total_ms(), 0);
    }

    #[test]
    fn overflowing_stop_changes_nothing() {
        let (mut store, clock) = store();
        let id = store.add_habit("Study", "#4A90E2", 0).unwrap().id();
        store.insert_log(id, clock.today().pred(), i64::MAX).unwrap();
        store.start_habit(id).unwrap();
        assert!(store.stop_habit(id, 1).is_err());
        let habit = store.get_habit(id).unwrap();
        assert!(habit.is_running());
        assert_eq!(habit.logged_on(clock.today()), 0);
        assert_consistent(&store);
    }

    #[test]
    fn stop_logs_against_the_current_day() {
        let (mut store, clock) = store();
        let id = store.add_habit("Study", "#4A90E2", 0).unwrap().id();
        store.start_habit(id).unwrap();
        store.stop_habit(id, 1_000).unwrap();
        clock.advance(chrono::Duration::days(1));
        store.start_habit(id).unwrap();
        store.stop_habit(id, 2_000).unwrap();

        let habit = store.get_habit(id).unwrap();
        let days: Vec<_> = habit.history().map(|l| l.duration_ms).collect();
        assert_eq!(days, vec![1_000, 2_000]);
        assert_consistent(&store);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let (mut store, clock) = store();
        let ghost = HabitId::new();
        assert!(matches!(store.start_habit(ghost), Err(CoreError::NotFound { .. })));
        assert!(matches!(store.stop_habit(ghost, 0), Err(CoreError::NotFound { .. })));
        assert!(matches!(store.delete_habit(ghost), Err(CoreError::NotFound { .. })));
        assert!(matches!(store.cancel_habit(ghost), Err(CoreError::NotFound { .. })));
        assert!(matches!(
            store.today_time(ghost, clock.today()),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_running_habit_frees_the_slot() {
        let (mut store, _) = store();
        let a = store.add_habit("Study", "#4A90E2", 0).unwrap().id();
        let b = store.add_habit("Read", "#67C23A", 0).unwrap().id();
        store.start_habit(a).unwrap();
        let removed = store.delete_habit(a).unwrap();
        assert!(removed.is_running());
        assert_eq!(store.running_habit(), None);
        store.start_habit(b).unwrap();
        assert_eq!(store.running_habit(), Some(b));
    }

    #[test]
    fn copies_do_not_alias_internal_state() {
        let (mut store, _) = store();
        let id = store.add_habit("Study", "#4A90E2", 0).unwrap().id();
        let mut copies = store.get_all_habits();
        copies.clear();
        assert_eq!(store.len(), 1);
        store.start_habit(id).unwrap();
        store.stop_habit(id, 10).unwrap();
        assert_eq!(store.get_all_habits()[0].total_ms(), 10);
    }

    #[test]
    fn cancel_discards_without_recording() {
        let (mut store, _) = store();
        let id = store.add_habit("Study", "#4A90E2", 0).unwrap().id();
        store.start_habit(id).unwrap();
        assert!(store.cancel_habit(id).unwrap());
        assert!(!store.cancel_habit(id).unwrap());
        let habit = store.get_habit(id).unwrap();
        assert!(!habit.is_running());
        assert_eq!(habit.total_ms(), 0);
    }
}
