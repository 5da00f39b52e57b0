//! Composition root for the habit time tracker.
//!
//! [`HabitTracker`] owns the store, one timer engine and the clock, and
//! exposes the command/query surface the presentation layer talks to.
//! Commands run to completion one at a time (`&mut self`), so no mutation is
//! ever observed half-applied.
//!
//! The timer is shared by two uses:
//! - bound to a habit between `start_habit` and `stop_habit`/`reset`, always
//!   as a stopwatch
//! - free-standing (stopwatch with laps, or countdown) while no habit is bound

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::clock::{Clock, DayKey};
use crate::error::{ConflictError, CoreError, Result, ValidationError};
use crate::events::Event;
use crate::stats::{today_view, LiveSession, Stats, StatsAggregator, TodayEntry};
use crate::storage::{Config, Habit, HabitId, HabitStore, HistoryLog};
use crate::timer::{TimerEngine, TimerMode, TimerReading};

pub struct HabitTracker {
    store: HabitStore,
    timer: TimerEngine,
    aggregator: StatsAggregator,
    clock: Arc<dyn Clock>,
    config: Config,
    /// Habit the timer is currently bound to.
    active: Option<HabitId>,
    /// Free-standing mode to put back once the bound session ends.
    restore_mode: Option<TimerMode>,
}

impl HabitTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(clock, Config::default())
    }

    pub fn with_config(clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            store: HabitStore::new(clock.clone()),
            timer: TimerEngine::from_config(clock.clone(), &config.timer),
            aggregator: StatsAggregator::with_week_length(config.stats.week_length_days),
            clock,
            config,
            active: None,
            restore_mode: None,
        }
    }

    /// Replace the timer, e.g. with one wired to a real schedule and alert
    /// sink. The engine must share this tracker's clock.
    pub fn with_timer(mut self, timer: TimerEngine) -> Self {
        self.timer = timer;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &HabitStore {
        &self.store
    }

    pub fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    pub fn all_habits(&self) -> Vec<Habit> {
        self.store.get_all_habits()
    }

    pub fn habit(&self, id: HabitId) -> Option<Habit> {
        self.store.get_habit(id)
    }

    /// Habit whose session the timer is tracking.
    pub fn active_habit(&self) -> Option<HabitId> {
        self.active
    }

    pub fn today(&self) -> DayKey {
        self.clock.today()
    }

    /// Habits annotated with today's time. The active habit includes the
    /// timer's live, uncommitted reading.
    pub fn today_view(&self) -> Vec<TodayEntry> {
        let live = self.active.map(|habit_id| LiveSession {
            habit_id,
            elapsed_ms: self.timer.elapsed_ms(),
        });
        today_view(self.store.habits(), self.today(), live)
    }

    /// Statistics over committed history.
    pub fn stats(&self) -> Stats {
        self.aggregator.compute(self.store.habits(), self.today())
    }

    pub fn timer_reading(&self) -> TimerReading {
        self.timer.reading()
    }

    // ── Habit commands ───────────────────────────────────────────────

    /// # Errors
    /// `ValidationError` for an empty name or negative target.
    pub fn add_habit(&mut self, name: &str, color: &str, target_minutes: i64) -> Result<Habit> {
        let target_ms = target_minutes.checked_mul(60_000).ok_or_else(|| {
            ValidationError::InvalidValue {
                field: "target_minutes".into(),
                message: format!("{target_minutes} minutes is out of range"),
            }
        })?;
        self.store.add_habit(name, color, target_ms)
    }

    /// Delete a habit and its history. A bound session is discarded.
    ///
    /// # Errors
    /// `NotFound` if `id` is unknown.
    pub fn delete_habit(&mut self, id: HabitId) -> Result<Habit> {
        let removed = self.store.delete_habit(id)?;
        if self.active == Some(id) {
            self.timer.reset();
            self.release();
        }
        Ok(removed)
    }

    /// Start timing a habit.
    ///
    /// The session always runs as a stopwatch. A free-standing countdown
    /// mode is put back when the session is stopped, reset or deleted.
    ///
    /// # Errors
    /// `NotFound` if `id` is unknown; `Conflict` if a habit is already
    /// running or the timer holds free-standing time. Nothing changes on
    /// error.
    pub fn start_habit(&mut self, id: HabitId) -> Result<Event> {
        if !self.store.contains(id) {
            warn!(%id, "start rejected: unknown habit");
            return Err(CoreError::NotFound { id });
        }
        if let Some(running) = self.store.running_habit() {
            warn!(%id, %running, "start rejected: another habit is running");
            return Err(ConflictError::HabitAlreadyRunning { running }.into());
        }
        if !self.timer.is_clear() {
            let phase = self.timer.phase();
            warn!(%id, ?phase, "start rejected: timer in use");
            return Err(ConflictError::TimerBusy { phase }.into());
        }

        self.store.start_habit(id)?;
        let previous = self.timer.mode();
        if previous != TimerMode::Stopwatch {
            self.timer.set_mode(TimerMode::Stopwatch);
            self.restore_mode = Some(previous);
        }
        if let Err(e) = self.timer.start() {
            self.release();
            self.store.cancel_habit(id)?;
            return Err(e);
        }
        self.active = Some(id);
        Ok(Event::HabitStarted {
            habit_id: id,
            at: self.now(),
        })
    }

    /// Commit the running habit (if any) and start `id`.
    ///
    /// `id` is checked before anything is committed.
    ///
    /// # Errors
    /// `NotFound` if `id` is unknown; otherwise as [`Self::stop_habit`] and
    /// [`Self::start_habit`].
    pub fn switch_habit(&mut self, id: HabitId) -> Result<Vec<Event>> {
        if !self.store.contains(id) {
            warn!(%id, "switch rejected: unknown habit");
            return Err(CoreError::NotFound { id });
        }
        let mut events = Vec::new();
        if let Some(current) = self.active {
            if current == id {
                return Ok(events);
            }
            events.extend(self.stop_habit(current)?);
        }
        events.push(self.start_habit(id)?);
        Ok(events)
    }

    /// Stop a habit, committing the timer's live elapsed time to today's log.
    ///
    /// Returns `None` when the habit was not running; calling this twice
    /// records the time once.
    ///
    /// # Errors
    /// `NotFound` if `id` is unknown.
    pub fn stop_habit(&mut self, id: HabitId) -> Result<Option<Event>> {
        if !self.store.contains(id) {
            warn!(%id, "stop rejected: unknown habit");
            return Err(CoreError::NotFound { id });
        }
        if self.active != Some(id) {
            return Ok(None);
        }
        let event = self.timer.stop_into(&mut self.store, id)?;
        if event.is_none() {
            self.timer.reset();
        }
        self.release();
        Ok(event)
    }

    /// Backfill time on an arbitrary day.
    ///
    /// # Errors
    /// `NotFound` if `id` is unknown; `ValidationError` for negative time.
    pub fn log_time(&mut self, id: HabitId, day: DayKey, duration_ms: i64) -> Result<HistoryLog> {
        self.store.insert_log(id, day, duration_ms)
    }

    // ── Timer commands ───────────────────────────────────────────────

    /// Start or resume the timer.
    ///
    /// # Errors
    /// `ValidationError` for a countdown without a positive length.
    pub fn start_timer(&mut self) -> Result<Option<Event>> {
        self.timer.start()
    }

    pub fn pause(&mut self) -> Option<Event> {
        self.timer.pause()
    }

    pub fn resume(&mut self) -> Option<Event> {
        self.timer.resume()
    }

    pub fn lap(&mut self) -> Option<Event> {
        self.timer.lap()
    }

    /// Discard uncommitted time. A bound habit is released without
    /// recording anything; use [`Self::stop_habit`] to keep the time.
    pub fn reset(&mut self) -> Event {
        let discarded_ms = self.timer.elapsed_ms();
        let reset = self.timer.reset();
        if let Some(habit_id) = self.active {
            self.release();
            if let Err(e) = self.store.cancel_habit(habit_id) {
                warn!(%habit_id, error = %e, "bound habit vanished before reset");
            }
            info!(%habit_id, discarded_ms, "habit session reset");
            return Event::SessionDiscarded {
                habit_id,
                discarded_ms,
                at: self.now(),
            };
        }
        reset.unwrap_or(Event::TimerReset {
            discarded_ms,
            at: self.now(),
        })
    }

    /// # Errors
    /// `Conflict` while a habit session is bound to the timer.
    pub fn set_mode(&mut self, mode: TimerMode) -> Result<Option<Event>> {
        self.ensure_unbound()?;
        Ok(self.timer.set_mode(mode))
    }

    /// Set the countdown length for the next run.
    ///
    /// # Errors
    /// `Conflict` while a habit session is bound; `ValidationError` if the
    /// length is not positive.
    pub fn configure(&mut self, minutes: i64, seconds: i64) -> Result<Option<Event>> {
        self.ensure_unbound()?;
        self.timer.configure(minutes, seconds)
    }

    /// Use the fine tick cadence (centisecond readouts) or the display one.
    pub fn set_fine_ticks(&mut self, fine: bool) {
        self.timer.set_fine_ticks(fine);
    }

    /// Scheduled tick: re-read the clock and publish to subscribers.
    pub fn tick(&mut self) -> Option<Event> {
        self.timer.tick()
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&TimerReading) + Send + 'static,
    {
        self.timer.subscribe(subscriber);
    }

    /// Unbind the session and put back the free-standing timer mode. The
    /// timer must already be stopped.
    fn release(&mut self) {
        self.active = None;
        if let Some(mode) = self.restore_mode.take() {
            self.timer.set_mode(mode);
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }

    fn ensure_unbound(&self) -> Result<()> {
        if self.active.is_some() {
            let phase = self.timer.phase();
            warn!(?phase, "timer command rejected: habit session bound");
            return Err(ConflictError::TimerBusy { phase }.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Local, TimeZone};

    fn tracker() -> (HabitTracker, ManualClock) {
        let clock = ManualClock::at(Local.with_ymd_and_hms(2026, 10, 18, 10, 0, 0).unwrap());
        (HabitTracker::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn start_binds_a_stopwatch() {
        let (mut tracker, clock) = tracker();
        let id = tracker.add_habit("Study", "#4A90E2", 30).unwrap().id();
        tracker.set_mode(TimerMode::Countdown).unwrap();
        tracker.start_habit(id).unwrap();

        assert_eq!(tracker.active_habit(), Some(id));
        assert_eq!(tracker.timer().mode(), TimerMode::Stopwatch);
        clock.advance_ms(12_000);
        assert_eq!(tracker.today_view()[0].live_ms, 12_000);
        assert_eq!(tracker.stats().today_time_ms, 0);
    }

    #[test]
    fn busy_timer_blocks_habit_start() {
        let (mut tracker, clock) = tracker();
        let id = tracker.add_habit("Study", "#4A90E2", 30).unwrap().id();
        tracker.start_timer().unwrap();
        clock.advance_ms(1_000);
        assert!(matches!(
            tracker.start_habit(id),
            Err(CoreError::Conflict(ConflictError::TimerBusy { .. }))
        ));
        assert!(!tracker.habit(id).unwrap().is_running());

        tracker.reset();
        assert!(tracker.start_habit(id).is_ok());
    }

    #[test]
    fn timer_settings_locked_while_bound() {
        let (mut tracker, _) = tracker();
        let id = tracker.add_habit("Study", "#4A90E2", 30).unwrap().id();
        tracker.start_habit(id).unwrap();
        assert!(tracker.configure(1, 0).is_err());
        assert!(tracker.set_mode(TimerMode::Countdown).is_err());
    }

    #[test]
    fn pause_keeps_session_and_stop_commits_paused_time() {
        let (mut tracker, clock) = tracker();
        let id = tracker.add_habit("Study", "#4A90E2", 30).unwrap().id();
        tracker.start_habit(id).unwrap();
        clock.advance_ms(20_000);
        tracker.pause();
        clock.advance_ms(60_000);
        assert!(tracker.habit(id).unwrap().is_running());

        tracker.stop_habit(id).unwrap();
        assert_eq!(tracker.habit(id).unwrap().total_ms(), 20_000);
    }

    #[test]
    fn reset_releases_habit_without_logging() {
        let (mut tracker, clock) = tracker();
        let id = tracker.add_habit("Study", "#4A90E2", 30).unwrap().id();
        tracker.start_habit(id).unwrap();
        clock.advance_ms(30_000);

        assert!(matches!(
            tracker.reset(),
            Event::SessionDiscarded { discarded_ms: 30_000, .. }
        ));
        let habit = tracker.habit(id).unwrap();
        assert!(!habit.is_running());
        assert_eq!(habit.total_ms(), 0);
        assert_eq!(tracker.active_habit(), None);
        assert!(tracker.stop_habit(id).unwrap().is_none());
    }

    #[test]
    fn switch_commits_previous_habit() {
        let (mut tracker, clock) = tracker();
        let a = tracker.add_habit("Study", "#4A90E2", 30).unwrap().id();
        let b = tracker.add_habit("Read", "#67C23A", 15).unwrap().id();
        tracker.start_habit(a).unwrap();
        clock.advance_ms(5_000);

        let events = tracker.switch_habit(b).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::SessionCommitted { elapsed_ms: 5_000, .. }));
        assert_eq!(tracker.active_habit(), Some(b));
        assert_eq!(tracker.habit(a).unwrap().total_ms(), 5_000);

        assert!(tracker.switch_habit(b).unwrap().is_empty());
        assert!(matches!(
            tracker.switch_habit(HabitId::new()),
            Err(CoreError::NotFound { .. })
        ));
        assert_eq!(tracker.active_habit(), Some(b));
    }

    #[test]
    fn delete_active_habit_discards_session() {
        let (mut tracker, clock) = tracker();
        let id = tracker.add_habit("Study", "#4A90E2", 30).unwrap().id();
        tracker.start_habit(id).unwrap();
        clock.advance_ms(7_000);
        tracker.delete_habit(id).unwrap();

        assert_eq!(tracker.active_habit(), None);
        assert!(tracker.timer().is_clear());
        assert!(tracker.all_habits().is_empty());
        assert_eq!(tracker.stats().total_time_ms, 0);
    }

    #[test]
    fn add_habit_converts_minutes() {
        let (mut tracker, _) = tracker();
        let habit = tracker.add_habit("Study", "#4A90E2", 30).unwrap();
        assert_eq!(habit.target_ms(), 1_800_000);
        assert!(tracker.add_habit("Study", "#4A90E2", -5).is_err());
        assert!(tracker.add_habit("Study", "#4A90E2", i64::MAX).is_err());
        assert_eq!(tracker.all_habits().len(), 1);
    }

    #[test]
    fn zero_length_pause_resumes_bound_session() {
        let (mut tracker, clock) = tracker();
        let id = tracker.add_habit("Study", "#4A90E2", 30).unwrap().id();
        tracker.start_habit(id).unwrap();
        assert!(tracker.pause().is_some());
        assert!(tracker.resume().is_some());
        clock.advance_ms(5_000);
        tracker.stop_habit(id).unwrap();
        assert_eq!(tracker.habit(id).unwrap().total_ms(), 5_000);
    }

    #[test]
    fn countdown_mode_returns_after_session() {
        let (mut tracker, clock) = tracker();
        let id = tracker.add_habit("Study", "#4A90E2", 30).unwrap().id();
        tracker.set_mode(TimerMode::Countdown).unwrap();
        tracker.configure(0, 10).unwrap();
        tracker.start_timer().unwrap();
        clock.advance_ms(10_000);
        tracker.tick();

        tracker.start_habit(id).unwrap();
        assert_eq!(tracker.timer().mode(), TimerMode::Stopwatch);
        clock.advance_ms(3_000);
        tracker.stop_habit(id).unwrap();
        assert_eq!(tracker.timer().mode(), TimerMode::Countdown);
        assert_eq!(tracker.timer().remaining_ms(), Some(10_000));

        tracker.start_habit(id).unwrap();
        tracker.reset();
        assert_eq!(tracker.timer().mode(), TimerMode::Countdown);

        tracker.start_habit(id).unwrap();
        tracker.delete_habit(id).unwrap();
        assert_eq!(tracker.timer().mode(), TimerMode::Countdown);
    }

    #[test]
    fn fine_ticks_follow_config() {
        let (mut tracker, _) = tracker();
        assert_eq!(tracker.timer().tick_period().as_millis(), 1_000);
        tracker.set_fine_ticks(true);
        assert_eq!(
            tracker.timer().tick_period().as_millis() as u64,
            tracker.config().timer.fine_tick_ms
        );
    }
}
