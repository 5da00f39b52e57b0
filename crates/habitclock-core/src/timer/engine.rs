//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - an armed [`TickSchedule`] tells the host when to call
//! `tick()`, and every reading is derived from absolute clock timestamps.
//! Ticks never advance time themselves, so a late or dropped tick only
//! delays the display.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Idle (paused, elapsed kept)
//!                 -> Idle (reset, elapsed discarded)
//!                 -> Finished (countdown reached zero) -> Running
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Arc::new(SystemClock));
//! engine.start()?;
//! // On every scheduled tick:
//! engine.tick(); // Returns Some(Event::CountdownFinished) when a countdown ends
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::laps::{Lap, LapList};
use super::ticker::{AlertSink, CountdownAlert, ManualSchedule, NoopAlert, TickSchedule};
use crate::clock::Clock;
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::storage::{HabitId, HabitStore, TimerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Stopwatch,
    Countdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    /// Countdown reached zero. Behaves like a fresh Idle for the next start.
    Finished,
}

/// User-entered countdown length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownSetting {
    pub minutes: i64,
    pub seconds: i64,
}

impl CountdownSetting {
    pub fn new(minutes: i64, seconds: i64) -> Self {
        Self { minutes, seconds }
    }

    /// Resolve to milliseconds.
    ///
    /// # Errors
    /// `InvalidValue` for a negative component, `NonPositiveCountdown` if the
    /// total is zero.
    pub fn to_ms(&self) -> Result<i64, ValidationError> {
        if self.minutes < 0 || self.seconds < 0 {
            return Err(ValidationError::InvalidValue {
                field: "countdown".into(),
                message: format!(
                    "minutes and seconds must not be negative (got {}:{})",
                    self.minutes, self.seconds
                ),
            });
        }
        let total = self
            .minutes
            .checked_mul(60_000)
            .and_then(|m| self.seconds.checked_mul(1000).and_then(|s| m.checked_add(s)))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "countdown".into(),
                message: "countdown length overflows".into(),
            })?;
        if total <= 0 {
            return Err(ValidationError::NonPositiveCountdown {
                minutes: self.minutes,
                seconds: self.seconds,
            });
        }
        Ok(total)
    }
}

/// Point-in-time view of the timer, recomputed from the clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerReading {
    pub mode: TimerMode,
    pub phase: TimerPhase,
    pub elapsed_ms: i64,
    /// Countdown only.
    pub remaining_ms: Option<i64>,
    /// Countdown only; present once a run has fixed its target.
    pub target_ms: Option<i64>,
    /// Remaining share of the target, 100.0 at start down to 0.0.
    pub progress_pct: Option<f64>,
    pub laps: Vec<Lap>,
    pub at: DateTime<Utc>,
}

type Subscriber = Box<dyn FnMut(&TimerReading) + Send>;

/// Stopwatch/countdown state machine.
pub struct TimerEngine {
    mode: TimerMode,
    phase: TimerPhase,
    /// Time accumulated by finished run segments.
    elapsed_ms: i64,
    /// Clock reading (epoch ms) at which the current run segment began.
    anchor_ms: Option<i64>,
    /// Stopped mid-run by `pause`, possibly with nothing accumulated yet.
    paused: bool,
    /// Fixed when a countdown run begins, kept across pause, dropped on reset.
    target_ms: Option<i64>,
    countdown: CountdownSetting,
    laps: LapList,
    tick_period: Duration,
    /// Faster cadence for centisecond displays.
    fine_tick_period: Duration,
    fine_ticks: bool,
    clock: Arc<dyn Clock>,
    schedule: Box<dyn TickSchedule>,
    alert: Box<dyn AlertSink>,
    subscribers: Vec<Subscriber>,
}

impl TimerEngine {
    /// Idle stopwatch with a host-driven schedule and no alert sink.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let defaults = TimerConfig::default();
        Self {
            mode: TimerMode::Stopwatch,
            phase: TimerPhase::Idle,
            elapsed_ms: 0,
            anchor_ms: None,
            paused: false,
            target_ms: None,
            countdown: CountdownSetting::new(
                defaults.default_countdown_minutes,
                defaults.default_countdown_seconds,
            ),
            laps: LapList::new(),
            tick_period: Duration::from_millis(defaults.display_tick_ms),
            fine_tick_period: Duration::from_millis(defaults.fine_tick_ms),
            fine_ticks: false,
            clock,
            schedule: Box::new(ManualSchedule::new()),
            alert: Box::new(NoopAlert),
            subscribers: Vec::new(),
        }
    }

    pub fn from_config(clock: Arc<dyn Clock>, config: &TimerConfig) -> Self {
        Self::new(clock)
            .with_tick_period(Duration::from_millis(config.display_tick_ms))
            .with_fine_tick_period(Duration::from_millis(config.fine_tick_ms))
            .with_countdown(config.default_countdown_minutes, config.default_countdown_seconds)
    }

    pub fn with_schedule(mut self, schedule: Box<dyn TickSchedule>) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_alert(mut self, alert: Box<dyn AlertSink>) -> Self {
        self.alert = alert;
        self
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    pub fn with_fine_tick_period(mut self, period: Duration) -> Self {
        self.fine_tick_period = period;
        self
    }

    /// Initial countdown input. Not validated until a countdown starts.
    pub fn with_countdown(mut self, minutes: i64, seconds: i64) -> Self {
        self.countdown = CountdownSetting::new(minutes, seconds);
        self
    }

    /// Register a callback that receives the reading published on each tick.
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&TimerReading) + Send + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Stopped by `pause` and waiting for `resume`, even if the paused run
    /// had not accumulated any time.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Nothing running, paused or accumulated.
    pub fn is_clear(&self) -> bool {
        self.phase != TimerPhase::Running && !self.paused && self.elapsed_ms == 0
    }

    pub fn countdown_setting(&self) -> CountdownSetting {
        self.countdown
    }

    pub fn target_ms(&self) -> Option<i64> {
        self.target_ms
    }

    pub fn laps(&self) -> &LapList {
        &self.laps
    }

    /// Period the schedule is armed with while running.
    pub fn tick_period(&self) -> Duration {
        if self.fine_ticks {
            self.fine_tick_period
        } else {
            self.tick_period
        }
    }

    pub fn fine_ticks(&self) -> bool {
        self.fine_ticks
    }

    pub fn schedule_armed(&self) -> bool {
        self.schedule.is_armed()
    }

    /// Live elapsed time: accumulated segments plus the running one.
    ///
    /// Countdowns never report more than their target.
    pub fn elapsed_ms(&self) -> i64 {
        let live = self.elapsed_ms.saturating_add(self.segment_ms(self.clock.now_ms()));
        match (self.mode, self.target_ms) {
            (TimerMode::Countdown, Some(target)) => live.min(target),
            _ => live,
        }
    }

    /// Time left on a countdown. Before the first run this is the configured
    /// length (if valid); `None` in stopwatch mode.
    pub fn remaining_ms(&self) -> Option<i64> {
        if self.mode != TimerMode::Countdown {
            return None;
        }
        if self.phase == TimerPhase::Finished {
            return Some(0);
        }
        match self.target_ms {
            Some(target) => Some((target - self.elapsed_ms()).max(0)),
            None => self.countdown.to_ms().ok(),
        }
    }

    pub fn progress_pct(&self) -> Option<f64> {
        let target = self.target_ms.filter(|&t| t > 0)?;
        let remaining = self.remaining_ms()?;
        Some(remaining as f64 * 100.0 / target as f64)
    }

    pub fn reading(&self) -> TimerReading {
        TimerReading {
            mode: self.mode,
            phase: self.phase,
            elapsed_ms: self.elapsed_ms(),
            remaining_ms: self.remaining_ms(),
            target_ms: self.target_ms,
            progress_pct: self.progress_pct(),
            laps: self.laps.laps(),
            at: self.now(),
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::Tick {
            reading: self.reading(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start from Idle/Finished, or resume a paused run.
    ///
    /// A countdown without a fixed target takes its length from the
    /// configured setting.
    ///
    /// # Errors
    /// `ValidationError` if that setting resolves to zero or less.
    pub fn start(&mut self) -> Result<Option<Event>> {
        match self.phase {
            TimerPhase::Running => Ok(None),
            TimerPhase::Idle | TimerPhase::Finished => {
                if self.mode == TimerMode::Countdown && self.target_ms.is_none() {
                    self.target_ms = Some(self.countdown.to_ms()?);
                    self.elapsed_ms = 0;
                }
                Ok(Some(self.begin_segment()))
            }
        }
    }

    /// Resume a paused run. No-op unless paused.
    pub fn resume(&mut self) -> Option<Event> {
        if !self.is_paused() {
            return None;
        }
        Some(self.begin_segment())
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.phase != TimerPhase::Running {
            return None;
        }
        if self.countdown_expired() {
            return Some(self.finish());
        }
        let now = self.clock.now_ms();
        self.elapsed_ms = self.elapsed_ms.saturating_add(self.segment_ms(now));
        self.anchor_ms = None;
        self.paused = true;
        self.phase = TimerPhase::Idle;
        self.schedule.disarm();
        debug!(elapsed_ms = self.elapsed_ms, "timer paused");
        Some(Event::TimerPaused {
            elapsed_ms: self.elapsed_ms,
            remaining_ms: self.remaining_ms(),
            at: self.now(),
        })
    }

    /// Discard accumulated time, laps and the countdown target. Valid from
    /// any phase.
    pub fn reset(&mut self) -> Option<Event> {
        let discarded_ms = self.elapsed_ms();
        self.clear();
        debug!(discarded_ms, "timer reset");
        Some(Event::TimerReset {
            discarded_ms,
            at: self.now(),
        })
    }

    /// Record a stopwatch checkpoint. Running stopwatch only.
    pub fn lap(&mut self) -> Option<Event> {
        if self.mode != TimerMode::Stopwatch || self.phase != TimerPhase::Running {
            return None;
        }
        let elapsed_ms = self.elapsed_ms();
        self.laps.record(elapsed_ms);
        let lap = self.laps.laps().first().copied()?;
        debug!(number = lap.number, split_ms = lap.split_ms, "lap recorded");
        Some(Event::LapRecorded { lap, at: self.now() })
    }

    /// Switch between stopwatch and countdown. Ignored while running;
    /// otherwise the timer is reset.
    pub fn set_mode(&mut self, mode: TimerMode) -> Option<Event> {
        if self.phase == TimerPhase::Running {
            return None;
        }
        self.clear();
        self.mode = mode;
        Some(Event::ModeChanged {
            mode,
            at: self.now(),
        })
    }

    /// Switch between the display cadence and the fine cadence used for
    /// centisecond readouts. A running schedule is re-armed at once.
    pub fn set_fine_ticks(&mut self, fine: bool) {
        if self.fine_ticks == fine {
            return;
        }
        self.fine_ticks = fine;
        if self.phase == TimerPhase::Running {
            self.schedule.arm(self.tick_period());
        }
        debug!(fine, period_ms = self.tick_period().as_millis() as u64, "tick cadence changed");
    }

    /// Set the countdown length for the next run. Ignored while running;
    /// otherwise any paused countdown is dropped.
    ///
    /// # Errors
    /// `ValidationError` if the length is not positive.
    pub fn configure(&mut self, minutes: i64, seconds: i64) -> Result<Option<Event>> {
        if self.phase == TimerPhase::Running {
            return Ok(None);
        }
        let setting = CountdownSetting::new(minutes, seconds);
        let target_ms = setting.to_ms()?;
        self.countdown = setting;
        if self.mode == TimerMode::Countdown {
            self.target_ms = None;
            self.elapsed_ms = 0;
            self.paused = false;
            self.phase = TimerPhase::Idle;
        }
        Ok(Some(Event::CountdownConfigured {
            target_ms,
            at: self.now(),
        }))
    }

    /// Re-read the clock and publish the reading to subscribers.
    ///
    /// Returns `Some(Event::CountdownFinished)` when a countdown reaches
    /// zero, `Some(Event::Tick)` for other running timers, `None` otherwise.
    pub fn tick(&mut self) -> Option<Event> {
        if self.phase != TimerPhase::Running {
            return None;
        }
        if self.countdown_expired() {
            return Some(self.finish());
        }
        let reading = self.reading();
        self.publish(&reading);
        Some(Event::Tick { reading })
    }

    /// Commit the live elapsed time to `habit` and reset.
    ///
    /// The engine is left untouched if the store rejects the commit or the
    /// habit was not running.
    ///
    /// # Errors
    /// Whatever [`HabitStore::stop_habit`] returns.
    pub fn stop_into(&mut self, store: &mut HabitStore, habit: HabitId) -> Result<Option<Event>> {
        let elapsed_ms = self.elapsed_ms();
        let Some(log) = store.stop_habit(habit, elapsed_ms)? else {
            return Ok(None);
        };
        self.clear();
        Ok(Some(Event::SessionCommitted {
            habit_id: habit,
            elapsed_ms,
            day: log.day,
            day_total_ms: log.duration_ms,
            at: self.now(),
        }))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_segment(&mut self) -> Event {
        let resumed = self.paused;
        self.paused = false;
        self.anchor_ms = Some(self.clock.now_ms());
        self.phase = TimerPhase::Running;
        self.schedule.arm(self.tick_period());
        let at = self.now();
        if resumed {
            debug!(elapsed_ms = self.elapsed_ms, "timer resumed");
            Event::TimerResumed {
                elapsed_ms: self.elapsed_ms,
                at,
            }
        } else {
            debug!(mode = ?self.mode, target_ms = ?self.target_ms, "timer started");
            Event::TimerStarted {
                mode: self.mode,
                target_ms: self.target_ms,
                at,
            }
        }
    }

    fn segment_ms(&self, now: i64) -> i64 {
        self.anchor_ms.map_or(0, |anchor| (now - anchor).max(0))
    }

    fn countdown_expired(&self) -> bool {
        self.mode == TimerMode::Countdown
            && self.phase == TimerPhase::Running
            && self.remaining_ms().is_some_and(|r| r <= 0)
    }

    fn finish(&mut self) -> Event {
        let target_ms = self.target_ms.take().unwrap_or(0);
        self.elapsed_ms = 0;
        self.anchor_ms = None;
        self.paused = false;
        self.phase = TimerPhase::Finished;
        self.schedule.disarm();

        let at = self.now();
        info!(target_ms, "countdown finished");
        self.alert.alert(&CountdownAlert { target_ms, at });
        let reading = self.reading();
        self.publish(&reading);
        Event::CountdownFinished { target_ms, at }
    }

    fn clear(&mut self) {
        self.phase = TimerPhase::Idle;
        self.elapsed_ms = 0;
        self.anchor_ms = None;
        self.paused = false;
        self.target_ms = None;
        self.laps.clear();
        self.schedule.disarm();
    }

    fn publish(&mut self, reading: &TimerReading) {
        for subscriber in &mut self.subscribers {
            subscriber(reading);
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }
}

impl fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("mode", &self.mode)
            .field("phase", &self.phase)
            .field("elapsed_ms", &self.elapsed_ms)
            .field("anchor_ms", &self.anchor_ms)
            .field("paused", &self.paused)
            .field("target_ms", &self.target_ms)
            .field("countdown", &self.countdown)
            .field("laps", &self.laps)
            .field("tick_period", &self.tick_period())
            .field("schedule_armed", &self.schedule.is_armed())
            .finish_non_exhaustive()
    }
}
