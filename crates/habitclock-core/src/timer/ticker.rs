//! Tick scheduling and countdown alerts.
//!
//! A tick only asks the engine to re-read its clock and publish the result.
//! Schedules are armed when a session enters Running and disarmed when it
//! leaves, so an idle timer costs nothing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Something that can invoke the engine's `tick()` at a fixed period.
pub trait TickSchedule: Send {
    fn arm(&mut self, period: Duration);
    fn disarm(&mut self);
    fn is_armed(&self) -> bool;
}

/// Schedule for hosts that drive `tick()` from their own loop.
///
/// Records the requested period so the host knows how often to call.
#[derive(Debug, Clone, Default)]
pub struct ManualSchedule {
    period: Option<Duration>,
}

impl ManualSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }
}

impl TickSchedule for ManualSchedule {
    fn arm(&mut self, period: Duration) {
        self.period = Some(period);
    }

    fn disarm(&mut self) {
        self.period = None;
    }

    fn is_armed(&self) -> bool {
        self.period.is_some()
    }
}

/// Signal delivered on every scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSignal;

/// Tokio-backed schedule.
///
/// Arming spawns an interval task that pushes a [`TickSignal`] into a
/// one-slot channel; the host awaits the receiver and calls `tick()`.
/// Signals are coalesced when the host falls behind.
pub struct TokioTicker {
    runtime: Handle,
    tx: mpsc::Sender<TickSignal>,
    task: Option<JoinHandle<()>>,
}

impl TokioTicker {
    pub fn new(runtime: Handle) -> (Self, mpsc::Receiver<TickSignal>) {
        let (tx, rx) = mpsc::channel(1);
        (
            Self {
                runtime,
                tx,
                task: None,
            },
            rx,
        )
    }

    /// Build on the runtime of the calling context, if there is one.
    pub fn from_current() -> Option<(Self, mpsc::Receiver<TickSignal>)> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl TickSchedule for TokioTicker {
    fn arm(&mut self, period: Duration) {
        self.disarm();
        let tx = self.tx.clone();
        debug!(period_ms = period.as_millis() as u64, "tick schedule armed");
        self.task = Some(self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; the engine was just read.
            interval.tick().await;
            loop {
                interval.tick().await;
                match tx.try_send(TickSignal) {
                    Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        }));
    }

    fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("tick schedule disarmed");
        }
    }

    fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for TokioTicker {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Payload handed to the alert sink when a countdown reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountdownAlert {
    pub target_ms: i64,
    pub at: DateTime<Utc>,
}

/// Vibration/sound collaborator. Invoked exactly once per finished countdown.
pub trait AlertSink: Send {
    fn alert(&mut self, alert: &CountdownAlert);
}

/// Sink that ignores alerts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAlert;

impl AlertSink for NoopAlert {
    fn alert(&mut self, _alert: &CountdownAlert) {}
}

impl<F> AlertSink for F
where
    F: FnMut(&CountdownAlert) + Send,
{
    fn alert(&mut self, alert: &CountdownAlert) {
        self(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_schedule_tracks_period() {
        let mut schedule = ManualSchedule::new();
        assert!(!schedule.is_armed());
        schedule.arm(Duration::from_millis(10));
        assert_eq!(schedule.period(), Some(Duration::from_millis(10)));
        schedule.disarm();
        assert!(!schedule.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_ticker_delivers_until_disarmed() {
        let (mut ticker, mut rx) = TokioTicker::new(Handle::current());
        ticker.arm(Duration::from_millis(100));
        assert!(ticker.is_armed());

        assert_eq!(rx.recv().await, Some(TickSignal));
        assert_eq!(rx.recv().await, Some(TickSignal));

        ticker.disarm();
        assert!(!ticker.is_armed());
        while rx.try_recv().is_ok() {}

        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn from_current_finds_runtime() {
        assert!(TokioTicker::from_current().is_some());
    }

    #[test]
    fn from_current_outside_runtime_is_none() {
        assert!(TokioTicker::from_current().is_none());
    }
}
