//! Clock source and calendar-day keys.
//!
//! The timer engine and the store never read the system time directly; they
//! ask a [`Clock`]. Elapsed durations are always derived from two absolute
//! readings, so a late or skipped tick cannot skew them.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Source of wall-clock timestamps.
pub trait Clock: Send + Sync {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;

    /// Current time as milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Calendar day of the local clock right now.
    fn today(&self) -> DayKey {
        DayKey::from(self.now().date_naive())
    }
}

/// Production clock that delegates to the system clock.
///
/// This is wall-clock time, not a monotonic source. If the system time is
/// changed during a session, the recorded elapsed time moves with it; a
/// backwards jump counts as zero for the running segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Settable clock. Clones share the same instant, so a test can hold one
/// handle and advance the time seen by the tracker through another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at(instant: DateTime<Local>) -> Self {
        Self::from_millis(instant.timestamp_millis())
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(millis)),
        }
    }

    pub fn set(&self, instant: DateTime<Local>) {
        self.millis.store(instant.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.advance_ms(by.num_milliseconds());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        // Readings beyond chrono's range pin to its edges, a day inside so
        // the local offset still fits.
        const DAY_MS: i64 = 86_400_000;
        let min = DateTime::<Utc>::MIN_UTC.timestamp_millis() + DAY_MS;
        let max = DateTime::<Utc>::MAX_UTC.timestamp_millis() - DAY_MS;
        let ms = self.millis.load(Ordering::SeqCst).clamp(min, max);
        DateTime::<Utc>::from_timestamp_millis(ms)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
            .with_timezone(&Local)
    }

    fn now_ms(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// A calendar day with no time-of-day, used as the history log key.
///
/// Compared structurally, never through formatted strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The previous calendar day. Saturates at the minimum representable date.
    pub fn pred(&self) -> Self {
        self.days_before(1)
    }

    pub fn days_before(&self, n: u64) -> Self {
        Self(self.0.checked_sub_days(Days::new(n)).unwrap_or(NaiveDate::MIN))
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    pub fn day_of_month(&self) -> u32 {
        self.0.day()
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::at(noon());
        let handle = clock.clone();
        handle.advance_ms(90_000);
        assert_eq!(clock.now_ms(), noon().timestamp_millis() + 90_000);
    }

    #[test]
    fn out_of_range_reading_is_pinned() {
        let late = ManualClock::from_millis(i64::MAX).now();
        let early = ManualClock::from_millis(i64::MIN).now();
        assert!(late.year() > 200_000);
        assert!(early.year() < -200_000);
    }

    #[test]
    fn today_follows_local_calendar() {
        let clock = ManualClock::at(noon());
        assert_eq!(clock.today(), DayKey::from_ymd(2026, 10, 18).unwrap());
        clock.advance(chrono::Duration::hours(13));
        assert_eq!(clock.today(), DayKey::from_ymd(2026, 10, 19).unwrap());
    }

    #[test]
    fn day_arithmetic_crosses_month_boundary() {
        let first = DayKey::from_ymd(2026, 3, 1).unwrap();
        assert_eq!(first.pred(), DayKey::from_ymd(2026, 2, 28).unwrap());
        assert_eq!(first.days_before(7), DayKey::from_ymd(2026, 2, 22).unwrap());
        assert_eq!(first.weekday(), Weekday::Sun);
        assert_eq!(first.day_of_month(), 1);
    }

    #[test]
    fn day_key_displays_iso() {
        let day = DayKey::from_ymd(2026, 1, 5).unwrap();
        assert_eq!(day.to_string(), "2026-01-05");
    }
}
