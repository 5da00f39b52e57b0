mod engine;
mod format;
mod laps;
mod ticker;

pub use engine::{CountdownSetting, TimerEngine, TimerMode, TimerPhase, TimerReading};
pub use format::{format_clock, format_duration_long};
pub use laps::{lap_durations, Lap, LapList};
pub use ticker::{
    AlertSink, CountdownAlert, ManualSchedule, NoopAlert, TickSchedule, TickSignal, TokioTicker,
};
