//! Wall-clock sources for the call tracker.
//!
//! Daily quotas reset at local midnight, so the tracker works in local
//! `NaiveDateTime` rather than monotonic instants.

use chrono::{Local, NaiveDateTime};
use std::sync::{Mutex, PoisonError};

/// Source of the current local time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// The system's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeDelta};
/// use reverb_rate_limit::{Clock, ManualClock};
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1)
///     .unwrap()
///     .and_hms_opt(23, 59, 0)
///     .unwrap();
/// let clock = ManualClock::new(start);
/// clock.advance(TimeDelta::seconds(120));
/// assert_eq!(clock.now().date(), NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    /// Starts the clock at `start`.
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, delta: chrono::TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }

    /// Jumps to an arbitrary time.
    pub fn set(&self, to: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Local time that advances with the tokio clock.
///
/// Under a paused tokio runtime this clock moves exactly as far as
/// `tokio::time` does, which keeps tracker windows consistent with limiter
/// and pool windows.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    wall: NaiveDateTime,
    anchor: tokio::time::Instant,
}

impl TokioClock {
    /// Anchors the clock at the current local time.
    pub fn new() -> Self {
        Self::starting_at(Local::now().naive_local())
    }

    /// Anchors the clock at `wall`.
    pub fn starting_at(wall: NaiveDateTime) -> Self {
        Self {
            wall,
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = tokio::time::Instant::now().duration_since(self.anchor);
        chrono::TimeDelta::from_std(elapsed)
            .ok()
            .and_then(|delta| self.wall.checked_add_signed(delta))
            .unwrap_or(NaiveDateTime::MAX)
    }
}
