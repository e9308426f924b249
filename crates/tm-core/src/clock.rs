//! Wall-clock access for the background producers.
//!
//! Producers never call `Local::now()` or `Instant::now()` directly; they go
//! through a [`Clock`] so day changes and idle periods can be simulated.

use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;

/// Source of the current calendar date and monotonic time.
pub trait Clock: Send + Sync + 'static {
    /// The current local calendar date.
    fn today(&self) -> NaiveDate;

    /// Monotonic time used for inactivity measurement.
    fn now(&self) -> Instant;
}

/// Clock backed by the system's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(NaiveDate, Instant)>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            state: Mutex::new((today, Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.state.lock().1 += by;
    }

    pub fn set_today(&self, today: NaiveDate) {
        self.state.lock().0 = today;
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        self.state.lock().0
    }

    fn now(&self) -> Instant {
        self.state.lock().1
    }
}
