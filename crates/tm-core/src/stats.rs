//! Per-day pointer counters and the aggregates derived from them.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::event::PointerButton;

/// Counters for one calendar day.
///
/// Counters are signed to match SQLite `INTEGER` columns; they only ever
/// grow within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub distance_pixels: f64,
    pub left_clicks: i64,
    pub right_clicks: i64,
    pub middle_clicks: i64,
    pub active_time_seconds: i64,
    pub inactive_time_seconds: i64,
}

impl DailyStats {
    /// A zeroed row for `date`.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            distance_pixels: 0.0,
            left_clicks: 0,
            right_clicks: 0,
            middle_clicks: 0,
            active_time_seconds: 0,
            inactive_time_seconds: 0,
        }
    }

    /// Increments the counter for `button`.
    ///
    /// Returns `false` for buttons that are not counted.
    pub const fn record_click(&mut self, button: PointerButton) -> bool {
        match button {
            PointerButton::Left => self.left_clicks += 1,
            PointerButton::Right => self.right_clicks += 1,
            PointerButton::Middle => self.middle_clicks += 1,
            PointerButton::Unknown(_) => return false,
        }
        true
    }

    pub const fn total_clicks(&self) -> i64 {
        self.left_clicks + self.right_clicks + self.middle_clicks
    }

    /// Sum of active and inactive seconds.
    pub const fn tracked_seconds(&self) -> i64 {
        self.active_time_seconds + self.inactive_time_seconds
    }
}

/// Totals across every persisted day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_distance_pixels: f64,
    pub left_clicks: i64,
    pub right_clicks: i64,
    pub middle_clicks: i64,
    pub total_active_time_seconds: i64,
    pub total_inactive_time_seconds: i64,
    /// Number of day rows the totals were summed over.
    pub days_tracked: i64,
}

impl GlobalStats {
    pub const fn total_clicks(&self) -> i64 {
        self.left_clicks + self.right_clicks + self.middle_clicks
    }
}

/// Metric a record day can be computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMetric {
    Distance,
    ActiveTime,
}

impl RecordMetric {
    pub const ALL: [Self; 2] = [Self::Distance, Self::ActiveTime];

    /// Column in `daily_stats` holding this metric.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Distance => "distance_pixels",
            Self::ActiveTime => "active_time_seconds",
        }
    }
}

impl fmt::Display for RecordMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Distance => "distance",
            Self::ActiveTime => "active_time",
        };
        f.write_str(s)
    }
}

/// Straight-line distance between two screen positions, in pixels.
#[must_use]
pub fn euclidean_distance(from: (i32, i32), to: (i32, i32)) -> f64 {
    let dx = f64::from(to.0) - f64::from(from.0);
    let dy = f64::from(to.1) - f64::from(from.1);
    dx.hypot(dy)
}
