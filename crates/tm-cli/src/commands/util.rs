//! Shared rendering for CLI commands.

use std::fmt::Write as _;

use tm_core::{DailyStats, GlobalStats};

use crate::units::{DistanceFormat, format_hms};

/// The counters every report shows, whatever period they cover.
#[derive(Debug, Clone, Copy)]
pub struct Counters {
    pub distance_pixels: f64,
    pub left_clicks: i64,
    pub right_clicks: i64,
    pub middle_clicks: i64,
    pub active_time_seconds: i64,
    pub inactive_time_seconds: i64,
}

impl From<&DailyStats> for Counters {
    fn from(stats: &DailyStats) -> Self {
        Self {
            distance_pixels: stats.distance_pixels,
            left_clicks: stats.left_clicks,
            right_clicks: stats.right_clicks,
            middle_clicks: stats.middle_clicks,
            active_time_seconds: stats.active_time_seconds,
            inactive_time_seconds: stats.inactive_time_seconds,
        }
    }
}

impl From<&GlobalStats> for Counters {
    fn from(stats: &GlobalStats) -> Self {
        Self {
            distance_pixels: stats.total_distance_pixels,
            left_clicks: stats.left_clicks,
            right_clicks: stats.right_clicks,
            middle_clicks: stats.middle_clicks,
            active_time_seconds: stats.total_active_time_seconds,
            inactive_time_seconds: stats.total_inactive_time_seconds,
        }
    }
}

/// Indented counter block shared by the today, totals and run output.
pub fn format_counters(counters: Counters, distance: &DistanceFormat) -> String {
    let total_clicks = counters.left_clicks + counters.right_clicks + counters.middle_clicks;
    let mut out = String::new();
    let _ = writeln!(out, "  Distance:      {}", distance.format(counters.distance_pixels));
    let _ = writeln!(
        out,
        "  Clicks:        {total_clicks} (left {}, right {}, middle {})",
        counters.left_clicks, counters.right_clicks, counters.middle_clicks
    );
    let _ = writeln!(out, "  Active time:   {}", format_hms(counters.active_time_seconds));
    let _ = writeln!(out, "  Inactive time: {}", format_hms(counters.inactive_time_seconds));
    out
}

/// `n` followed by `singular`, pluralized with a trailing `s`.
pub fn count_noun(n: i64, singular: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {singular}s")
    }
}
