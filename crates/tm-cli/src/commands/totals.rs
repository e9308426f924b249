//! Totals command for showing counters summed over every tracked day.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use tm_core::GlobalStats;
use tm_db::{FIRST_LAUNCH_DATE_KEY, StatsRepository};

use super::util::{Counters, count_noun, format_counters};
use crate::units::DistanceFormat;

#[derive(Debug, Serialize)]
struct JsonTotals<'a> {
    #[serde(flatten)]
    totals: &'a GlobalStats,
    first_launch_date: Option<&'a str>,
}

/// Formats the global totals under a header naming the tracked period.
pub fn format_totals(
    totals: &GlobalStats,
    first_launch_date: Option<&str>,
    distance: &DistanceFormat,
) -> String {
    let days = count_noun(totals.days_tracked, "day");
    let mut out = match first_launch_date {
        Some(since) => format!("Totals over {days} since {since}\n"),
        None => format!("Totals over {days}\n"),
    };
    out.push_str(&format_counters(Counters::from(totals), distance));
    out
}

pub fn run<W: Write>(
    writer: &mut W,
    repo: &StatsRepository,
    distance: &DistanceFormat,
    json: bool,
) -> Result<()> {
    let totals = repo.get_global_stats()?;
    let first_launch_date = repo.get_app_setting(FIRST_LAUNCH_DATE_KEY)?;

    if json {
        let report = JsonTotals {
            totals: &totals,
            first_launch_date: first_launch_date.as_deref(),
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        let output = format_totals(&totals, first_launch_date.as_deref(), distance);
        write!(writer, "{output}")?;
    }
    Ok(())
}
