//! Records command for showing the best day per metric.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use tm_core::{DailyStats, RecordMetric};
use tm_db::StatsRepository;

use crate::units::{DistanceFormat, format_hms};

#[derive(Debug, Serialize)]
struct JsonRecords {
    distance: Option<DailyStats>,
    active_time: Option<DailyStats>,
}

fn describe(record: Option<&DailyStats>, value: impl Fn(&DailyStats) -> String) -> String {
    record.map_or_else(
        || "none yet".to_string(),
        |day| format!("{} ({})", day.date, value(day)),
    )
}

pub fn format_records(
    distance_record: Option<&DailyStats>,
    active_record: Option<&DailyStats>,
    distance: &DistanceFormat,
) -> String {
    format!(
        "Records\n  Distance:    {}\n  Active time: {}\n",
        describe(distance_record, |day| distance.format(day.distance_pixels)),
        describe(active_record, |day| format_hms(day.active_time_seconds)),
    )
}

/// Runs the records command. Ties go to the earliest day.
pub fn run<W: Write>(
    writer: &mut W,
    repo: &StatsRepository,
    distance: &DistanceFormat,
    json: bool,
) -> Result<()> {
    let distance_record = repo.get_record_day(RecordMetric::Distance)?;
    let active_record = repo.get_record_day(RecordMetric::ActiveTime)?;

    if json {
        let report = JsonRecords {
            distance: distance_record,
            active_time: active_record,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        let output = format_records(distance_record.as_ref(), active_record.as_ref(), distance);
        write!(writer, "{output}")?;
    }
    Ok(())
}
