//! Today command for showing the current day's counters.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use tm_core::DailyStats;
use tm_db::StatsRepository;

use super::util::{Counters, format_counters};
use crate::units::DistanceFormat;

/// Formats one day's counters under a header.
pub fn format_today(stats: &DailyStats, distance: &DistanceFormat) -> String {
    let mut out = format!("Today ({})\n", stats.date);
    out.push_str(&format_counters(Counters::from(stats), distance));
    out
}

/// Runs the today command. A day with no row yet reports zeros.
pub fn run<W: Write>(
    writer: &mut W,
    repo: &StatsRepository,
    today: NaiveDate,
    distance: &DistanceFormat,
    json: bool,
) -> Result<()> {
    let stats = repo
        .get_daily_stats(today)?
        .unwrap_or_else(|| DailyStats::new(today));

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&stats)?)?;
    } else {
        write!(writer, "{}", format_today(&stats, distance))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::DistanceUnit;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn seeded_repo() -> StatsRepository {
        let mut repo = StatsRepository::open_in_memory().unwrap();
        let stats = DailyStats {
            date: day(),
            distance_pixels: 9600.0,
            left_clicks: 6,
            right_clicks: 3,
            middle_clicks: 1,
            active_time_seconds: 3725,
            inactive_time_seconds: 200,
        };
        repo.create_daily_stats_entry(day()).unwrap();
        repo.update_daily_stats(&stats).unwrap();
        repo.save().unwrap();
        repo
    }

    #[test]
    fn today_text_output() {
        let repo = seeded_repo();
        let mut output = Vec::new();
        let distance = DistanceFormat::new(DistanceUnit::Metric, Some(96.0));
        run(&mut output, &repo, day(), &distance, false).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Today (2024-03-01)
          Distance:      2.54 m
          Clicks:        10 (left 6, right 3, middle 1)
          Active time:   01:02:05
          Inactive time: 00:03:20
        ");
    }

    #[test]
    fn today_json_output() {
        let repo = seeded_repo();
        let mut output = Vec::new();
        let distance = DistanceFormat::new(DistanceUnit::Pixels, None);
        run(&mut output, &repo, day(), &distance, true).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r#"
        {
          "date": "2024-03-01",
          "distance_pixels": 9600.0,
          "left_clicks": 6,
          "right_clicks": 3,
          "middle_clicks": 1,
          "active_time_seconds": 3725,
          "inactive_time_seconds": 200
        }
        "#);
    }

    #[test]
    fn missing_day_reports_zeros() {
        let repo = StatsRepository::open_in_memory().unwrap();
        let mut output = Vec::new();
        let distance = DistanceFormat::new(DistanceUnit::Pixels, None);
        run(&mut output, &repo, day(), &distance, false).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Today (2024-03-01)
          Distance:      0 pixels
          Clicks:        0 (left 0, right 0, middle 0)
          Active time:   00:00:00
          Inactive time: 00:00:00
        ");
    }
}
