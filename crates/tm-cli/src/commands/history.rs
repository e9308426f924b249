//! History command for listing the most recent days.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use tm_core::DailyStats;
use tm_db::StatsRepository;

use super::util::count_noun;
use crate::units::{DistanceFormat, format_hms};

/// Formats one line per day, newest first.
pub fn format_history(days: &[DailyStats], requested: i64, distance: &DistanceFormat) -> String {
    if requested <= 0 {
        return format!("Nothing to show for {requested} days; pass --days 1 or more.\n");
    }
    if days.is_empty() {
        return "No days recorded yet.\n".to_string();
    }

    let shown = i64::try_from(days.len()).unwrap_or(i64::MAX);
    let mut out = format!("Last {}\n", count_noun(shown, "day"));
    for day in days {
        let _ = writeln!(
            out,
            "  {}  {}  {}  active {}  inactive {}",
            day.date,
            distance.format(day.distance_pixels),
            count_noun(day.total_clicks(), "click"),
            format_hms(day.active_time_seconds),
            format_hms(day.inactive_time_seconds),
        );
    }
    out
}

/// Runs the history command. Fewer rows than requested is not an error.
pub fn run<W: Write>(
    writer: &mut W,
    repo: &StatsRepository,
    num_days: i64,
    distance: &DistanceFormat,
    json: bool,
) -> Result<()> {
    let days = repo.get_last_n_days_stats(num_days)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&days)?)?;
    } else {
        write!(writer, "{}", format_history(&days, num_days, distance))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use insta::assert_snapshot;

    use crate::DistanceUnit;

    fn seeded_repo() -> StatsRepository {
        let mut repo = StatsRepository::open_in_memory().unwrap();
        for day in 1..=5 {
            let date = NaiveDate::from_ymd_opt(2024, 2, day).unwrap();
            let mut stats = DailyStats::new(date);
            stats.distance_pixels = f64::from(day) * 100.0;
            stats.right_clicks = i64::from(day) - 1;
            stats.active_time_seconds = i64::from(day) * 60;
            repo.create_daily_stats_entry(date).unwrap();
            repo.update_daily_stats(&stats).unwrap();
        }
        repo.save().unwrap();
        repo
    }

    #[test]
    fn history_lists_newest_first() {
        let repo = seeded_repo();
        let mut output = Vec::new();
        let distance = DistanceFormat::new(DistanceUnit::Pixels, None);
        run(&mut output, &repo, 3, &distance, false).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Last 3 days
          2024-02-05  500 pixels  4 clicks  active 00:05:00  inactive 00:00:00
          2024-02-04  400 pixels  3 clicks  active 00:04:00  inactive 00:00:00
          2024-02-03  300 pixels  2 clicks  active 00:03:00  inactive 00:00:00
        ");
    }

    #[test]
    fn history_longer_than_data_returns_everything() {
        let repo = seeded_repo();
        let mut output = Vec::new();
        let distance = DistanceFormat::new(DistanceUnit::Pixels, None);
        run(&mut output, &repo, 100, &distance, true).unwrap();

        let days: Vec<DailyStats> = serde_json::from_slice(&output).unwrap();
        let dates: Vec<String> = days.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(
            dates,
            ["2024-02-05", "2024-02-04", "2024-02-03", "2024-02-02", "2024-02-01"]
        );
    }

    #[test]
    fn header_counts_rows_shown() {
        let repo = seeded_repo();
        let mut output = Vec::new();
        let distance = DistanceFormat::new(DistanceUnit::Pixels, None);
        run(&mut output, &repo, 100, &distance, false).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("Last 5 days\n"), "{output}");
    }

    #[test]
    fn non_positive_request_is_not_reported_as_empty_history() {
        let repo = seeded_repo();
        let distance = DistanceFormat::new(DistanceUnit::Pixels, None);
        for days in [0, -3] {
            let mut output = Vec::new();
            run(&mut output, &repo, days, &distance, false).unwrap();
            let output = String::from_utf8(output).unwrap();
            assert_eq!(
                output,
                format!("Nothing to show for {days} days; pass --days 1 or more.\n")
            );
        }
    }

    #[test]
    fn empty_history() {
        let repo = StatsRepository::open_in_memory().unwrap();
        let mut output = Vec::new();
        let distance = DistanceFormat::new(DistanceUnit::Pixels, None);
        run(&mut output, &repo, 7, &distance, false).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "No days recorded yet.\n");
    }
}
