//! Storage layer for the pointer activity tracker.
//!
//! Provides persistence for per-day counters and application settings using
//! `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`StatsRepository`] type wraps a `rusqlite::Connection`, which is `Send`
//! but not `Sync`. The tracker keeps exactly one repository behind a mutex so
//! that every read and write goes through a single connection, one caller at a
//! time.
//!
//! # Schema
//!
//! ## Date Format
//!
//! Dates are stored as TEXT in ISO 8601 calendar format (e.g., `2024-01-15`).
//! Lexicographic ordering matches chronological ordering, which the history
//! and record queries rely on.
//!
//! ## Pending Writes
//!
//! [`StatsRepository::update_daily_stats`] writes inside an open transaction
//! that only [`StatsRepository::save`] (or [`StatsRepository::close`]) commits.
//! Dropping the repository without saving rolls those updates back, which is
//! what an abrupt process exit looks like on disk. Row creation and settings
//! writes commit immediately.

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;
use tm_core::{DailyStats, GlobalStats, RecordMetric};

/// Settings key holding the first launch timestamp.
pub const FIRST_LAUNCH_DATE_KEY: &str = "first_launch_date";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// How long a statement waits on another process's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const DAILY_STATS_COLUMNS: &str = "date, distance_pixels, left_clicks, right_clicks, middle_clicks, active_time_seconds, inactive_time_seconds";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored date could not be parsed.
    #[error("invalid stored date: {value}")]
    DateParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Repository over the stats database.
///
/// See the [module documentation](self) for thread safety and commit
/// semantics.
pub struct StatsRepository {
    conn: Connection,
}

/// A `daily_stats` row as stored, before the date is parsed.
struct DailyStatsRow {
    date: String,
    distance_pixels: f64,
    left_clicks: i64,
    right_clicks: i64,
    middle_clicks: i64,
    active_time_seconds: i64,
    inactive_time_seconds: i64,
}

impl DailyStatsRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date: row.get(0)?,
            distance_pixels: row.get(1)?,
            left_clicks: row.get(2)?,
            right_clicks: row.get(3)?,
            middle_clicks: row.get(4)?,
            active_time_seconds: row.get(5)?,
            inactive_time_seconds: row.get(6)?,
        })
    }

    fn into_stats(self) -> Result<DailyStats, DbError> {
        let date = parse_date(&self.date)?;
        Ok(DailyStats {
            date,
            distance_pixels: self.distance_pixels,
            left_clicks: self.left_clicks,
            right_clicks: self.right_clicks,
            middle_clicks: self.middle_clicks,
            active_time_seconds: self.active_time_seconds,
            inactive_time_seconds: self.inactive_time_seconds,
        })
    }
}

impl StatsRepository {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        tracing::info!(path = %path.display(), "opening stats database");
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let repo = Self { conn };
        repo.init()?;
        Ok(repo)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.init()?;
        Ok(repo)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- One row per local calendar day; date is 'YYYY-MM-DD'
            CREATE TABLE IF NOT EXISTS daily_stats (
                date TEXT PRIMARY KEY,
                distance_pixels REAL NOT NULL DEFAULT 0.0,
                left_clicks INTEGER NOT NULL DEFAULT 0,
                right_clicks INTEGER NOT NULL DEFAULT 0,
                middle_clicks INTEGER NOT NULL DEFAULT 0,
                active_time_seconds INTEGER NOT NULL DEFAULT 0,
                inactive_time_seconds INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS app_settings (
                key TEXT PRIMARY KEY,
                value TEXT
            );
            ",
        )?;
        tracing::debug!("stats schema ready");
        Ok(())
    }

    /// Returns the row for `date`, if one exists.
    pub fn get_daily_stats(&self, date: NaiveDate) -> Result<Option<DailyStats>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {DAILY_STATS_COLUMNS} FROM daily_stats WHERE date = ?"),
                [format_date(date)],
                DailyStatsRow::from_row,
            )
            .optional()?;
        row.map(DailyStatsRow::into_stats).transpose()
    }

    /// Inserts a zeroed row for `date`, ignoring an existing one.
    ///
    /// Returns whether a row was inserted. Commits immediately, together with
    /// any pending updates.
    pub fn create_daily_stats_entry(&mut self, date: NaiveDate) -> Result<bool, DbError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO daily_stats (date) VALUES (?)",
            [format_date(date)],
        )?;
        if inserted > 0 {
            tracing::info!(%date, "created daily stats row");
        }
        self.save()?;
        Ok(inserted > 0)
    }

    /// Overwrites every counter of the row keyed by `stats.date`.
    ///
    /// The write stays pending until [`save`](Self::save). Returns the number
    /// of rows changed, which is 0 when the date has no row yet.
    pub fn update_daily_stats(&mut self, stats: &DailyStats) -> Result<usize, DbError> {
        self.begin_pending()?;
        let changed = self.conn.execute(
            "
            UPDATE daily_stats
            SET distance_pixels = ?, left_clicks = ?, right_clicks = ?, middle_clicks = ?,
                active_time_seconds = ?, inactive_time_seconds = ?
            WHERE date = ?
            ",
            params![
                stats.distance_pixels,
                stats.left_clicks,
                stats.right_clicks,
                stats.middle_clicks,
                stats.active_time_seconds,
                stats.inactive_time_seconds,
                format_date(stats.date),
            ],
        )?;
        tracing::trace!(date = %stats.date, changed, "updated daily stats");
        Ok(changed)
    }

    /// Reads a value from `app_settings`.
    pub fn get_app_setting(&self, key: &str) -> Result<Option<String>, DbError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?",
                [key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    /// Inserts or replaces a value in `app_settings`. Commits immediately.
    pub fn set_app_setting(&mut self, key: &str, value: &str) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO app_settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
            params![key, value],
        )?;
        tracing::info!(key, value, "stored app setting");
        self.save()
    }

    /// Sums every persisted day.
    ///
    /// Returns zeroed totals for an empty table.
    pub fn get_global_stats(&self) -> Result<GlobalStats, DbError> {
        let stats = self.conn.query_row(
            "
            SELECT
                COALESCE(SUM(distance_pixels), 0.0),
                COALESCE(SUM(left_clicks), 0),
                COALESCE(SUM(right_clicks), 0),
                COALESCE(SUM(middle_clicks), 0),
                COALESCE(SUM(active_time_seconds), 0),
                COALESCE(SUM(inactive_time_seconds), 0),
                COUNT(*)
            FROM daily_stats
            ",
            [],
            |row| {
                Ok(GlobalStats {
                    total_distance_pixels: row.get(0)?,
                    left_clicks: row.get(1)?,
                    right_clicks: row.get(2)?,
                    middle_clicks: row.get(3)?,
                    total_active_time_seconds: row.get(4)?,
                    total_inactive_time_seconds: row.get(5)?,
                    days_tracked: row.get(6)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Returns up to `num_days` of the most recent rows, newest first.
    ///
    /// A non-positive `num_days` yields an empty list.
    pub fn get_last_n_days_stats(&self, num_days: i64) -> Result<Vec<DailyStats>, DbError> {
        if num_days <= 0 {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DAILY_STATS_COLUMNS} FROM daily_stats ORDER BY date DESC LIMIT ?"
        ))?;
        let rows = stmt.query_map([num_days], DailyStatsRow::from_row)?;
        let mut days = Vec::new();
        for row in rows {
            days.push(row?.into_stats()?);
        }
        Ok(days)
    }

    /// Returns the day with the highest value for `metric`.
    ///
    /// Ties go to the earliest date. Returns `None` when no rows exist.
    pub fn get_record_day(&self, metric: RecordMetric) -> Result<Option<DailyStats>, DbError> {
        let column = metric.column();
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {DAILY_STATS_COLUMNS} FROM daily_stats ORDER BY {column} DESC, date ASC LIMIT 1"
                ),
                [],
                DailyStatsRow::from_row,
            )
            .optional()?;
        row.map(DailyStatsRow::into_stats).transpose()
    }

    /// Commits pending writes.
    pub fn save(&mut self) -> Result<(), DbError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
            tracing::debug!("committed pending stats");
        }
        Ok(())
    }

    /// Commits pending writes and closes the connection.
    pub fn close(mut self) -> Result<(), DbError> {
        self.save()?;
        self.conn.close().map_err(|(_, err)| DbError::Sqlite(err))?;
        tracing::info!("stats database closed");
        Ok(())
    }

    fn begin_pending(&self) -> Result<(), DbError> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN DEFERRED")?;
        }
        Ok(())
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| DbError::DateParse {
        value: value.to_string(),
        source,
    })
}
