//! Turns the event stream into per-day counters.
//!
//! # State
//!
//! The aggregator owns the only mutable shared state in the engine: the
//! in-memory snapshot of today's counters, plus the previous pointer position
//! used for distance. Pointer events arrive on the listener thread and ticks
//! on the ticker thread, so the state sits behind a mutex and every handler
//! holds it for its whole body.
//!
//! # Lock Order
//!
//! `state` is always taken before `repo`. Flushes and the day rollover run
//! with `state` held, so a concurrent writer never sees a half-rolled-over
//! day and an older snapshot can never overwrite a newer one.
//!
//! # Durability
//!
//! The snapshot reaches the store on day change, every
//! `flush_interval_ticks` ticks, before every history query, and on
//! shutdown. Anything counted after the last flush is lost on a crash.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use tm_core::{
    ActivityStatus, DailyStats, Event, EventBus, EventKind, GlobalStats, PointerButton,
    RecordMetric, euclidean_distance,
};
use tm_db::{DbError, FIRST_LAUNCH_DATE_KEY, StatsRepository};

use crate::error::TrackerError;

/// Tunables for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Seconds credited per activity tick.
    pub tick_seconds: i64,
    /// Flush after this many ticks; 0 flushes only on day change and shutdown.
    pub flush_interval_ticks: u32,
    /// Seeds the `first_launch_date` setting when the store has none.
    pub first_launch_date: String,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            tick_seconds: 1,
            flush_interval_ticks: 60,
            first_launch_date: first_launch_timestamp(),
        }
    }
}

/// Local time formatted the way `first_launch_date` is stored.
pub fn first_launch_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[derive(Debug)]
struct TodayState {
    snapshot: DailyStats,
    last_position: Option<(i32, i32)>,
    ticks_since_flush: u32,
}

/// Holds today's counters and applies events to them.
pub struct Aggregator {
    state: Mutex<TodayState>,
    repo: Mutex<StatsRepository>,
    settings: AggregatorSettings,
}

impl Aggregator {
    /// Loads (or creates) the row for `today` and seeds the first launch date.
    ///
    /// Store failures here are fatal: the engine cannot run without its store.
    pub fn new(
        mut repo: StatsRepository,
        today: NaiveDate,
        settings: AggregatorSettings,
    ) -> Result<Self, TrackerError> {
        let snapshot = load_or_create(&mut repo, today)?;
        if repo.get_app_setting(FIRST_LAUNCH_DATE_KEY)?.is_none() {
            tracing::info!(
                first_launch_date = %settings.first_launch_date,
                "recording first launch date"
            );
            repo.set_app_setting(FIRST_LAUNCH_DATE_KEY, &settings.first_launch_date)?;
        }
        tracing::info!(date = %today, "aggregator ready");

        Ok(Self {
            state: Mutex::new(TodayState {
                snapshot,
                last_position: None,
                ticks_since_flush: 0,
            }),
            repo: Mutex::new(repo),
            settings,
        })
    }

    /// Subscribes the aggregator to every event kind on `bus`.
    pub fn attach(self: &Arc<Self>, bus: &EventBus<Event>) {
        for kind in EventKind::ALL {
            let this = Arc::clone(self);
            bus.subscribe(kind, "aggregator", move |event| {
                this.handle(event).map_err(Into::into)
            });
        }
    }

    /// Applies one event to the snapshot.
    pub fn handle(&self, event: &Event) -> Result<(), TrackerError> {
        match *event {
            Event::PointerMoved { x, y } => self.on_pointer_moved(x, y),
            Event::PointerClicked { button } => self.on_pointer_clicked(button),
            Event::ActivityTick { status } => return self.on_activity_tick(status),
            Event::DayChanged { old_date, new_date } => self.on_day_changed(old_date, new_date),
        }
        Ok(())
    }

    fn on_pointer_moved(&self, x: i32, y: i32) {
        let mut state = self.state.lock();
        if let Some(previous) = state.last_position {
            state.snapshot.distance_pixels += euclidean_distance(previous, (x, y));
        }
        state.last_position = Some((x, y));
    }

    fn on_pointer_clicked(&self, button: PointerButton) {
        if !self.state.lock().snapshot.record_click(button) {
            tracing::debug!(?button, "ignoring click from uncounted button");
        }
    }

    fn on_activity_tick(&self, status: ActivityStatus) -> Result<(), TrackerError> {
        let mut state = self.state.lock();
        match status {
            ActivityStatus::Active => state.snapshot.active_time_seconds += self.settings.tick_seconds,
            ActivityStatus::Inactive => {
                state.snapshot.inactive_time_seconds += self.settings.tick_seconds;
            }
        }

        let interval = self.settings.flush_interval_ticks;
        if interval == 0 {
            return Ok(());
        }
        state.ticks_since_flush += 1;
        if state.ticks_since_flush >= interval {
            state.ticks_since_flush = 0;
            self.write_snapshot(&state.snapshot)?;
            tracing::debug!(date = %state.snapshot.date, "periodic flush");
        }
        Ok(())
    }

    fn on_day_changed(&self, old_date: NaiveDate, new_date: NaiveDate) {
        let mut state = self.state.lock();
        if state.snapshot.date == new_date {
            tracing::debug!(%new_date, "day already current; ignoring day change");
            return;
        }
        if state.snapshot.date != old_date {
            tracing::warn!(
                snapshot_date = %state.snapshot.date,
                %old_date,
                "day change does not start from the tracked day"
            );
        }
        tracing::info!(%old_date, %new_date, "rolling over to new day");

        if let Err(err) = self.write_snapshot(&state.snapshot) {
            tracing::error!(
                date = %state.snapshot.date,
                error = %err,
                "failed to flush outgoing day; continuing rollover"
            );
        }

        let next = load_or_create(&mut self.repo.lock(), new_date).unwrap_or_else(|err| {
            tracing::error!(date = %new_date, error = %err, "failed to load new day; starting from zero");
            DailyStats::new(new_date)
        });
        state.snapshot = next;
        state.last_position = None;
        state.ticks_since_flush = 0;
    }

    /// Copy of today's live counters.
    pub fn get_todays_stats(&self) -> DailyStats {
        self.state.lock().snapshot.clone()
    }

    /// Totals across every day, today's live counters included.
    ///
    /// Falls back to zeroed totals if the store cannot be read.
    pub fn get_global_stats(&self) -> GlobalStats {
        self.flush_logged();
        self.repo.lock().get_global_stats().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to read global stats");
            GlobalStats::default()
        })
    }

    /// Up to `num_days` most recent days, newest first.
    pub fn get_last_n_days_stats(&self, num_days: i64) -> Vec<DailyStats> {
        self.flush_logged();
        self.repo
            .lock()
            .get_last_n_days_stats(num_days)
            .unwrap_or_else(|err| {
                tracing::warn!(num_days, error = %err, "failed to read history");
                Vec::new()
            })
    }

    /// The day with the highest `metric`, earliest first on ties.
    pub fn get_record_day(&self, metric: RecordMetric) -> Option<DailyStats> {
        self.flush_logged();
        self.repo.lock().get_record_day(metric).unwrap_or_else(|err| {
            tracing::warn!(%metric, error = %err, "failed to read record day");
            None
        })
    }

    pub fn get_first_launch_date(&self) -> Option<String> {
        self.repo
            .lock()
            .get_app_setting(FIRST_LAUNCH_DATE_KEY)
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to read first launch date");
                None
            })
    }

    /// Writes the snapshot to the store and commits it.
    pub fn flush(&self) -> Result<(), TrackerError> {
        let state = self.state.lock();
        self.write_snapshot(&state.snapshot)?;
        Ok(())
    }

    /// Final flush for a shared aggregator that cannot be closed.
    pub fn shutdown(&self) -> Result<(), TrackerError> {
        tracing::info!("final flush before shutdown");
        self.flush()
    }

    /// Flushes the snapshot and closes the store.
    pub fn close(self) -> Result<(), TrackerError> {
        let state = self.state.into_inner();
        let mut repo = self.repo.into_inner();
        write_snapshot(&mut repo, &state.snapshot)?;
        repo.close()?;
        tracing::info!(date = %state.snapshot.date, "aggregator closed");
        Ok(())
    }

    fn flush_logged(&self) {
        if let Err(err) = self.flush() {
            tracing::warn!(error = %err, "flush before query failed");
        }
    }

    fn write_snapshot(&self, snapshot: &DailyStats) -> Result<(), DbError> {
        write_snapshot(&mut self.repo.lock(), snapshot)
    }
}

fn load_or_create(repo: &mut StatsRepository, date: NaiveDate) -> Result<DailyStats, DbError> {
    if let Some(stats) = repo.get_daily_stats(date)? {
        tracing::debug!(%date, "resuming stored day");
        return Ok(stats);
    }
    repo.create_daily_stats_entry(date)?;
    Ok(repo
        .get_daily_stats(date)?
        .unwrap_or_else(|| DailyStats::new(date)))
}

fn write_snapshot(repo: &mut StatsRepository, snapshot: &DailyStats) -> Result<(), DbError> {
    if repo.update_daily_stats(snapshot)? == 0 {
        repo.create_daily_stats_entry(snapshot.date)?;
        repo.update_daily_stats(snapshot)?;
    }
    repo.save()
}
