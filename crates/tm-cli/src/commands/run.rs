//! Run command: tracks pointer activity until told to stop.

use std::io::Write;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tm_core::Clock;
use tm_db::StatsRepository;
use tm_tracker::{
    AggregatorSettings, EngineSettings, PointerSource, TickerSettings, TrackingEngine,
    TrackingToggles, first_launch_timestamp,
};

use super::util::{Counters, format_counters};
use crate::Config;
use crate::units::DistanceFormat;

/// Translates configuration into engine settings.
pub fn engine_settings(config: &Config) -> Result<EngineSettings> {
    if config.tick_interval_secs == 0 {
        bail!("tick_interval_secs must be at least 1");
    }
    let tick_seconds =
        i64::try_from(config.tick_interval_secs).context("tick_interval_secs is too large")?;

    Ok(EngineSettings {
        aggregator: AggregatorSettings {
            tick_seconds,
            flush_interval_ticks: config.flush_interval_ticks(),
            first_launch_date: config
                .first_launch_date
                .clone()
                .unwrap_or_else(first_launch_timestamp),
        },
        ticker: TickerSettings {
            interval: Duration::from_secs(config.tick_interval_secs),
            inactivity_threshold: Duration::from_secs(config.inactivity_threshold_secs),
        },
        toggles: Arc::new(TrackingToggles::new(
            config.track_distance,
            config.track_clicks,
        )),
    })
}

/// Runs the engine until `stop` fires or its sender is dropped, then flushes
/// and prints today's counters.
pub fn run<W: Write>(
    writer: &mut W,
    repo: StatsRepository,
    config: &Config,
    source: Arc<dyn PointerSource>,
    clock: Arc<dyn Clock>,
    stop: &Receiver<()>,
) -> Result<()> {
    let settings = engine_settings(config)?;
    let engine =
        TrackingEngine::start(repo, settings, source, clock).context("failed to start tracking")?;

    writeln!(writer, "Tracking pointer activity. Press Ctrl-C to stop.")?;
    writer.flush()?;

    let _ = stop.recv();
    tracing::info!("stop requested");

    let today = engine.aggregator().get_todays_stats();
    engine.shutdown().context("failed to save counters")?;

    writeln!(writer, "Stopped. Today ({}) so far:", today.date)?;
    write!(
        writer,
        "{}",
        format_counters(Counters::from(&today), &DistanceFormat::from_config(config))
    )?;
    Ok(())
}
