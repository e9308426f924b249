//! Wires producers, bus and aggregator into one running engine.

use std::sync::Arc;

use tm_core::{Clock, Event, EventBus};
use tm_db::StatsRepository;

use crate::aggregator::{Aggregator, AggregatorSettings};
use crate::error::TrackerError;
use crate::pointer::{PointerListener, PointerSource, TrackingToggles};
use crate::ticker::{ActivityMonitor, ActivityTicker, TickerSettings};

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub aggregator: AggregatorSettings,
    pub ticker: TickerSettings,
    pub toggles: Arc<TrackingToggles>,
}

/// A running tracker: both producers publishing into the aggregator.
pub struct TrackingEngine {
    bus: Arc<EventBus<Event>>,
    aggregator: Arc<Aggregator>,
    ticker: ActivityTicker,
    listener: PointerListener,
}

impl TrackingEngine {
    /// Builds the engine around `repo` and starts both producers.
    ///
    /// Fails if today's row cannot be loaded or a producer thread cannot be
    /// spawned. A pointer source that cannot attach only disables pointer
    /// tracking.
    pub fn start(
        repo: StatsRepository,
        settings: EngineSettings,
        source: Arc<dyn PointerSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TrackerError> {
        let bus = Arc::new(EventBus::new());

        let aggregator = Arc::new(Aggregator::new(repo, clock.today(), settings.aggregator)?);
        aggregator.attach(&bus);

        let monitor = Arc::new(ActivityMonitor::new(Arc::clone(&clock)));
        monitor.attach(&bus);

        let mut listener = PointerListener::new(Arc::clone(&bus), source, settings.toggles);
        // the ticker starts from the date the aggregator loaded, not a second clock read
        let start_date = aggregator.get_todays_stats().date;
        let mut ticker = ActivityTicker::new(
            Arc::clone(&bus),
            clock,
            monitor,
            settings.ticker,
            start_date,
        );
        listener.start()?;
        ticker.start()?;

        tracing::info!(
            pointer = listener.is_running(),
            interval = ?settings.ticker.interval,
            "tracking started"
        );
        Ok(Self {
            bus,
            aggregator,
            ticker,
            listener,
        })
    }

    /// The read API for presentation code.
    pub const fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    pub const fn bus(&self) -> &Arc<EventBus<Event>> {
        &self.bus
    }

    /// Stops both producers, then flushes and closes the store.
    pub fn shutdown(self) -> Result<(), TrackerError> {
        let Self {
            bus,
            aggregator,
            mut ticker,
            mut listener,
        } = self;

        listener.stop();
        ticker.stop();
        drop(listener);
        drop(ticker);
        // subscribers hold the remaining aggregator handles
        drop(bus);

        match Arc::try_unwrap(aggregator) {
            Ok(aggregator) => aggregator.close()?,
            Err(shared) => {
                tracing::warn!("aggregator still referenced; flushing without closing");
                shared.shutdown()?;
            }
        }
        tracing::info!("tracking stopped");
        Ok(())
    }
}
