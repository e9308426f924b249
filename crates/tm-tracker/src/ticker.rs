//! Clock-driven activity signal.
//!
//! The ticker thread wakes once per interval, publishes `day_changed` when
//! the calendar date moved since the last tick, then publishes one
//! `activity_tick` saying whether the pointer was used within the inactivity
//! threshold. It is the only component that looks at the calendar.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use parking_lot::Mutex;
use tm_core::{ActivityStatus, Clock, Event, EventBus, EventKind};

use crate::error::TrackerError;
use crate::worker::{STOP_TIMEOUT, StopSignal, join_bounded};

const THREAD_NAME: &str = "activity-ticker";

/// Remembers when the pointer was last used.
pub struct ActivityMonitor {
    clock: Arc<dyn Clock>,
    last_activity: Mutex<Instant>,
}

impl ActivityMonitor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            last_activity: Mutex::new(now),
        }
    }

    /// Marks the pointer as used right now.
    pub fn record_activity(&self) {
        *self.last_activity.lock() = self.clock.now();
    }

    /// Time since the pointer was last used.
    pub fn idle_for(&self) -> Duration {
        self.clock
            .now()
            .saturating_duration_since(*self.last_activity.lock())
    }

    /// Records activity on every pointer event published on `bus`.
    pub fn attach(self: &Arc<Self>, bus: &EventBus<Event>) {
        for kind in [EventKind::PointerMoved, EventKind::PointerClicked] {
            let this = Arc::clone(self);
            bus.subscribe(kind, "activity_monitor", move |_| {
                this.record_activity();
                Ok(())
            });
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TickerSettings {
    pub interval: Duration,
    /// Idle time beyond which a tick counts as inactive.
    pub inactivity_threshold: Duration,
}

impl Default for TickerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            inactivity_threshold: Duration::from_secs(2),
        }
    }
}

/// One ticker loop iteration, separated from the thread for testing.
struct TickerState {
    clock: Arc<dyn Clock>,
    monitor: Arc<ActivityMonitor>,
    inactivity_threshold: Duration,
    /// Last date the ticker observed; shared so a restart resumes from it.
    today: Arc<Mutex<NaiveDate>>,
}

impl TickerState {
    fn tick(&mut self, bus: &EventBus<Event>) -> ActivityStatus {
        let current = self.clock.today();
        let previous = *self.today.lock();
        if current != previous {
            tracing::info!(old_date = %previous, new_date = %current, "date changed");
            bus.publish(&Event::DayChanged {
                old_date: previous,
                new_date: current,
            });
            *self.today.lock() = current;
            self.monitor.record_activity();
        }

        let status = if self.monitor.idle_for() > self.inactivity_threshold {
            ActivityStatus::Inactive
        } else {
            ActivityStatus::Active
        };
        bus.publish(&Event::ActivityTick { status });
        status
    }
}

/// Background thread publishing activity ticks.
pub struct ActivityTicker {
    bus: Arc<EventBus<Event>>,
    clock: Arc<dyn Clock>,
    monitor: Arc<ActivityMonitor>,
    settings: TickerSettings,
    today: Arc<Mutex<NaiveDate>>,
    running: Option<(Arc<StopSignal>, JoinHandle<()>)>,
}

impl ActivityTicker {
    /// `today` is the date counters are currently credited to; the first
    /// tick on a later date publishes `day_changed` from it.
    pub fn new(
        bus: Arc<EventBus<Event>>,
        clock: Arc<dyn Clock>,
        monitor: Arc<ActivityMonitor>,
        settings: TickerSettings,
        today: NaiveDate,
    ) -> Self {
        Self {
            bus,
            clock,
            monitor,
            settings,
            today: Arc::new(Mutex::new(today)),
            running: None,
        }
    }

    pub const fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Spawns the ticker thread. No-op if it is already running.
    pub fn start(&mut self) -> Result<(), TrackerError> {
        if self.running.is_some() {
            return Ok(());
        }

        let stop = Arc::new(StopSignal::default());
        let mut state = TickerState {
            clock: Arc::clone(&self.clock),
            monitor: Arc::clone(&self.monitor),
            inactivity_threshold: self.settings.inactivity_threshold,
            today: Arc::clone(&self.today),
        };
        let bus = Arc::clone(&self.bus);
        let interval = self.settings.interval;
        let signal = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                tracing::debug!(?interval, "ticker started");
                while !signal.wait(interval) {
                    state.tick(&bus);
                }
                tracing::debug!("ticker stopped");
            })
            .map_err(|source| TrackerError::Spawn {
                name: THREAD_NAME,
                source,
            })?;

        self.running = Some((stop, handle));
        Ok(())
    }

    /// Stops the thread and waits (bounded) for it to exit. Idempotent.
    pub fn stop(&mut self) {
        if let Some((stop, handle)) = self.running.take() {
            stop.stop();
            join_bounded(handle, THREAD_NAME, STOP_TIMEOUT);
        }
    }
}

impl Drop for ActivityTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tm_core::ManualClock;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn recording_bus() -> (Arc<EventBus<Event>>, Arc<Mutex<Vec<Event>>>) {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [EventKind::ActivityTick, EventKind::DayChanged] {
            let seen = Arc::clone(&seen);
            bus.subscribe(kind, "recorder", move |event: &Event| {
                seen.lock().push(event.clone());
                Ok(())
            });
        }
        (bus, seen)
    }

    fn setup() -> (Arc<ManualClock>, Arc<ActivityMonitor>, TickerState) {
        let clock = Arc::new(ManualClock::new(day(1)));
        let monitor = Arc::new(ActivityMonitor::new(clock.clone()));
        let state = TickerState {
            clock: clock.clone(),
            monitor: Arc::clone(&monitor),
            inactivity_threshold: Duration::from_secs(2),
            today: Arc::new(Mutex::new(day(1))),
        };
        (clock, monitor, state)
    }

    #[test]
    fn tick_is_active_within_threshold() {
        let (bus, seen) = recording_bus();
        let (clock, _monitor, mut state) = setup();
        clock.advance(Duration::from_secs(2));
        assert_eq!(state.tick(&bus), ActivityStatus::Active);
        assert_eq!(
            *seen.lock(),
            vec![Event::ActivityTick {
                status: ActivityStatus::Active
            }]
        );
    }

    #[test]
    fn tick_is_inactive_past_threshold() {
        let (bus, _seen) = recording_bus();
        let (clock, monitor, mut state) = setup();
        clock.advance(Duration::from_secs(3));
        assert_eq!(state.tick(&bus), ActivityStatus::Inactive);

        monitor.record_activity();
        assert_eq!(state.tick(&bus), ActivityStatus::Active);
    }

    #[test]
    fn pointer_events_reset_idle_time() {
        let bus = EventBus::new();
        let clock = Arc::new(ManualClock::new(day(1)));
        let monitor = Arc::new(ActivityMonitor::new(clock.clone()));
        monitor.attach(&bus);

        clock.advance(Duration::from_secs(10));
        assert_eq!(monitor.idle_for(), Duration::from_secs(10));
        bus.publish(&Event::PointerMoved { x: 1, y: 1 });
        assert_eq!(monitor.idle_for(), Duration::ZERO);

        clock.advance(Duration::from_secs(4));
        bus.publish(&Event::PointerClicked {
            button: tm_core::PointerButton::Left,
        });
        assert_eq!(monitor.idle_for(), Duration::ZERO);
    }

    #[test]
    fn day_change_is_published_before_tick() {
        let (bus, seen) = recording_bus();
        let (clock, _monitor, mut state) = setup();
        clock.advance(Duration::from_secs(30));
        clock.set_today(day(2));

        // the date change resets idle time, so this tick is active
        assert_eq!(state.tick(&bus), ActivityStatus::Active);
        assert_eq!(
            *seen.lock(),
            vec![
                Event::DayChanged {
                    old_date: day(1),
                    new_date: day(2),
                },
                Event::ActivityTick {
                    status: ActivityStatus::Active
                },
            ]
        );

        seen.lock().clear();
        state.tick(&bus);
        assert_eq!(seen.lock().len(), 1, "day change published once");
    }

    #[test]
    fn first_tick_rolls_over_from_start_date() {
        let (bus, seen) = recording_bus();
        let clock = Arc::new(ManualClock::new(day(2)));
        let monitor = Arc::new(ActivityMonitor::new(clock.clone()));
        let mut state = TickerState {
            clock: clock.clone(),
            monitor,
            inactivity_threshold: Duration::from_secs(2),
            today: Arc::new(Mutex::new(day(1))),
        };

        state.tick(&bus);
        assert_eq!(
            seen.lock().first(),
            Some(&Event::DayChanged {
                old_date: day(1),
                new_date: day(2),
            })
        );
    }

    #[test]
    fn ticker_thread_publishes_until_stopped() {
        let (bus, seen) = recording_bus();
        let clock = Arc::new(ManualClock::new(day(1)));
        let monitor = Arc::new(ActivityMonitor::new(clock.clone()));
        let mut ticker = ActivityTicker::new(
            bus,
            clock,
            monitor,
            TickerSettings {
                interval: Duration::from_millis(5),
                ..TickerSettings::default()
            },
            day(1),
        );

        ticker.start().unwrap();
        ticker.start().unwrap();
        assert!(ticker.is_running());

        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.lock().len() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        ticker.stop();
        assert!(!ticker.is_running());

        let count = seen.lock().len();
        assert!(count >= 3);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(seen.lock().len(), count, "no ticks after stop");

        ticker.stop();
    }
}
