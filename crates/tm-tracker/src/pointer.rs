//! Pointer input listener.
//!
//! A [`PointerSource`] pushes raw pointer events into a bounded channel. The
//! listener's dispatcher thread drains that channel and publishes
//! `pointer_moved` / `pointer_clicked` on the bus, consulting
//! [`TrackingToggles`] for every event. Only button presses count as clicks.
//!
//! Sources never block on a slow dispatcher: when the buffer is full the
//! event is dropped (see [`offer`]).
//!
//! # Stopping
//!
//! Global input hooks generally cannot be unblocked once installed, so the
//! hook itself may outlive the listener. `stop()` detaches the source, signals
//! the dispatcher and joins it; once it returns nothing more reaches the bus.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tm_core::{Event, EventBus, PointerButton};

use crate::error::TrackerError;
use crate::worker::{STOP_TIMEOUT, StopSignal, join_bounded};

const THREAD_NAME: &str = "pointer-listener";

/// How often the dispatcher checks for a stop request while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Raw events a source may queue ahead of the dispatcher.
pub const EVENT_BUFFER: usize = 1024;

/// A pointer event as reported by the input source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawPointerEvent {
    Moved { x: f64, y: f64 },
    Pressed(PointerButton),
    Released(PointerButton),
}

#[derive(Debug, Error)]
pub enum PointerSourceError {
    #[error("pointer input unavailable: {0}")]
    Unavailable(String),
    #[error("failed to start pointer hook thread")]
    Spawn(#[source] io::Error),
}

/// Something that can feed raw pointer events into a channel.
pub trait PointerSource: Send + Sync + 'static {
    /// Starts delivering events to `sink`, replacing any previous sink.
    ///
    /// Implementations should hand events over with [`offer`].
    fn attach(&self, sink: SyncSender<RawPointerEvent>) -> Result<(), PointerSourceError>;

    /// Stops delivering events.
    fn detach(&self) {}
}

/// What happened to an event handed to the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The buffer was full.
    Dropped,
    /// The listener is gone; the sink can be discarded.
    Closed,
}

/// Queues `raw` for the dispatcher without blocking.
pub fn offer(sink: &SyncSender<RawPointerEvent>, raw: RawPointerEvent) -> Delivery {
    match sink.try_send(raw) {
        Ok(()) => Delivery::Sent,
        Err(TrySendError::Full(_)) => {
            tracing::trace!(?raw, "pointer buffer full; event dropped");
            Delivery::Dropped
        }
        Err(TrySendError::Disconnected(_)) => Delivery::Closed,
    }
}

/// Live switches for what the listener publishes.
#[derive(Debug)]
pub struct TrackingToggles {
    distance: AtomicBool,
    clicks: AtomicBool,
}

impl TrackingToggles {
    pub const fn new(distance: bool, clicks: bool) -> Self {
        Self {
            distance: AtomicBool::new(distance),
            clicks: AtomicBool::new(clicks),
        }
    }

    pub fn track_distance(&self) -> bool {
        self.distance.load(Ordering::Relaxed)
    }

    pub fn track_clicks(&self) -> bool {
        self.clicks.load(Ordering::Relaxed)
    }

    pub fn set_track_distance(&self, enabled: bool) {
        self.distance.store(enabled, Ordering::Relaxed);
    }

    pub fn set_track_clicks(&self, enabled: bool) {
        self.clicks.store(enabled, Ordering::Relaxed);
    }
}

impl Default for TrackingToggles {
    fn default() -> Self {
        Self::new(true, true)
    }
}

/// Maps a raw event to the bus event to publish, if any.
fn translate(raw: RawPointerEvent, toggles: &TrackingToggles) -> Option<Event> {
    match raw {
        RawPointerEvent::Moved { x, y } if toggles.track_distance() => Some(Event::PointerMoved {
            x: to_pixel(x),
            y: to_pixel(y),
        }),
        RawPointerEvent::Pressed(button) if toggles.track_clicks() => {
            Some(Event::PointerClicked { button })
        }
        _ => None,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "screen coordinates fit in i32; out-of-range values saturate"
)]
fn to_pixel(coordinate: f64) -> i32 {
    coordinate.round() as i32
}

/// Publishes pointer events from a [`PointerSource`] onto the bus.
pub struct PointerListener {
    bus: Arc<EventBus<Event>>,
    source: Arc<dyn PointerSource>,
    toggles: Arc<TrackingToggles>,
    running: Option<(Arc<StopSignal>, JoinHandle<()>)>,
}

impl PointerListener {
    pub fn new(
        bus: Arc<EventBus<Event>>,
        source: Arc<dyn PointerSource>,
        toggles: Arc<TrackingToggles>,
    ) -> Self {
        Self {
            bus,
            source,
            toggles,
            running: None,
        }
    }

    pub const fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Attaches to the source and starts publishing.
    ///
    /// No-op if already running. If the source cannot be attached the failure
    /// is logged and the listener stays stopped; only a failure to spawn the
    /// dispatcher thread is returned.
    pub fn start(&mut self) -> Result<(), TrackerError> {
        if self.running.is_some() {
            return Ok(());
        }

        let (sink, events) = mpsc::sync_channel(EVENT_BUFFER);
        if let Err(err) = self.source.attach(sink) {
            tracing::warn!(error = %err, "pointer input unavailable; movement and clicks will not be tracked");
            return Ok(());
        }

        let stop = Arc::new(StopSignal::default());
        let signal = Arc::clone(&stop);
        let bus = Arc::clone(&self.bus);
        let toggles = Arc::clone(&self.toggles);

        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                tracing::debug!("pointer listener started");
                while !signal.is_stopped() {
                    match events.recv_timeout(POLL_INTERVAL) {
                        Ok(raw) => {
                            if signal.is_stopped() {
                                break;
                            }
                            if let Some(event) = translate(raw, &toggles) {
                                bus.publish(&event);
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => {
                            tracing::warn!("pointer source closed");
                            break;
                        }
                    }
                }
                tracing::debug!("pointer listener stopped");
            });

        match spawned {
            Ok(handle) => {
                self.running = Some((stop, handle));
                Ok(())
            }
            Err(source) => {
                self.source.detach();
                Err(TrackerError::Spawn {
                    name: THREAD_NAME,
                    source,
                })
            }
        }
    }

    /// Detaches the source and joins the dispatcher. Idempotent.
    pub fn stop(&mut self) {
        if let Some((stop, handle)) = self.running.take() {
            self.source.detach();
            stop.stop();
            join_bounded(handle, THREAD_NAME, STOP_TIMEOUT);
        }
    }
}

impl Drop for PointerListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Source used when the binary has no pointer hook compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSource;

impl PointerSource for UnavailableSource {
    fn attach(&self, _sink: SyncSender<RawPointerEvent>) -> Result<(), PointerSourceError> {
        Err(PointerSourceError::Unavailable(
            "built without the input-hook feature".to_string(),
        ))
    }
}

/// The best pointer source this build supports.
#[cfg(feature = "input-hook")]
pub fn default_source() -> Arc<dyn PointerSource> {
    Arc::new(RdevSource)
}

/// The best pointer source this build supports.
#[cfg(not(feature = "input-hook"))]
pub fn default_source() -> Arc<dyn PointerSource> {
    Arc::new(UnavailableSource)
}

#[cfg(feature = "input-hook")]
pub use rdev_hook::RdevSource;

#[cfg(feature = "input-hook")]
mod rdev_hook {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::SyncSender;
    use std::thread;

    use parking_lot::{Mutex, const_mutex};
    use tm_core::PointerButton;

    use super::{Delivery, PointerSource, PointerSourceError, RawPointerEvent, offer};

    /// `rdev::listen` never returns, so one hook thread serves the process
    /// and forwards into whichever sink is currently attached.
    static HOOK_STARTED: AtomicBool = AtomicBool::new(false);
    static HOOK_SINK: Mutex<Option<SyncSender<RawPointerEvent>>> = const_mutex(None);

    /// Global pointer hook backed by `rdev`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RdevSource;

    impl PointerSource for RdevSource {
        fn attach(&self, sink: SyncSender<RawPointerEvent>) -> Result<(), PointerSourceError> {
            *HOOK_SINK.lock() = Some(sink);
            if HOOK_STARTED.swap(true, Ordering::SeqCst) {
                return Ok(());
            }

            thread::Builder::new()
                .name("pointer-hook".to_string())
                .spawn(|| {
                    if let Err(err) = rdev::listen(forward) {
                        tracing::error!(error = ?err, "pointer hook failed");
                    }
                    HOOK_SINK.lock().take();
                    HOOK_STARTED.store(false, Ordering::SeqCst);
                })
                .map(drop)
                .map_err(|err| {
                    HOOK_SINK.lock().take();
                    HOOK_STARTED.store(false, Ordering::SeqCst);
                    PointerSourceError::Spawn(err)
                })
        }

        fn detach(&self) {
            HOOK_SINK.lock().take();
        }
    }

    fn forward(event: rdev::Event) {
        let raw = match event.event_type {
            rdev::EventType::MouseMove { x, y } => RawPointerEvent::Moved { x, y },
            rdev::EventType::ButtonPress(button) => RawPointerEvent::Pressed(map_button(button)),
            rdev::EventType::ButtonRelease(button) => {
                RawPointerEvent::Released(map_button(button))
            }
            _ => return,
        };
        let mut sink = HOOK_SINK.lock();
        let closed = sink
            .as_ref()
            .is_some_and(|tx| offer(tx, raw) == Delivery::Closed);
        if closed {
            sink.take();
        }
    }

    const fn map_button(button: rdev::Button) -> PointerButton {
        match button {
            rdev::Button::Left => PointerButton::Left,
            rdev::Button::Right => PointerButton::Right,
            rdev::Button::Middle => PointerButton::Middle,
            rdev::Button::Unknown(code) => PointerButton::Unknown(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Instant;

    use parking_lot::Mutex;
    use tm_core::EventKind;

    use crate::testing::ChannelSource;

    fn recording_bus() -> (Arc<EventBus<Event>>, Arc<Mutex<Vec<Event>>>) {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [EventKind::PointerMoved, EventKind::PointerClicked] {
            let seen = Arc::clone(&seen);
            bus.subscribe(kind, "recorder", move |event: &Event| {
                seen.lock().push(event.clone());
                Ok(())
            });
        }
        (bus, seen)
    }

    fn wait_for(seen: &Mutex<Vec<Event>>, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.lock().len() < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn translate_rounds_coordinates() {
        let toggles = TrackingToggles::default();
        assert_eq!(
            translate(RawPointerEvent::Moved { x: 10.4, y: 20.6 }, &toggles),
            Some(Event::PointerMoved { x: 10, y: 21 })
        );
    }

    #[test]
    fn translate_ignores_releases() {
        let toggles = TrackingToggles::default();
        assert_eq!(
            translate(RawPointerEvent::Released(PointerButton::Left), &toggles),
            None
        );
        assert_eq!(
            translate(RawPointerEvent::Pressed(PointerButton::Left), &toggles),
            Some(Event::PointerClicked {
                button: PointerButton::Left
            })
        );
    }

    #[test]
    fn translate_respects_toggles() {
        let toggles = TrackingToggles::new(false, true);
        assert_eq!(translate(RawPointerEvent::Moved { x: 1.0, y: 1.0 }, &toggles), None);

        toggles.set_track_distance(true);
        toggles.set_track_clicks(false);
        assert!(translate(RawPointerEvent::Moved { x: 1.0, y: 1.0 }, &toggles).is_some());
        assert_eq!(
            translate(RawPointerEvent::Pressed(PointerButton::Right), &toggles),
            None
        );
    }

    #[test]
    fn listener_publishes_source_events() {
        let (bus, seen) = recording_bus();
        let source = Arc::new(ChannelSource::default());
        let mut listener =
            PointerListener::new(bus, source.clone(), Arc::new(TrackingToggles::default()));
        listener.start().unwrap();
        assert!(listener.is_running());

        source.push(RawPointerEvent::Moved { x: 5.0, y: 6.0 });
        source.push(RawPointerEvent::Pressed(PointerButton::Middle));
        source.push(RawPointerEvent::Released(PointerButton::Middle));
        source.push(RawPointerEvent::Moved { x: 7.0, y: 8.0 });
        wait_for(&seen, 3);
        listener.stop();

        assert_eq!(
            *seen.lock(),
            vec![
                Event::PointerMoved { x: 5, y: 6 },
                Event::PointerClicked {
                    button: PointerButton::Middle
                },
                Event::PointerMoved { x: 7, y: 8 },
            ]
        );
    }

    #[test]
    fn toggles_are_read_at_publish_time() {
        let (bus, seen) = recording_bus();
        let source = Arc::new(ChannelSource::default());
        let toggles = Arc::new(TrackingToggles::default());
        let mut listener = PointerListener::new(bus, source.clone(), Arc::clone(&toggles));
        listener.start().unwrap();

        toggles.set_track_clicks(false);
        source.push(RawPointerEvent::Pressed(PointerButton::Left));
        source.push(RawPointerEvent::Moved { x: 1.0, y: 1.0 });
        wait_for(&seen, 1);
        listener.stop();

        assert_eq!(*seen.lock(), vec![Event::PointerMoved { x: 1, y: 1 }]);
    }

    #[test]
    fn nothing_is_published_after_stop() {
        let (bus, seen) = recording_bus();
        let source = Arc::new(ChannelSource::default());
        let mut listener =
            PointerListener::new(bus, source.clone(), Arc::new(TrackingToggles::default()));
        listener.start().unwrap();
        listener.start().unwrap();

        listener.stop();
        listener.stop();
        assert!(!listener.is_running());
        assert!(!source.is_attached());

        source.push(RawPointerEvent::Pressed(PointerButton::Left));
        thread::sleep(Duration::from_millis(20));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn full_buffer_drops_instead_of_blocking_the_source() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(AtomicBool::new(false));
        {
            let seen = Arc::clone(&seen);
            let gate = Arc::clone(&gate);
            bus.subscribe(EventKind::PointerMoved, "slow", move |event: &Event| {
                while !gate.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                }
                seen.lock().push(event.clone());
                Ok(())
            });
        }
        let source = Arc::new(ChannelSource::default());
        let mut listener =
            PointerListener::new(bus, source.clone(), Arc::new(TrackingToggles::default()));
        listener.start().unwrap();

        let mut sent = 0;
        let mut dropped = 0;
        for i in 0..EVENT_BUFFER + 10 {
            let x = f64::from(u32::try_from(i).unwrap());
            match source.push(RawPointerEvent::Moved { x, y: 0.0 }) {
                Delivery::Sent => sent += 1,
                Delivery::Dropped => dropped += 1,
                Delivery::Closed => panic!("listener closed while running"),
            }
        }
        // the dispatcher may already hold one event in the blocked subscriber
        assert!(sent <= EVENT_BUFFER + 1, "sent {sent}");
        assert!(dropped >= 9, "dropped {dropped}");

        gate.store(true, Ordering::SeqCst);
        wait_for(&seen, sent);
        listener.stop();
        assert_eq!(seen.lock().len(), sent);
        assert_eq!(seen.lock()[0], Event::PointerMoved { x: 0, y: 0 });
    }

    #[test]
    fn unavailable_source_leaves_listener_stopped() {
        let (bus, _seen) = recording_bus();
        let mut listener = PointerListener::new(
            bus,
            Arc::new(UnavailableSource),
            Arc::new(TrackingToggles::default()),
        );
        listener.start().unwrap();
        assert!(!listener.is_running());
        listener.stop();
    }
}
