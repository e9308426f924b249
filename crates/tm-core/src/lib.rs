//! Core domain logic for the pointer activity tracker.
//!
//! This crate contains the fundamental types shared by every component:
//! - Events: the typed messages producers publish and the aggregator consumes
//! - Bus: the synchronous in-process publish/subscribe dispatcher
//! - Stats: per-day counters and the aggregates derived from them
//! - Clock: wall-clock access that tests can replace

pub mod bus;
pub mod clock;
pub mod event;
pub mod stats;

pub use bus::{BusEvent, EventBus, HandlerError, HandlerResult};
pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{ActivityStatus, Event, EventKind, PointerButton};
pub use stats::{DailyStats, GlobalStats, RecordMetric, euclidean_distance};
