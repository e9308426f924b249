//! Tracking engine for the pointer activity tracker.
//!
//! This crate turns pointer input and the passage of time into per-day
//! counters:
//! - Pointer: publishes movement and button presses from a [`PointerSource`]
//! - Ticker: publishes one activity tick per interval and detects day changes
//! - Aggregator: owns today's counters and flushes them to the store
//! - Engine: wires the above together around one [`tm_core::EventBus`]

pub mod aggregator;
pub mod engine;
pub mod error;
pub mod pointer;
pub mod ticker;
mod worker;

pub use aggregator::{Aggregator, AggregatorSettings, first_launch_timestamp};
pub use engine::{EngineSettings, TrackingEngine};
pub use error::TrackerError;
pub use pointer::{
    Delivery, EVENT_BUFFER, PointerListener, PointerSource, PointerSourceError, RawPointerEvent,
    TrackingToggles, UnavailableSource, default_source, offer,
};
pub use ticker::{ActivityMonitor, ActivityTicker, TickerSettings};
pub use worker::STOP_TIMEOUT;

#[cfg(feature = "input-hook")]
pub use pointer::RdevSource;
