//! Typed events exchanged between producers and the aggregator.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::bus::BusEvent;

/// A pointer button as reported by the input hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    /// A button the tracker does not count (side buttons, raw codes).
    Unknown(u8),
}

/// Whether the user was active during one ticker interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Active,
    Inactive,
}

impl ActivityStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message published on the event bus.
///
/// Events are ephemeral: they are never stored and only live for the
/// duration of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The pointer moved to an absolute screen position.
    PointerMoved { x: i32, y: i32 },
    /// A pointer button was pressed.
    PointerClicked { button: PointerButton },
    /// One ticker interval elapsed.
    ActivityTick { status: ActivityStatus },
    /// The local calendar date advanced.
    DayChanged {
        old_date: NaiveDate,
        new_date: NaiveDate,
    },
}

/// Payload-free discriminant of [`Event`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerMoved,
    PointerClicked,
    ActivityTick,
    DayChanged,
}

impl EventKind {
    pub const ALL: [Self; 4] = [
        Self::PointerMoved,
        Self::PointerClicked,
        Self::ActivityTick,
        Self::DayChanged,
    ];

    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PointerMoved => "pointer_moved",
            Self::PointerClicked => "pointer_clicked",
            Self::ActivityTick => "activity_tick",
            Self::DayChanged => "day_changed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::PointerMoved { .. } => EventKind::PointerMoved,
            Self::PointerClicked { .. } => EventKind::PointerClicked,
            Self::ActivityTick { .. } => EventKind::ActivityTick,
            Self::DayChanged { .. } => EventKind::DayChanged,
        }
    }
}

impl BusEvent for Event {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        Self::kind(self)
    }
}
