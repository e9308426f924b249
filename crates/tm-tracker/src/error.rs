//! Error types for the tracking engine.

use thiserror::Error;
use tm_db::DbError;

use crate::pointer::PointerSourceError;

/// Errors surfaced by the aggregator, producers and engine wiring.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The stats store failed.
    #[error("storage error: {0}")]
    Db(#[from] DbError),
    /// The pointer input source could not be attached.
    #[error("pointer source error: {0}")]
    PointerSource(#[from] PointerSourceError),
    /// A background thread could not be started.
    #[error("failed to spawn {name} thread")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
