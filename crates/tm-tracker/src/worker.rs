//! Stop signalling and bounded joins shared by the producer threads.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// How long `stop()` waits for a producer thread before giving up on it.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

const JOIN_POLL: Duration = Duration::from_millis(5);

/// One-shot stop flag a worker can sleep on.
#[derive(Debug, Default)]
pub(crate) struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    pub(crate) fn stop(&self) {
        *self.stopped.lock() = true;
        self.condvar.notify_all();
    }

    pub(crate) fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleeps for `timeout` or until stopped. Returns whether stop was requested.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            self.condvar
                .wait_while_for(&mut stopped, |stopped| !*stopped, timeout);
        }
        *stopped
    }
}

/// Joins `handle`, waiting at most `timeout`.
///
/// Returns `false` if the thread was still running at the deadline; it is
/// then left detached.
pub(crate) fn join_bounded(handle: JoinHandle<()>, name: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            tracing::warn!(thread = name, ?timeout, "thread did not stop in time; detaching");
            return false;
        }
        thread::sleep(JOIN_POLL);
    }
    if handle.join().is_err() {
        tracing::error!(thread = name, "thread panicked");
    }
    true
}
