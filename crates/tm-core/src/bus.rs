//! Synchronous in-process publish/subscribe dispatcher.
//!
//! # Dispatch Model
//!
//! [`EventBus::publish`] runs every subscriber registered for the event's
//! kind on the *caller's* thread, in subscription order, before returning.
//! There is no queue and no history: a subscriber added after a publish never
//! sees that event.
//!
//! # Failure Isolation
//!
//! A subscriber that returns an error or panics is logged with the event kind
//! and the subscriber's name, and dispatch moves on to the next subscriber.
//! Failures never reach the publisher.
//!
//! # Thread Safety
//!
//! The bus is `Sync` and is meant to be shared behind an `Arc` by every
//! producer thread. The subscriber list for a kind is cloned out of the lock
//! before dispatch, so callbacks may themselves publish or subscribe.

use std::any::Any;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

/// Error type returned by subscriber callbacks.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Result type returned by subscriber callbacks.
pub type HandlerResult = Result<(), HandlerError>;

/// An event type the bus can route.
pub trait BusEvent: Send + Sync + 'static {
    /// Subscription key, usually a payload-free discriminant.
    type Kind: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

type Callback<E> = dyn Fn(&E) -> HandlerResult + Send + Sync;

struct Subscriber<E> {
    name: String,
    callback: Box<Callback<E>>,
}

/// Publish/subscribe dispatcher generic over the event sum type.
pub struct EventBus<E: BusEvent> {
    subscribers: RwLock<HashMap<E::Kind, Vec<Arc<Subscriber<E>>>>>,
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `callback` for events of `kind`.
    ///
    /// Subscribers are appended; registering the same callback twice makes it
    /// run twice per event.
    pub fn subscribe<F>(&self, kind: E::Kind, name: impl Into<String>, callback: F)
    where
        F: Fn(&E) -> HandlerResult + Send + Sync + 'static,
    {
        let subscriber = Arc::new(Subscriber {
            name: name.into(),
            callback: Box::new(callback),
        });
        self.subscribers
            .write()
            .entry(kind)
            .or_default()
            .push(subscriber);
    }

    /// Delivers `event` to every subscriber of its kind.
    ///
    /// Returns the number of subscribers that handled the event without
    /// failing. Publishing a kind nobody subscribed to is a no-op.
    pub fn publish(&self, event: &E) -> usize {
        let kind = event.kind();
        let subscribers = match self.subscribers.read().get(&kind) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for subscriber in &subscribers {
            match panic::catch_unwind(AssertUnwindSafe(|| (subscriber.callback)(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    tracing::error!(
                        event = %kind,
                        subscriber = %subscriber.name,
                        error = %err,
                        "subscriber failed"
                    );
                }
                Err(payload) => {
                    tracing::error!(
                        event = %kind,
                        subscriber = %subscriber.name,
                        panic = panic_message(payload.as_ref()),
                        "subscriber panicked"
                    );
                }
            }
        }
        delivered
    }

    /// Number of subscribers registered for `kind`.
    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.subscribers.read().get(&kind).map_or(0, Vec::len)
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.read();
        let mut map = f.debug_map();
        for (kind, list) in subscribers.iter() {
            map.entry(&kind.to_string(), &list.len());
        }
        map.finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
