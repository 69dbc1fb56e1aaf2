//! Event Module
//!
//! Typed publish/subscribe over a tokio broadcast channel. Each subsystem
//! owns one bus for its own event enum.

use tokio::sync::broadcast;

const DEFAULT_EVENT_CAPACITY: usize = 1024;

// == Event Bus ==
/// Broadcasts events of type `E` to every live subscriber.
///
/// Slow subscribers lag (and see `RecvError::Lagged`) instead of blocking
/// the emitter.
#[derive(Debug, Clone)]
pub struct EventBus<E: Clone> {
    tx: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Registers a new subscriber. Only events emitted afterwards are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn emit(&self, event: E) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
