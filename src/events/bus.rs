//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from many workers at once.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Subscribers:
//!   generator ──┐
//!   stage #i  ──┼──────► Bus ───────► subscriber_listener ────► SubscriberSet
//!   mux / merge ┤  (broadcast chan)   (in Pipeline)        └──► WorkerTracker
//!   Pipeline  ──┘                 └─► Bus::subscribe() (tests, callers)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; a worker never waits on observers.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active subscribers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to a minimum of 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn test_publish_without_receivers_is_silent() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::PipelineDrained));
    }

    #[test]
    fn test_receivers_see_events_after_subscribe() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::CancelRequested));
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::PipelineDrained));

        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::PipelineDrained);
        assert!(rx.try_recv().is_err());
    }
}
