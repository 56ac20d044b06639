//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] that feeds
//! runtime events from the [`Bus`](crate::Bus) to every registered subscriber.
//!
//! ```text
//! workers ── publish(Event) ──► Bus ──► Pipeline listener ──┬──► SubscriberSet::emit ─► Subscribe::on_event
//!                                                           └──► WorkerTracker (internal liveness)
//! ```
//!
//! Built-in subscribers live in [`embedded`] (feature `logging`).

mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub mod embedded;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;
