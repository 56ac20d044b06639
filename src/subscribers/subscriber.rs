//! # Pipeline event consumers.
//!
//! A [`Subscribe`] implementation sees every [`Event`] the pipeline publishes: worker
//! lifecycle, item retries and failures, and the outcome of `join`. Stage workers never
//! await a subscriber; [`SubscriberSet`](crate::SubscriberSet) hands each one its own
//! queue and drops events for that subscriber alone when the queue is full.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use async_trait::async_trait;
//! use stagevisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct StuckReplicas(AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for StuckReplicas {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::GraceExceeded {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "stuck-replicas" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receives pipeline events on a task of its own.
///
/// Events arrive in publish order. A panic inside `on_event` is reported on stderr and
/// the next event is still delivered.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    /// Label for dropped-event and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered before this subscriber starts losing them (at least 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
