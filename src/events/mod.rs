//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by workers, fan-in mergers, fallible
//! transforms and the pipeline root.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`WorkerRole`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: stage workers, generators, multiplexers and mergers (start/exit/panic),
//!   `TryMapFn` (retry/failure), `Pipeline::join` (cancel/drain/grace).
//! - **Consumers**: the pipeline's subscriber listener (fans out to `SubscriberSet`
//!   and updates `WorkerTracker`), and any caller of [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, WorkerRole};
