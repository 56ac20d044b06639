//! # stagevisor
//!
//! **Stagevisor** builds cancellable, composable concurrent pipelines on tokio: stages
//! connected by bounded streams, fan-out/fan-in for expensive stages, one broadcast
//! cancellation signal, and per-item error envelopes instead of control-flow errors.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌───────────────┐    ┌──────────────┐    ┌────────────────────────────────┐    ┌──────────────┐
//!  │   generator   │    │   Stage A    │    │ Stage B (fan-out ×N)           │    │     sink     │
//!  │ iter ─► send  ├─►──┤ recv ─► f ─► ├─►──┤ replicas ─► muxes ─► merge     ├─►──┤ collect/take │
//!  └───────┬───────┘ [stream]  send ───┘ [stream]                           [stream] drain_envelopes
//!          │                   │                     │                               │
//!          └───────────────────┴──── CancellationSignal (shared) ────────────────────┘
//!                                        every recv/send races it
//!
//! ┌───────────────────────────────────────────────────────────────────────────────────────┐
//! │  Pipeline (root)                                                                      │
//! │  - CancellationSignal (single owner, idempotent close)                                │
//! │  - WorkerGroup (JoinSet of every worker; nothing is detached)                         │
//! │  - Bus ─► listener ─► WorkerTracker + SubscriberSet ─► Subscribe::on_event            │
//! │  - join(): natural drain, or cancel + grace period                                    │
//! └───────────────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Stream ownership
//! ```text
//! stream::bounded(cap) ─► (StreamSender, StreamReceiver)
//!   StreamSender:   send(item, &signal) + close()    one owner, not Clone
//!   StreamReceiver: recv(&signal) ─► Item | Exhausted (sticky) | Cancelled
//! ```
//! A stream closes when its owner returns (or unwinds); item content never closes it.
//!
//! ## Features
//! | Area              | Description                                                  | Key types / functions                    |
//! |-------------------|--------------------------------------------------------------|------------------------------------------|
//! | **Cancellation**  | Single-shot broadcast stop condition.                        | [`CancellationSignal`]                   |
//! | **Streams**       | Bounded, cancellation-aware capability handles.              | [`stream::bounded`], [`Recv`], [`Halt`]  |
//! | **Stages**        | Per-item transforms bound to a pipeline.                     | [`Transform`], [`MapFn`], [`TryMapFn`]   |
//! | **Fan-out**       | Replicas over one upstream, merged behind a join barrier.    | [`FanOut`], [`FanOutPolicy`]             |
//! | **Errors**        | Per-item envelopes and typed runtime errors.                 | [`Envelope`], [`StageError`], [`PipelineError`] |
//! | **Retries**       | Per-item retry with backoff and jitter.                      | [`RetryPolicy`], [`BackoffPolicy`]      |
//! | **Observability** | Worker/item/pipeline events and subscribers.                 | [`Event`], [`Subscribe`]                 |
//! | **Configuration** | Buffers, replica cap, global concurrency, grace.             | [`PipelineConfig`]                       |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use stagevisor::{sink, ErrorAction, MapFn, Pipeline, PipelineConfig, StageError, TryMapFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn stagevisor::Subscribe>> = vec![Arc::new(stagevisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn stagevisor::Subscribe>> = Vec::new();
//!
//!     let pipeline = Pipeline::builder(PipelineConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let lines = pipeline.generate("lines", vec!["1", "2", "x", "4"]);
//!     let parsed = pipeline
//!         .stage(TryMapFn::new("parse", |s: &'static str| async move {
//!             s.parse::<u64>().map_err(|e| StageError::fail(e.to_string()))
//!         }))
//!         .run(lines);
//!
//!     let report = sink::drain_envelopes(parsed, pipeline.signal(), |_| ErrorAction::Accumulate).await;
//!     assert_eq!(report.values, vec![1, 2, 4]);
//!     assert_eq!(report.failures[0].context.position, 2);
//!
//!     pipeline.join().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod envelope;
mod error;
mod events;
mod policies;
mod signal;
mod stages;
mod subscribers;

pub mod sink;
pub mod stream;

// ---- Public re-exports ----

pub use crate::core::{
    Pipeline, PipelineBuilder, PipelineConfig, PipelineReport, WorkerExit, WorkerReport,
    WorkerTracker,
};
pub use envelope::{Envelope, Origin};
pub use error::{PipelineError, StageError};
pub use events::{Bus, Event, EventKind, WorkerRole};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use signal::CancellationSignal;
pub use sink::{ErrorAction, SinkReport};
pub use stages::{
    FanOut, FanOutPolicy, ItemContext, MapFn, Stage, Transform, TryMapFn, WorkerCount,
};
pub use stream::{Halt, Recv, StreamReceiver, StreamSender};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::embedded::LogWriter;
