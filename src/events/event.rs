//! # Runtime events emitted by workers and the pipeline root.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Worker lifecycle**: a worker started, exited or panicked; a fan-in merge closed
//! - **Item events**: a fallible transform is retrying or gave up on an item
//! - **Pipeline events**: cancellation observed, natural drain, grace outcome
//!
//! The [`Event`] struct carries additional metadata such as timestamps, stage name,
//! worker role/index, item position and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use stagevisor::{Event, EventKind, WorkerRole};
//!
//! let ev = Event::new(EventKind::WorkerExited)
//!     .with_stage("parse")
//!     .with_worker(WorkerRole::Replica, 3)
//!     .with_reason("exhausted");
//!
//! assert_eq!(ev.kind, EventKind::WorkerExited);
//! assert_eq!(ev.stage.as_deref(), Some("parse"));
//! assert_eq!(ev.worker, Some(3));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// A worker began running.
    ///
    /// Sets: `stage`, `role`, `worker`, `instance`.
    WorkerStarted,

    /// A worker finished; its output stream (if any) is already closed.
    ///
    /// Sets: `stage`, `role`, `worker`, `instance`, `reason` (`exhausted`, `cancelled`,
    /// `disconnected` or `panicked`).
    WorkerExited,

    /// A worker terminated abnormally. Always followed by `WorkerExited`.
    ///
    /// Sets: `stage`, `role`, `worker`, `instance`, `reason` (panic payload).
    WorkerPanicked,

    /// Every replica and multiplexer of a fanned-out stage was joined and
    /// the merged stream was closed.
    ///
    /// Sets: `stage`, `role`, `worker` (the merger, always 0), `replicas`.
    MergeClosed,

    // === Item events ===
    /// A fallible transform scheduled another attempt for one item.
    ///
    /// Sets: `stage`, `position`, `attempt` (failed attempt), `delay_ms`, `reason`.
    ItemRetrying,

    /// A fallible transform gave up on one item; an error envelope goes downstream.
    ///
    /// Sets: `stage`, `position`, `attempt`, `reason`.
    ItemFailed,

    // === Pipeline events ===
    /// The cancellation signal was observed by the pipeline root.
    CancelRequested,

    /// Every worker exited without cancellation (finite input fully drained).
    PipelineDrained,

    /// After cancellation, all workers exited within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time and were aborted.
    GraceExceeded,
}

/// Role of a worker inside a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerRole {
    /// Source worker feeding a stream from an iterator.
    Generator,
    /// One replica applying a stage's transform.
    Replica,
    /// Forwards one replica's private stream into the merged stream.
    Multiplexer,
    /// Joins replicas and multiplexers, then closes the merged stream.
    Merger,
}

impl WorkerRole {
    /// Short stable label for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerRole::Generator => "generator",
            WorkerRole::Replica => "replica",
            WorkerRole::Multiplexer => "mux",
            WorkerRole::Merger => "merge",
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Stage (or generator) name, if applicable.
    pub stage: Option<Arc<str>>,
    /// Worker role, if applicable.
    pub role: Option<WorkerRole>,
    /// Worker index inside its stage.
    pub worker: Option<u32>,
    /// Pipeline-unique id of one spawned worker; tells apart workers sharing a key.
    pub instance: Option<u64>,
    /// Replica count of a fanned-out stage.
    pub replicas: Option<u32>,
    /// Zero-based position of the item in the stage's input stream.
    pub position: Option<u64>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Retry delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (exit reason, error, panic payload).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            stage: None,
            role: None,
            worker: None,
            instance: None,
            replicas: None,
            position: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a stage name.
    #[inline]
    pub fn with_stage(mut self, stage: impl Into<Arc<str>>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Attaches a worker role and index.
    #[inline]
    pub fn with_worker(mut self, role: WorkerRole, index: usize) -> Self {
        self.role = Some(role);
        self.worker = Some(index.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches the id of one spawned worker.
    #[inline]
    pub fn with_instance(mut self, instance: u64) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Attaches the replica count of a fanned-out stage.
    #[inline]
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = Some(replicas.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches an item position.
    #[inline]
    pub fn with_position(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Human-readable key of the worker this event is about, e.g. `parse/replica#2`.
    ///
    /// Two runs of one stage share keys; use `instance` to tell them apart.
    pub fn worker_key(&self) -> Option<String> {
        let stage = self.stage.as_deref()?;
        let role = self.role?;
        let index = self.worker?;
        Some(format!("{stage}/{role}#{index}"))
    }
}
