//! # Fan-out / fan-in.
//!
//! Replicates a stage across N workers that read one shared upstream and merges their
//! private output streams back into a single stream.
//!
//! ```text
//!                            ┌─► replica#0 ─► [private#0] ─► mux#0 ─┐
//!   upstream ─► SharedRecv ──┼─► replica#1 ─► [private#1] ─► mux#1 ─┼─► [merged] ─► downstream
//!                            └─► replica#N ─► [private#N] ─► mux#N ─┘
//!                                                                   ▲
//!                merge worker: owns merged sender + JoinSet of every replica and mux,
//!                closes [merged] only after join_next() returned None
//! ```
//!
//! ## Rules
//! - Each upstream item is delivered to exactly one replica.
//! - The merged stream closes only after every replica and every multiplexer exited
//!   (join barrier, never a timer).
//! - Merge order is unspecified. Do not rely on ordering observed under light load.
//! - The wrapped stage keeps the plain [`Stage::run`] contract.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::task::JoinSet;

use super::stage::Stage;
use super::transform::Transform;
use super::worker::{forward, replica_loop, supervise, Inbound, WorkerId};
use crate::core::report::{WorkerExit, WorkerReport};
use crate::core::runtime::Runtime;
use crate::events::{Event, EventKind, WorkerRole};
use crate::stream::{self, SharedReceiver, StreamReceiver, StreamSender};

/// How many replicas to start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkerCount {
    /// One replica per unit of available parallelism.
    #[default]
    Auto,
    /// Exactly `n` replicas (`0` is treated as `1`), still subject to the configured cap.
    Exactly(usize),
}

/// Replica count policy for a fanned-out stage.
///
/// The resolved count is the requested count, capped by `expected_items` (no point in
/// idle replicas) and by [`PipelineConfig::max_workers`](crate::PipelineConfig::max_workers),
/// and never below 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FanOutPolicy {
    /// Requested replica count.
    pub workers: WorkerCount,
    /// Expected number of input items, when known.
    pub expected_items: Option<usize>,
}

impl FanOutPolicy {
    /// One replica per unit of available parallelism.
    pub fn auto() -> Self {
        Self::default()
    }

    /// Exactly `n` replicas.
    pub fn exactly(n: usize) -> Self {
        Self {
            workers: WorkerCount::Exactly(n),
            expected_items: None,
        }
    }

    /// Caps the replica count by a known input size.
    pub fn expecting(mut self, items: usize) -> Self {
        self.expected_items = Some(items);
        self
    }

    /// Resolves the policy against an optional replica cap.
    pub fn resolve(&self, limit: Option<usize>) -> usize {
        let requested = match self.workers {
            WorkerCount::Auto => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            WorkerCount::Exactly(n) => n,
        };
        let mut n = requested;
        if let Some(items) = self.expected_items {
            n = n.min(items);
        }
        if let Some(limit) = limit {
            n = n.min(limit);
        }
        n.max(1)
    }
}

impl From<usize> for FanOutPolicy {
    fn from(n: usize) -> Self {
        Self::exactly(n)
    }
}

/// Entry point mirroring the `Wrap(stage, workers)` shape.
///
/// # Example
/// ```
/// use stagevisor::{FanOut, MapFn, Pipeline, PipelineConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pipeline = Pipeline::new(PipelineConfig::default());
/// let square = pipeline.stage(MapFn::new("square", |x: u64| async move { x * x }));
/// let wide = FanOut::wrap(square, 4);
/// assert_eq!(wide.replicas(), 4);
/// # }
/// ```
pub struct FanOut;

impl FanOut {
    /// Returns a stage with the same contract whose work runs on several replicas.
    pub fn wrap<T: Transform>(stage: Stage<T>, policy: impl Into<FanOutPolicy>) -> Stage<T> {
        stage.fan_out(policy)
    }
}

/// Spawns the merge worker of a fanned-out stage and returns the merged stream.
pub(crate) fn spawn_merged<T: Transform>(
    transform: Arc<T>,
    name: Arc<str>,
    rt: &Runtime,
    input: StreamReceiver<T::In>,
    replicas: usize,
) -> StreamReceiver<T::Out> {
    let (merged_tx, merged_rx) = stream::bounded(rt.buffer);
    let id = WorkerId::new(Arc::clone(&name), WorkerRole::Merger, 0);
    let body = merge(
        transform,
        name,
        rt.clone(),
        SharedReceiver::new(input),
        merged_tx,
        replicas,
    );
    rt.group.spawn(supervise(id, rt.bus.clone(), body));
    merged_rx
}

async fn merge<T: Transform>(
    transform: Arc<T>,
    name: Arc<str>,
    rt: Runtime,
    shared: SharedReceiver<T::In>,
    merged: StreamSender<T::Out>,
    replicas: usize,
) -> (WorkerExit, Vec<WorkerReport>) {
    let mut set: JoinSet<Vec<WorkerReport>> = JoinSet::new();

    for index in 0..replicas {
        let (tx, rx) = stream::bounded(rt.buffer);

        let replica = replica_loop(
            Arc::clone(&transform),
            Inbound::Shared(shared.clone()),
            tx,
            rt.clone(),
            Arc::clone(&name),
            index,
        );
        set.spawn(supervise(
            WorkerId::new(Arc::clone(&name), WorkerRole::Replica, index),
            rt.bus.clone(),
            async move { (replica.await, Vec::new()) },
        ));

        let mux = forward(rx, merged.delegate(), rt.signal.clone());
        set.spawn(supervise(
            WorkerId::new(Arc::clone(&name), WorkerRole::Multiplexer, index),
            rt.bus.clone(),
            async move { (mux.await, Vec::new()) },
        ));
    }
    // upstream must see Disconnected once every replica is gone
    drop(shared);

    let mut reports = Vec::with_capacity(replicas * 2 + 1);
    while let Some(joined) = set.join_next().await {
        // supervise() catches panics; a JoinError here means the task was aborted
        if let Ok(batch) = joined {
            reports.extend(batch);
        }
    }

    merged.close();
    rt.bus.publish(
        Event::new(EventKind::MergeClosed)
            .with_stage(name)
            .with_worker(WorkerRole::Merger, 0)
            .with_replicas(replicas),
    );

    let exit = if rt.signal.is_closed() {
        WorkerExit::Cancelled
    } else {
        WorkerExit::Exhausted
    };
    (exit, reports)
}
