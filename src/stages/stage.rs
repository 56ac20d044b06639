//! # Stage: one transform bound to a pipeline.
//!
//! A [`Stage`] consumes an input stream and returns a new, exclusively owned output stream.
//! It is created by [`Pipeline::stage`](crate::Pipeline::stage), which binds it to the
//! pipeline's signal, bus and worker group.
//!
//! ## Control loop (per replica)
//! ```text
//! loop {
//!   select! { signal ─► stop, close output        ; recv ─► item / Exhausted ─► close output }
//!   permit (if max_concurrent > 0), raced with the signal
//!   select! { signal ─► stop                      ; transform.apply(item) }
//!   select! { signal ─► stop                      ; send(out) }
//! }
//! ```
//!
//! Without fan-out the output preserves input order. With fan-out it does not.

use std::sync::Arc;

use super::fan_out::{self, FanOutPolicy};
use super::transform::Transform;
use super::worker::{replica_loop, supervise, Inbound, WorkerId};
use crate::core::runtime::Runtime;
use crate::events::WorkerRole;
use crate::stream::{self, StreamReceiver};

/// One transform unit attached to a pipeline.
///
/// Cloning a stage is cheap; each [`run`](Stage::run) spawns a fresh set of workers.
pub struct Stage<T: Transform> {
    transform: Arc<T>,
    name: Arc<str>,
    rt: Runtime,
    fan_out: Option<FanOutPolicy>,
}

impl<T: Transform> Clone for Stage<T> {
    fn clone(&self) -> Self {
        Self {
            transform: Arc::clone(&self.transform),
            name: Arc::clone(&self.name),
            rt: self.rt.clone(),
            fan_out: self.fan_out,
        }
    }
}

impl<T: Transform> Stage<T> {
    pub(crate) fn new(transform: Arc<T>, rt: Runtime) -> Self {
        let name = Arc::from(transform.name());
        Self {
            transform,
            name,
            rt,
            fan_out: None,
        }
    }

    /// Stage name, as reported in events and envelopes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs this stage on `policy`-many replicas.
    pub fn fan_out(mut self, policy: impl Into<FanOutPolicy>) -> Self {
        self.fan_out = Some(policy.into());
        self
    }

    /// Number of replicas [`run`](Stage::run) will start.
    pub fn replicas(&self) -> usize {
        self.fan_out
            .map(|policy| policy.resolve(self.rt.worker_limit))
            .unwrap_or(1)
    }

    /// Attaches the stage to `input` and returns its output stream.
    ///
    /// Spawns the stage's workers onto the current tokio runtime; they are joined by
    /// [`Pipeline::join`](crate::Pipeline::join).
    pub fn run(&self, input: StreamReceiver<T::In>) -> StreamReceiver<T::Out> {
        let replicas = self.replicas();
        if replicas > 1 {
            return fan_out::spawn_merged(
                Arc::clone(&self.transform),
                Arc::clone(&self.name),
                &self.rt,
                input,
                replicas,
            );
        }

        let (tx, rx) = stream::bounded(self.rt.buffer);
        let body = replica_loop(
            Arc::clone(&self.transform),
            Inbound::Owned(input),
            tx,
            self.rt.clone(),
            Arc::clone(&self.name),
            0,
        );
        self.rt.group.spawn(supervise(
            WorkerId::new(Arc::clone(&self.name), WorkerRole::Replica, 0),
            self.rt.bus.clone(),
            async move { (body.await, Vec::new()) },
        ));
        rx
    }
}
