//! # Worker and pipeline outcomes.
//!
//! Every worker ends with exactly one [`WorkerExit`]; [`Pipeline::join`](crate::Pipeline::join)
//! gathers one [`WorkerReport`] per worker into a [`PipelineReport`].

use std::sync::Arc;

use crate::events::WorkerRole;
use crate::stream::Halt;

/// How a worker finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerExit {
    /// Upstream closed and was fully drained (normal completion).
    Exhausted,
    /// The signal fired.
    Cancelled,
    /// Downstream dropped its receiver.
    Disconnected,
    /// The worker terminated abnormally; its output stream was closed while unwinding.
    Panicked {
        /// Panic payload rendered as text.
        reason: String,
    },
}

impl WorkerExit {
    /// Returns a short stable label for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerExit::Exhausted => "exhausted",
            WorkerExit::Cancelled => "cancelled",
            WorkerExit::Disconnected => "disconnected",
            WorkerExit::Panicked { .. } => "panicked",
        }
    }
}

impl From<Halt> for WorkerExit {
    fn from(halt: Halt) -> Self {
        match halt {
            Halt::Cancelled => WorkerExit::Cancelled,
            Halt::Disconnected => WorkerExit::Disconnected,
        }
    }
}

/// Final state of one worker.
#[derive(Clone, Debug)]
pub struct WorkerReport {
    /// Stage (or generator) name.
    pub stage: Arc<str>,
    /// Role inside the stage.
    pub role: WorkerRole,
    /// Index inside the stage.
    pub index: usize,
    /// How it finished.
    pub exit: WorkerExit,
}

/// Outcome of [`Pipeline::join`](crate::Pipeline::join).
#[derive(Clone, Debug, Default)]
pub struct PipelineReport {
    /// One entry per joined worker.
    pub workers: Vec<WorkerReport>,
    /// True if the join ended through cancellation rather than natural drain.
    pub cancelled: bool,
}

impl PipelineReport {
    /// Number of workers with the given role.
    pub fn count_role(&self, role: WorkerRole) -> usize {
        self.workers.iter().filter(|w| w.role == role).count()
    }

    /// Workers that terminated abnormally.
    pub fn panicked(&self) -> impl Iterator<Item = &WorkerReport> {
        self.workers
            .iter()
            .filter(|w| matches!(w.exit, WorkerExit::Panicked { .. }))
    }
}
