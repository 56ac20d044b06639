//! Runtime core: pipeline root, configuration and lifecycle.
//!
//! Internal modules:
//! - [`pipeline`]: owns the signal, spawns generators, joins workers with a grace period;
//! - [`builder`]: wires the bus listener, subscribers and liveness tracker;
//! - [`runtime`]: handles shared by every stage (signal, bus, worker group, semaphore);
//! - [`tracker`]: sequence-ordered liveness of workers, for stuck-worker reports;
//! - [`report`]: per-worker and per-pipeline outcomes;
//! - [`shutdown`]: OS termination signals.

mod builder;
mod config;
mod pipeline;
pub(crate) mod report;
pub(crate) mod runtime;
mod shutdown;
mod tracker;

pub use builder::PipelineBuilder;
pub use config::PipelineConfig;
pub use pipeline::Pipeline;
pub use report::{PipelineReport, WorkerExit, WorkerReport};
pub use tracker::WorkerTracker;
