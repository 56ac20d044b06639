//! # Stages: the units a pipeline is composed of.
//!
//! - [`Transform`]: per-item work, with closure adapters [`MapFn`] and [`TryMapFn`]
//! - [`Stage`]: a transform bound to a pipeline, `run(input) -> output`
//! - [`FanOut`] / [`FanOutPolicy`]: replicate a stage and merge its outputs
//!
//! ```text
//! Pipeline::generate ──► [stream] ──► Stage::run ──► [stream] ──► Stage::run (fanned out) ──► [stream] ──► sink
//! ```
//!
//! Stages only know their element types, never their neighbours, so any two stages
//! whose `Out`/`In` match can be chained or swapped.

mod fan_out;
mod generator;
mod map_fn;
mod stage;
mod transform;
mod try_map_fn;
mod worker;

pub use fan_out::{FanOut, FanOutPolicy, WorkerCount};
pub use map_fn::MapFn;
pub use stage::Stage;
pub use transform::{ItemContext, Transform};
pub use try_map_fn::TryMapFn;

pub(crate) use generator::generate_loop;
pub(crate) use worker::{supervise, WorkerId};
