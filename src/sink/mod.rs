//! # Terminal consumers.
//!
//! Helpers that drain the last stream of a pipeline and report to the caller.
//!
//! - [`collect`]: everything until the stream closes or the signal fires
//! - [`take`]: the first `n` items, then fire the signal (consumer-driven stop)
//! - [`drain_envelopes`]: split envelopes into values and failures, deciding per failure
//!   whether to continue, accumulate or abort
//!
//! Every helper takes the receiver by value; when it returns, the receiver is dropped
//! and upstream workers observe a disconnected stream.

mod drain;

pub use drain::{collect, drain_envelopes, take, ErrorAction, SinkReport};
