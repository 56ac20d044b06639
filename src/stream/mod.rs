//! Bounded single-owner streams connecting stages.
//!
//! ## Contents
//! - [`bounded`] creates a stream and returns its two capability handles
//! - [`StreamSender`] write side: `send` + `close` (owned by exactly one producer)
//! - [`StreamReceiver`] read side: `recv` only
//! - [`Recv`] / [`Halt`] outcomes of a cancellation-aware read / write
//!
//! Every blocking operation takes the pipeline's [`CancellationSignal`](crate::CancellationSignal)
//! and races it, so no stream operation can park a worker past cancellation.

mod channel;
mod shared;

pub use channel::{bounded, Halt, Recv, StreamReceiver, StreamSender};
pub(crate) use shared::SharedReceiver;
