//! Pipeline-wide broadcast stop condition.
//!
//! - [`CancellationSignal`] single-shot, shared by reference, observable inside `select!`.

mod cancel;

pub use cancel::CancellationSignal;
