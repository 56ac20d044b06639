//! Retry policies for fallible transforms.
//!
//! These knobs control **whether** a failed item gets another attempt and
//! **how long** to wait before it.
//!
//! ## Contents
//! - [`RetryPolicy`] how many attempts one item gets
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized retries across replicas
//!
//! ## Quick wiring
//! ```text
//! TryMapFn::new(name, f).with_retry(RetryPolicy { max_attempts, backoff })
//!      └─► on a retryable StageError:
//!           - backoff.next(attempt - 1) to schedule the next attempt
//!           - sleep raced against the CancellationSignal
//! ```
//!
//! ## Defaults
//! - `RetryPolicy::default()` → a single attempt (no retries).
//! - `BackoffPolicy::default()` → first=50ms, factor=2.0, max=5s, jitter=None.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
