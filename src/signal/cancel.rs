//! # CancellationSignal: the pipeline's single "done" condition.
//!
//! A thin wrapper over [`CancellationToken`] that adds an idempotency guard around the
//! one-way transition to *fired*.
//!
//! ```text
//!   Pipeline root ── CancellationSignal::new()
//!        │  (clone = same shared state)
//!        ├──► generator   select! { send, signal.observe() }
//!        ├──► stage A     select! { recv, signal.observe() } / select! { send, ... }
//!        ├──► fan-out     workers + multiplexers, same races
//!        └──► sink / watchdog ── signal.close()   (first call wins, later calls are no-ops)
//! ```
//!
//! ## Rules
//! - Clones share one state: closing any clone fires all of them.
//! - `close()` returns `true` only for the call that performed the transition.
//! - Once fired, every current and future `observe()` completes immediately.
//! - Carries no payload.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    fired: AtomicBool,
}

/// Single-shot broadcast stop condition shared by every stage of one pipeline.
///
/// # Example
/// ```
/// use stagevisor::CancellationSignal;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let signal = CancellationSignal::new();
/// let observer = signal.clone();
///
/// assert!(signal.close());
/// assert!(!signal.close()); // repeat close is a no-op
///
/// observer.observe().await; // returns immediately once fired
/// assert!(observer.is_closed());
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

impl CancellationSignal {
    /// Creates a new, not yet fired signal.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                fired: AtomicBool::new(false),
            }),
        }
    }

    /// Fires the signal.
    ///
    /// Returns `true` if this call performed the transition and `false` if the
    /// signal had already been closed.
    pub fn close(&self) -> bool {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.token.cancel();
        true
    }

    /// True once the signal has fired.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Returns a future that completes when the signal fires.
    ///
    /// Intended as one arm of a `tokio::select!` next to a stream operation.
    pub fn observe(&self) -> WaitForCancellationFuture<'_> {
        self.inner.token.cancelled()
    }

    /// Returns a child token for interop with other tokio-util based code.
    ///
    /// The child is cancelled when this signal fires. Cancelling the child does not
    /// fire the signal; only [`close`](Self::close) does.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}
