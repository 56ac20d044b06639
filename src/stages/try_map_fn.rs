//! # Closure-backed fallible transform (`TryMapFn`).
//!
//! [`TryMapFn`] wraps `F: Fn(In) -> Fut` where `Fut` resolves to `Result<Out, StageError>`
//! and emits one [`Envelope`] per input item. A failed item never stops the stage: its error
//! is wrapped together with `Out::default()` and forwarded like a successful value.
//!
//! ## Attempt loop
//! ```text
//! attempt = 1
//! loop {
//!   res = timeout? { f(item.clone()) }
//!   Ok(v)                         ──► Envelope::ok(v)
//!   Err(e) && retryable && budget ──► publish ItemRetrying ──► sleep(backoff) | signal ──► attempt += 1
//!   Err(e)                        ──► publish ItemFailed   ──► Envelope::failed(default, e)
//! }
//! ```
//!
//! ## Rules
//! - The backoff sleep races the signal; on cancellation the item ends as
//!   [`StageError::Canceled`] without another attempt.
//! - A per-attempt timeout turns into [`StageError::Timeout`], which is retryable.
//! - The input is cloned per attempt only when retries are configured.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use stagevisor::{BackoffPolicy, RetryPolicy, StageError, TryMapFn};
//!
//! let parse: TryMapFn<_, String> = TryMapFn::new("parse", |s: String| async move {
//!     s.trim().parse::<i64>().map_err(|e| StageError::fail(e.to_string()))
//! })
//! .with_timeout(Duration::from_millis(200))
//! .with_retry(RetryPolicy::attempts(3, BackoffPolicy::constant(Duration::from_millis(5))));
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use futures::future::BoxFuture;

use super::transform::{ItemContext, Transform};
use crate::envelope::Envelope;
use crate::error::StageError;
use crate::events::{Event, EventKind};
use crate::policies::RetryPolicy;

/// Function-backed transform whose failures travel downstream as envelopes.
pub struct TryMapFn<F, I> {
    name: Cow<'static, str>,
    f: F,
    retry: RetryPolicy,
    timeout: Option<Duration>,
    _input: PhantomData<fn(I)>,
}

impl<F, I> TryMapFn<F, I> {
    /// Creates a transform with a single attempt and no timeout.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            retry: RetryPolicy::never(),
            timeout: None,
            _input: PhantomData,
        }
    }

    /// Retries retryable failures according to `policy`.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Bounds every attempt; `Duration::ZERO` disables the bound.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() { None } else { Some(timeout) };
        self
    }
}

impl<F, I, O, Fut> TryMapFn<F, I>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, StageError>> + Send + 'static,
{
    async fn attempt(&self, item: I) -> Result<O, StageError> {
        let fut = (self.f)(item);
        match self.timeout {
            None => fut.await,
            Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                Ok(res) => res,
                Err(_elapsed) => Err(StageError::Timeout { timeout }),
            },
        }
    }
}

impl<F, I, O, Fut> Transform for TryMapFn<F, I>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, StageError>> + Send + 'static,
    I: Clone + Send + 'static,
    O: Default + Send + 'static,
{
    type In = I;
    type Out = Envelope<O>;

    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, item: I, cx: ItemContext) -> BoxFuture<'a, Envelope<O>> {
        Box::pin(async move {
            let origin = cx.origin().clone();
            let budget = self.retry.budget();
            let mut attempt: u32 = 1;

            while attempt < budget {
                let err = match self.attempt(item.clone()).await {
                    Ok(value) => return Envelope::ok(value, origin).with_attempts(attempt),
                    Err(e) => e,
                };
                let delay = match self.retry.delay_after(attempt) {
                    Some(delay) if err.is_retryable() => delay,
                    _ => return give_up(&cx, err, attempt),
                };

                cx.publish(
                    Event::new(EventKind::ItemRetrying)
                        .with_attempt(attempt)
                        .with_delay(delay)
                        .with_reason(err.to_string()),
                );
                tokio::select! {
                    biased;
                    _ = cx.signal().observe() => {
                        return Envelope::failed(O::default(), StageError::Canceled, origin)
                            .with_attempts(attempt);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }

            match self.attempt(item).await {
                Ok(value) => Envelope::ok(value, origin).with_attempts(attempt),
                Err(err) => give_up(&cx, err, attempt),
            }
        })
    }
}

fn give_up<O: Default>(cx: &ItemContext, err: StageError, attempt: u32) -> Envelope<O> {
    cx.publish(
        Event::new(EventKind::ItemFailed)
            .with_attempt(attempt)
            .with_reason(err.to_string()),
    );
    Envelope::failed(O::default(), err, cx.origin().clone()).with_attempts(attempt)
}
