//! # Per-item result envelope.
//!
//! Fallible stages emit [`Envelope`]s instead of raw values. An envelope carries the
//! (possibly zero or partial) value, an optional error and the [`Origin`] of the item,
//! and travels downstream exactly like a successful item.
//!
//! ```text
//!   input[i] ──► TryMapFn ──┬─ Ok(v)  ──► Envelope { value: v,       error: None,    context }
//!                           └─ Err(e) ──► Envelope { value: default, error: Some(e), context }
//!                                              │
//!                                   terminal consumer decides: continue / abort / accumulate
//! ```
//!
//! The content of an envelope never closes a stream; closure is an ownership event only.

use std::sync::Arc;

use crate::error::StageError;

/// Identifies where an item was processed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    /// Name of the stage that produced the envelope.
    pub stage: Arc<str>,
    /// Zero-based position of the item in the stage's input stream.
    pub position: u64,
    /// Replica index that processed the item.
    pub worker: usize,
}

/// Value + optional error + origin for one item.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope<T, E = StageError> {
    /// Result value; zero or partial when `error` is set.
    pub value: T,
    /// Error raised while producing `value`, if any.
    pub error: Option<E>,
    /// Where the item was processed.
    pub context: Origin,
    /// Attempts spent on the item (1 when no retry happened).
    pub attempts: u32,
}

impl<T, E> Envelope<T, E> {
    /// Envelope for a successful item.
    pub fn ok(value: T, context: Origin) -> Self {
        Self {
            value,
            error: None,
            context,
            attempts: 1,
        }
    }

    /// Envelope for a failed item carrying a zero/partial value.
    pub fn failed(value: T, error: E, context: Origin) -> Self {
        Self {
            value,
            error: Some(error),
            context,
            attempts: 1,
        }
    }

    /// Records the number of attempts spent.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    #[inline]
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// Converts into a `Result`, discarding the partial value on error.
    pub fn into_result(self) -> Result<T, E> {
        match self.error {
            None => Ok(self.value),
            Some(e) => Err(e),
        }
    }

    /// Maps the value, keeping error and origin.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U, E> {
        Envelope {
            value: f(self.value),
            error: self.error,
            context: self.context,
            attempts: self.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(position: u64) -> Origin {
        Origin {
            stage: Arc::from("parse"),
            position,
            worker: 0,
        }
    }

    #[test]
    fn test_ok_and_failed() {
        let ok: Envelope<u32> = Envelope::ok(4, origin(0));
        assert!(ok.is_ok());
        assert_eq!(ok.into_result(), Ok(4));

        let bad: Envelope<u32> = Envelope::failed(0, StageError::fail("nan"), origin(1));
        assert!(bad.is_err());
        assert_eq!(bad.context.position, 1);
        assert_eq!(bad.into_result(), Err(StageError::fail("nan")));
    }

    #[test]
    fn test_map_keeps_error_and_origin() {
        let env: Envelope<u32> = Envelope::failed(2, StageError::fail("partial"), origin(9))
            .with_attempts(3);
        let mapped = env.map(|v| v * 10);
        assert_eq!(mapped.value, 20);
        assert_eq!(mapped.attempts, 3);
        assert_eq!(mapped.context.position, 9);
        assert!(mapped.is_err());
    }
}
