//! # Retry policy for one item.
//!
//! [`RetryPolicy`] bounds how many attempts a fallible transform makes for a single
//! item before the error is wrapped into an [`Envelope`](crate::Envelope).
//!
//! Only retryable errors ([`StageError::is_retryable`](crate::StageError::is_retryable))
//! are retried. A retry never outlives cancellation: the backoff sleep races the signal.

use std::time::Duration;

use super::BackoffPolicy;

/// Attempt budget and delay schedule for one item.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts per item, including the first one (`0` is treated as `1`).
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    /// One attempt, no retries.
    fn default() -> Self {
        Self::never()
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn never() -> Self {
        Self {
            max_attempts: 1,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Up to `max_attempts` attempts with the given backoff.
    pub fn attempts(max_attempts: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Effective attempt budget (at least 1).
    #[inline]
    pub fn budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt `attempt` (1-based), or `None` when the
    /// budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.budget() {
            return None;
        }
        Some(self.backoff.next(attempt.saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_has_no_delay() {
        assert_eq!(RetryPolicy::never().delay_after(1), None);
        assert_eq!(RetryPolicy::attempts(0, BackoffPolicy::default()).budget(), 1);
    }

    #[test]
    fn test_delays_follow_backoff() {
        let p = RetryPolicy::attempts(3, BackoffPolicy::constant(Duration::from_millis(7)));
        assert_eq!(p.delay_after(1), Some(Duration::from_millis(7)));
        assert_eq!(p.delay_after(2), Some(Duration::from_millis(7)));
        assert_eq!(p.delay_after(3), None);
    }
}
