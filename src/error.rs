//! Error types used by the stagevisor runtime and fallible stages.
//!
//! This module defines two main error enums:
//!
//! - [`PipelineError`] : errors raised by the pipeline runtime itself.
//! - [`StageError`] : errors raised while transforming a single item.
//!
//! A [`StageError`] never travels through control flow: fallible stages wrap it into an
//! [`Envelope`](crate::Envelope) and forward it downstream like any other item.
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the pipeline runtime.
///
/// These represent failures of the orchestration itself, not of individual items.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Grace period after cancellation was exceeded; remaining workers were aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; aborting workers")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Workers that were still alive when the grace period ran out.
        stuck: Vec<String>,
    },

    /// A worker terminated abnormally. Its output stream was closed before it exited.
    #[error("worker {stage}#{worker} panicked: {reason}")]
    WorkerPanicked {
        /// Stage the worker belonged to.
        stage: String,
        /// Replica index inside the stage.
        worker: usize,
        /// Panic payload rendered as text.
        reason: String,
    },
}

impl PipelineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use stagevisor::PipelineError;
    /// use std::time::Duration;
    ///
    /// let err = PipelineError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "pipeline_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PipelineError::GraceExceeded { .. } => "pipeline_grace_exceeded",
            PipelineError::WorkerPanicked { .. } => "pipeline_worker_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            PipelineError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck:?}")
            }
            PipelineError::WorkerPanicked {
                stage,
                worker,
                reason,
            } => format!("worker {stage}#{worker} panicked: {reason}"),
        }
    }
}

/// # Errors produced while transforming one item.
///
/// Carried inside an [`Envelope`](crate::Envelope); the terminal consumer decides
/// whether to continue, abort or accumulate.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// The transform failed for this item; another attempt may succeed.
    #[error("item failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// One attempt exceeded its per-item timeout.
    #[error("item timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The pipeline was cancelled while the item was waiting for a retry.
    #[error("pipeline cancelled")]
    Canceled,
}

impl StageError {
    /// Shorthand for [`StageError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        StageError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use stagevisor::StageError;
    /// use std::time::Duration;
    ///
    /// let err = StageError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "item_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StageError::Fail { .. } => "item_failed",
            StageError::Timeout { .. } => "item_timeout",
            StageError::Canceled => "item_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StageError::Fail { error } => format!("error: {error}"),
            StageError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            StageError::Canceled => "pipeline cancelled".to_string(),
        }
    }

    /// Indicates whether another attempt at the same item may succeed.
    ///
    /// Returns `true` for [`StageError::Fail`] and [`StageError::Timeout`].
    ///
    /// # Example
    /// ```
    /// use stagevisor::StageError;
    ///
    /// assert!(StageError::fail("boom").is_retryable());
    /// assert!(!StageError::Canceled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, StageError::Fail { .. } | StageError::Timeout { .. })
    }
}
