//! # Pipeline configuration.
//!
//! Provides [`PipelineConfig`], centralized settings for one pipeline runtime.
//!
//! ## Sentinel values
//! - `max_workers = 0` → no cap on replicas per fanned-out stage
//! - `max_concurrent = 0` → unlimited in-flight transforms (no global semaphore created)
//! - `buffer` and `bus_capacity` are clamped to a minimum of 1

use std::time::Duration;

/// Settings for one pipeline runtime.
///
/// ## Field semantics
/// - `buffer`: capacity of every stream the runtime creates (stage outputs, per-replica
///   streams, merged streams, generator outputs)
/// - `max_workers`: upper bound on replicas of one fanned-out stage (`0` = no cap)
/// - `max_concurrent`: upper bound on transforms executing at once, across all stages (`0` = unlimited)
/// - `grace`: how long [`Pipeline::join`](crate::Pipeline::join) waits for workers after cancellation
/// - `bus_capacity`: event bus ring buffer size
///
/// Total buffered items are bounded by `buffer × streams`, and live workers by the
/// number of stages × `max_workers`.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Capacity of each stream.
    pub buffer: usize,

    /// Replica cap for fanned-out stages.
    ///
    /// - `0` = uncapped (the fan-out policy alone decides)
    /// - `n > 0` = at most `n` replicas per stage
    pub max_workers: usize,

    /// Global cap on concurrently executing transforms.
    ///
    /// - `0` = unlimited (no semaphore)
    /// - `n > 0` = at most `n` items are being transformed at once
    ///
    /// Permits are held only while a transform runs, never while a worker waits on a stream.
    pub max_concurrent: usize,

    /// Maximum time to wait for workers to exit once the signal fired.
    ///
    /// If exceeded, remaining workers are aborted and `join` returns
    /// [`PipelineError::GraceExceeded`](crate::PipelineError::GraceExceeded).
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Receivers lagging behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl PipelineConfig {
    /// Stream capacity clamped to a minimum of 1.
    #[inline]
    pub fn buffer_clamped(&self) -> usize {
        self.buffer.max(1)
    }

    /// Replica cap as an `Option` (`None` = uncapped).
    #[inline]
    pub fn worker_limit(&self) -> Option<usize> {
        if self.max_workers == 0 {
            None
        } else {
            Some(self.max_workers)
        }
    }

    /// Global transform concurrency limit as an `Option` (`None` = unlimited).
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for PipelineConfig {
    /// Default configuration:
    ///
    /// - `buffer = 16`
    /// - `max_workers = 64`
    /// - `max_concurrent = 0` (unlimited)
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            buffer: 16,
            max_workers: 64,
            max_concurrent: 0,
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}
