//! # Worker liveness tracker with sequence-based ordering.
//!
//! Maintains which workers are currently alive, using event sequence numbers to
//! handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! workers ──► Bus ──► subscriber_listener() ──► WorkerTracker::update()
//!                                                      │
//!                                                      ▼
//!                                     HashMap<instance, WorkerState { key, .. }>
//! ```
//!
//! ## Rules
//! - Only `WorkerStarted` / `WorkerExited` change liveness
//! - Workers are told apart by `Event::instance`; events without one are ignored
//! - Several live instances may share a key (`stage/role#i`); each is listed
//! - Reads (`snapshot`) are **eventually consistent**
//! - Events with `seq <= last_seq` for the same instance are **rejected** (stale)

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone)]
struct WorkerState {
    key: String,
    last_seq: Option<u64>,
    alive: bool,
}

/// Thread-safe tracker of alive workers.
///
/// Used by [`Pipeline::join`](crate::Pipeline::join) to name stuck workers
/// when the grace period runs out.
#[derive(Default)]
pub struct WorkerTracker {
    state: RwLock<HashMap<u64, WorkerState>>,
}

impl WorkerTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a worker lifecycle event if it is newer than the last one seen
    /// for that worker. Returns `true` when liveness changed.
    pub async fn update(&self, ev: &Event) -> bool {
        let alive = match ev.kind {
            EventKind::WorkerStarted => true,
            EventKind::WorkerExited => false,
            _ => return false,
        };
        let (Some(instance), Some(key)) = (ev.instance, ev.worker_key()) else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(instance).or_insert(WorkerState {
            key,
            last_seq: None,
            alive: false,
        });
        if entry.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        entry.last_seq = Some(ev.seq);
        let changed = entry.alive != alive;
        entry.alive = alive;
        changed
    }

    /// Returns sorted keys of currently alive workers, one entry per live instance.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .values()
            .filter(|ws| ws.alive)
            .map(|ws| ws.key.clone())
            .collect();
        alive.sort_unstable();
        alive
    }

    /// True if any worker with the given key is currently alive.
    pub async fn is_alive(&self, key: &str) -> bool {
        self.state
            .read()
            .await
            .values()
            .any(|ws| ws.alive && ws.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WorkerRole;

    fn ev(kind: EventKind) -> Event {
        ev_of(kind, 1)
    }

    fn ev_of(kind: EventKind, instance: u64) -> Event {
        Event::new(kind)
            .with_stage("square")
            .with_worker(WorkerRole::Replica, 0)
            .with_instance(instance)
    }

    #[tokio::test]
    async fn test_start_then_exit() {
        let tracker = WorkerTracker::new();
        assert!(tracker.update(&ev(EventKind::WorkerStarted)).await);
        assert_eq!(tracker.snapshot().await, vec!["square/replica#0".to_string()]);

        assert!(tracker.update(&ev(EventKind::WorkerExited)).await);
        assert!(tracker.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_event_rejected() {
        let tracker = WorkerTracker::new();
        let started = ev(EventKind::WorkerStarted);
        let exited = ev(EventKind::WorkerExited);

        tracker.update(&exited).await;
        assert!(!tracker.update(&started).await);
        assert!(!tracker.is_alive("square/replica#0").await);
    }

    #[tokio::test]
    async fn test_shared_key_tracked_per_instance() {
        let tracker = WorkerTracker::new();
        tracker.update(&ev_of(EventKind::WorkerStarted, 1)).await;
        tracker.update(&ev_of(EventKind::WorkerStarted, 2)).await;
        assert_eq!(
            tracker.snapshot().await,
            vec!["square/replica#0".to_string(), "square/replica#0".to_string()]
        );

        tracker.update(&ev_of(EventKind::WorkerExited, 1)).await;
        assert_eq!(tracker.snapshot().await, vec!["square/replica#0".to_string()]);
        assert!(tracker.is_alive("square/replica#0").await);

        tracker.update(&ev_of(EventKind::WorkerExited, 2)).await;
        assert!(!tracker.is_alive("square/replica#0").await);
    }

    #[tokio::test]
    async fn test_unrelated_events_ignored() {
        let tracker = WorkerTracker::new();
        assert!(!tracker.update(&Event::new(EventKind::CancelRequested)).await);
        assert!(!tracker.update(&ev(EventKind::ItemFailed)).await);
        let anonymous = Event::new(EventKind::WorkerStarted)
            .with_stage("square")
            .with_worker(WorkerRole::Replica, 0);
        assert!(!tracker.update(&anonymous).await);
        assert!(tracker.snapshot().await.is_empty());
    }
}
