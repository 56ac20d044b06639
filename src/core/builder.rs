use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use super::{config::PipelineConfig, pipeline::Pipeline, tracker::WorkerTracker};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Pipeline`] with optional subscribers.
pub struct PipelineBuilder {
    cfg: PipelineConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl PipelineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: PipelineConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (worker lifecycle, item failures, shutdown)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the pipeline and starts its event listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Pipeline {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers);
        let tracker = Arc::new(WorkerTracker::new());

        subscriber_listener(&bus, subs, Arc::clone(&tracker));
        Pipeline::new_internal(self.cfg, bus, tracker)
    }
}

/// Forwards bus events to the tracker and the subscriber set (fire-and-forget).
///
/// Ends once every bus sender is gone, then flushes the subscriber queues.
fn subscriber_listener(bus: &Bus, subs: SubscriberSet, tracker: Arc<WorkerTracker>) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    tracker.update(&ev).await;
                    subs.emit(&ev);
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        subs.shutdown().await;
    });
}
