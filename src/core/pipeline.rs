//! # Pipeline: owns the signal, the bus and every worker of one pipeline.
//!
//! The [`Pipeline`] is the root of a composition. It creates the single
//! [`CancellationSignal`], binds stages to it, spawns generators, and finally joins every
//! worker it (or its stages) spawned.
//!
//! ## High-level architecture
//! ```text
//! Pipeline::builder(cfg).with_subscribers(..).build()
//!   ├─ Bus + subscriber_listener(): Bus ─► WorkerTracker::update + SubscriberSet::emit
//!   └─ Runtime { signal, bus, WorkerGroup, semaphore, buffer, worker_limit }
//!
//! Composition (purely structural):
//!   generate("src", iter) ─► [rx] ─► stage(a).run(rx) ─► [rx] ─► stage(b).fan_out(4).run(rx) ─► [rx] ─► sink
//!       every worker ─► WorkerGroup (JoinSet) ─► Pipeline::join
//!
//! Termination:
//!   (a) sink stops draining and closes the signal ─► workers observe it at their next
//!       suspension point ─► join waits up to cfg.grace
//!   (b) generator exhausts its input ─► closure propagates stage by stage ─► join sees
//!       every worker finish ─► PipelineDrained
//!
//! join():
//!   select! { signal fired ─► CancelRequested ─► wait_all_with_grace(cfg.grace)
//!                                 ├─ Ok      ─► AllStoppedWithin
//!                                 └─ Timeout ─► GraceExceeded (WorkerTracker snapshot), abort rest
//!             all joined   ─► PipelineDrained }
//! ```
//!
//! ## Example
//! ```rust
//! use stagevisor::{sink, MapFn, Pipeline, PipelineConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::new(PipelineConfig::default());
//!
//!     let source = pipeline.generate("numbers", 1..=5u64);
//!     let squares = pipeline
//!         .stage(MapFn::new("square", |x: u64| async move { x * x }))
//!         .run(source);
//!
//!     let out = sink::collect(squares, pipeline.signal()).await;
//!     assert_eq!(out, vec![1, 4, 9, 16, 25]);
//!
//!     let report = pipeline.join().await?;
//!     assert!(!report.cancelled);
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::builder::PipelineBuilder;
use super::config::PipelineConfig;
use super::report::{PipelineReport, WorkerExit, WorkerReport};
use super::runtime::{Runtime, WorkerGroup};
use super::shutdown;
use super::tracker::WorkerTracker;
use crate::error::PipelineError;
use crate::events::{Bus, Event, EventKind, WorkerRole};
use crate::signal::CancellationSignal;
use crate::stages::{generate_loop, supervise, Stage, Transform, WorkerId};
use crate::stream::{self, StreamReceiver};

/// Root of one pipeline: signal, bus, worker group and shutdown policy.
pub struct Pipeline {
    cfg: PipelineConfig,
    rt: Runtime,
    tracker: Arc<WorkerTracker>,
    watchers: Mutex<JoinSet<()>>,
}

impl Pipeline {
    /// Starts building a pipeline with subscribers.
    pub fn builder(cfg: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder::new(cfg)
    }

    /// Creates a pipeline without subscribers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: PipelineConfig) -> Self {
        PipelineBuilder::new(cfg).build()
    }

    pub(crate) fn new_internal(cfg: PipelineConfig, bus: Bus, tracker: Arc<WorkerTracker>) -> Self {
        let semaphore = cfg.concurrency_limit().map(Semaphore::new).map(Arc::new);
        let rt = Runtime {
            signal: CancellationSignal::new(),
            bus,
            group: WorkerGroup::default(),
            semaphore,
            buffer: cfg.buffer_clamped(),
            worker_limit: cfg.worker_limit(),
        };
        Self {
            cfg,
            rt,
            tracker,
            watchers: Mutex::new(JoinSet::new()),
        }
    }

    /// The configuration this pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// The pipeline-wide cancellation signal.
    pub fn signal(&self) -> &CancellationSignal {
        &self.rt.signal
    }

    /// The pipeline's event bus.
    pub fn bus(&self) -> &Bus {
        &self.rt.bus
    }

    /// Binds `transform` to this pipeline.
    ///
    /// Pass an `Arc<T>` to back several stages with one transform instance.
    pub fn stage<T: Transform>(&self, transform: T) -> Stage<T> {
        Stage::new(Arc::new(transform), self.rt.clone())
    }

    /// Spawns a generator worker that feeds `items` into a new stream.
    ///
    /// Every write races the signal, so an undrained generator exits on cancellation.
    pub fn generate<I>(&self, name: impl Into<Arc<str>>, items: I) -> StreamReceiver<I::Item>
    where
        I: IntoIterator + Send + 'static,
        I::IntoIter: Send + 'static,
        I::Item: Send + 'static,
    {
        let (tx, rx) = stream::bounded(self.rt.buffer);
        let id = WorkerId::new(name.into(), WorkerRole::Generator, 0);
        let body = generate_loop(items, tx, self.rt.signal.clone());
        self.rt
            .group
            .spawn(supervise(id, self.rt.bus.clone(), async move {
                (body.await, Vec::new())
            }));
        rx
    }

    /// Fires the signal. Returns `false` if it had already fired.
    pub fn cancel(&self) -> bool {
        self.rt.signal.close()
    }

    /// Fires the signal once `after` elapsed (timeout watchdog).
    pub fn cancel_after(&self, after: Duration) {
        let signal = self.rt.signal.clone();
        self.watch(async move {
            tokio::select! {
                biased;
                _ = signal.observe() => {}
                _ = tokio::time::sleep(after) => {
                    signal.close();
                }
            }
        });
    }

    /// Fires the signal when the process receives a termination signal.
    pub fn cancel_on_shutdown(&self) {
        let signal = self.rt.signal.clone();
        self.watch(async move {
            tokio::select! {
                biased;
                _ = signal.observe() => {}
                res = shutdown::terminate_requested() => match res {
                    Ok(()) => {
                        signal.close();
                    }
                    Err(e) => eprintln!("[stagevisor] cannot listen for OS signals: {e}"),
                },
            }
        });
    }

    fn watch<F>(&self, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        watchers.spawn(fut);
    }

    /// Sorted keys (`stage/role#index`) of workers currently alive.
    pub async fn alive_workers(&self) -> Vec<String> {
        self.tracker.snapshot().await
    }

    /// Waits until every worker exited.
    ///
    /// The terminal stream must be drained (or dropped) concurrently, otherwise the last
    /// stage waits on a full buffer until the signal fires.
    ///
    /// # Errors
    /// - [`PipelineError::GraceExceeded`] if workers outlived `grace` after cancellation
    ///   (they are aborted);
    /// - [`PipelineError::WorkerPanicked`] if any worker terminated abnormally.
    pub async fn join(self) -> Result<PipelineReport, PipelineError> {
        let mut set = self.rt.group.take();
        let mut workers = Vec::new();

        let cancelled = tokio::select! {
            biased;
            _ = self.rt.signal.observe() => true,
            _ = join_all(&self.rt.group, &mut set, &mut workers) => false,
        };

        let outcome = if cancelled {
            self.rt.bus.publish(Event::new(EventKind::CancelRequested));
            self.wait_all_with_grace(&mut set, &mut workers).await
        } else {
            self.rt.bus.publish(Event::new(EventKind::PipelineDrained));
            Ok(())
        };
        self.stop_watchers();
        outcome?;

        let panicked = workers.iter().find_map(|w| match &w.exit {
            WorkerExit::Panicked { reason } => Some(PipelineError::WorkerPanicked {
                stage: w.stage.to_string(),
                worker: w.index,
                reason: reason.clone(),
            }),
            _ => None,
        });
        if let Some(err) = panicked {
            return Err(err);
        }
        Ok(PipelineReport { workers, cancelled })
    }

    async fn wait_all_with_grace(
        &self,
        set: &mut JoinSet<Vec<WorkerReport>>,
        workers: &mut Vec<WorkerReport>,
    ) -> Result<(), PipelineError> {
        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, join_all(&self.rt.group, set, workers)).await {
            Ok(()) => {
                self.rt.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                self.rt.bus.publish(Event::new(EventKind::GraceExceeded));
                let stuck = self.tracker.snapshot().await;
                set.shutdown().await;
                self.rt.group.take().shutdown().await;
                Err(PipelineError::GraceExceeded { grace, stuck })
            }
        }
    }

    fn stop_watchers(&self) {
        let mut watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        watchers.abort_all();
    }
}

/// Joins `set`, then anything spawned into `group` meanwhile, until both are empty.
async fn join_all(
    group: &WorkerGroup,
    set: &mut JoinSet<Vec<WorkerReport>>,
    workers: &mut Vec<WorkerReport>,
) {
    loop {
        while let Some(joined) = set.join_next().await {
            // supervise() catches panics, so only aborted tasks fail to join
            if let Ok(batch) = joined {
                workers.extend(batch);
            }
        }
        let more = group.take();
        if more.is_empty() {
            return;
        }
        *set = more;
    }
}
