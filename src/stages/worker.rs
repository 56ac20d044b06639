//! # Worker bodies and their supervision wrapper.
//!
//! Every spawned unit of work (generator, replica, multiplexer, merger) runs inside
//! [`supervise`], which gives it a uniform lifecycle:
//!
//! ```text
//! publish(WorkerStarted)
//!   └─► body.catch_unwind()
//!         ├─ Ok((exit, child_reports)) ───────────────┐
//!         └─ Err(panic) ─► publish(WorkerPanicked) ───┤ (owned streams already dropped)
//!                                                     ▼
//!                               publish(WorkerExited { reason: exit label })
//!                               return child_reports + own WorkerReport
//! ```
//!
//! ## Rules
//! - Exactly one `WorkerStarted` and one `WorkerExited` per worker, panics included.
//! - The body owns its output sender, so the stream is closed before `WorkerExited`
//!   is published.
//! - Every blocking step in [`replica_loop`] and [`forward`] races the signal.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;

use super::transform::{ItemContext, Transform};
use crate::core::report::{WorkerExit, WorkerReport};
use crate::core::runtime::Runtime;
use crate::envelope::Origin;
use crate::events::{Bus, Event, EventKind, WorkerRole};
use crate::signal::CancellationSignal;
use crate::stream::{Recv, SharedReceiver, StreamReceiver, StreamSender};

static WORKER_INSTANCE: AtomicU64 = AtomicU64::new(0);

/// Identity of one worker inside the pipeline.
///
/// `stage`, `role` and `index` repeat when a stage runs twice or two stages share a
/// name; `instance` never does.
#[derive(Clone, Debug)]
pub(crate) struct WorkerId {
    pub(crate) stage: Arc<str>,
    pub(crate) role: WorkerRole,
    pub(crate) index: usize,
    pub(crate) instance: u64,
}

impl WorkerId {
    pub(crate) fn new(stage: Arc<str>, role: WorkerRole, index: usize) -> Self {
        Self {
            stage,
            role,
            index,
            instance: WORKER_INSTANCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .with_stage(Arc::clone(&self.stage))
            .with_worker(self.role, self.index)
            .with_instance(self.instance)
    }
}

/// Runs `body` with lifecycle events and panic isolation.
pub(crate) async fn supervise<F>(id: WorkerId, bus: Bus, body: F) -> Vec<WorkerReport>
where
    F: Future<Output = (WorkerExit, Vec<WorkerReport>)> + Send,
{
    bus.publish(id.event(EventKind::WorkerStarted));

    let (exit, mut reports) = match AssertUnwindSafe(body).catch_unwind().await {
        Ok(done) => done,
        Err(payload) => {
            let reason = panic_reason(payload.as_ref());
            bus.publish(id.event(EventKind::WorkerPanicked).with_reason(reason.as_str()));
            (WorkerExit::Panicked { reason }, Vec::new())
        }
    };

    bus.publish(id.event(EventKind::WorkerExited).with_reason(exit.as_label()));
    reports.push(WorkerReport {
        stage: id.stage,
        role: id.role,
        index: id.index,
        exit,
    });
    reports
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Where a replica reads from: its own stream, or one shared with sibling replicas.
pub(crate) enum Inbound<T> {
    Owned(StreamReceiver<T>),
    Shared(SharedReceiver<T>),
}

impl<T> Inbound<T> {
    async fn next(&mut self, signal: &CancellationSignal) -> Recv<(u64, T)> {
        match self {
            Inbound::Owned(rx) => rx.recv_indexed(signal).await,
            Inbound::Shared(rx) => rx.recv_indexed(signal).await,
        }
    }
}

/// Per-item control loop of one stage replica.
///
/// Returns when upstream is exhausted, the signal fires, or downstream went away.
/// `output` is dropped on return, which closes the replica's stream.
pub(crate) async fn replica_loop<T: Transform>(
    transform: Arc<T>,
    mut input: Inbound<T::In>,
    output: StreamSender<T::Out>,
    rt: Runtime,
    stage: Arc<str>,
    worker: usize,
) -> WorkerExit {
    let signal = &rt.signal;
    loop {
        let (position, item) = match input.next(signal).await {
            Recv::Item(next) => next,
            Recv::Exhausted => return WorkerExit::Exhausted,
            Recv::Cancelled => return WorkerExit::Cancelled,
        };

        let permit = match rt.permit().await {
            Ok(permit) => permit,
            Err(halt) => return halt.into(),
        };
        let cx = ItemContext::new(
            Origin {
                stage: Arc::clone(&stage),
                position,
                worker,
            },
            signal.clone(),
            rt.bus.clone(),
        );
        let out = tokio::select! {
            biased;
            _ = signal.observe() => return WorkerExit::Cancelled,
            out = transform.apply(item, cx) => out,
        };
        drop(permit);

        if let Err(halt) = output.send(out, signal).await {
            return halt.into();
        }
    }
}

/// Fan-in multiplexer: moves one replica's stream into the merged stream.
pub(crate) async fn forward<T>(
    mut from: StreamReceiver<T>,
    into: StreamSender<T>,
    signal: CancellationSignal,
) -> WorkerExit {
    loop {
        match from.recv(&signal).await {
            Recv::Item(item) => {
                if let Err(halt) = into.send(item, &signal).await {
                    return halt.into();
                }
            }
            Recv::Exhausted => return WorkerExit::Exhausted,
            Recv::Cancelled => return WorkerExit::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::bounded;

    #[tokio::test]
    async fn test_supervise_reports_panic_and_closes_stream() {
        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let (tx, mut rx) = bounded::<u8>(1);
        let signal = CancellationSignal::new();

        let id = WorkerId::new(Arc::from("boom"), WorkerRole::Replica, 2);
        let reports = supervise(id, bus.clone(), async move {
            let _owned = tx;
            if true {
                panic!("bad invariant");
            }
            (WorkerExit::Exhausted, Vec::new())
        })
        .await;

        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].exit,
            WorkerExit::Panicked {
                reason: "bad invariant".into()
            }
        );
        assert_eq!(rx.recv(&signal).await, Recv::Exhausted);

        let kinds: Vec<EventKind> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::WorkerStarted,
                EventKind::WorkerPanicked,
                EventKind::WorkerExited
            ]
        );
    }

    #[tokio::test]
    async fn test_same_key_gets_distinct_instances() {
        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let first = WorkerId::new(Arc::from("twin"), WorkerRole::Replica, 0);
        let second = WorkerId::new(Arc::from("twin"), WorkerRole::Replica, 0);
        assert_ne!(first.instance, second.instance);

        let expected = first.instance;
        supervise(first, bus.clone(), async { (WorkerExit::Exhausted, Vec::new()) }).await;
        let started = events.try_recv().unwrap();
        assert_eq!(started.worker_key().as_deref(), Some("twin/replica#0"));
        assert_eq!(started.instance, Some(expected));
    }

    #[tokio::test]
    async fn test_forward_stops_on_cancel() {
        let signal = CancellationSignal::new();
        let (_src_tx, src_rx) = bounded::<u8>(1);
        let (dst_tx, _dst_rx) = bounded::<u8>(1);

        let s = signal.clone();
        let task = tokio::spawn(forward(src_rx, dst_tx, s));
        signal.close();
        assert_eq!(task.await.unwrap(), WorkerExit::Cancelled);
    }
}
