//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for worker lifecycle metrics.
//! - Wire the subscriber in through [`Pipeline::builder`].
//!
//! ## Flow
//! ```text
//! workers ── publish(WorkerStarted / WorkerExited / MergeClosed / ...) ──► Bus
//!     └─► subscriber_listener (in Pipeline)
//!           ├─► WorkerTracker.update()
//!           └─► SubscriberSet.emit() ──► Census.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stagevisor::{sink, Event, EventKind, MapFn, Pipeline, PipelineConfig, Subscribe};

/// Counts worker starts and exits; prints merge completions.
#[derive(Default)]
struct Census {
    started: AtomicUsize,
    exited: AtomicUsize,
}

#[async_trait::async_trait]
impl Subscribe for Census {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::WorkerStarted => {
                self.started.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::WorkerExited => {
                self.exited.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::MergeClosed => {
                println!(
                    "[census] merge closed: stage={} replicas={}",
                    ev.stage.as_deref().unwrap_or("<unknown>"),
                    ev.replicas.unwrap_or(0)
                );
            }
            EventKind::PipelineDrained => println!("[census] drained"),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "census"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let census = Arc::new(Census::default());
    let pipeline = Pipeline::builder(PipelineConfig::default())
        .with_subscribers(vec![census.clone() as Arc<dyn Subscribe>])
        .build();

    let out = pipeline
        .stage(MapFn::new("cube", |x: i64| async move { x * x * x }))
        .fan_out(3)
        .run(pipeline.generate("numbers", -5i64..=5));

    let mut cubes = sink::collect(out, pipeline.signal()).await;
    cubes.sort_unstable();
    println!("cubes: {cubes:?}");

    pipeline.join().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!(
        "[census] started={} exited={}",
        census.started.load(Ordering::Relaxed),
        census.exited.load(Ordering::Relaxed)
    );
    Ok(())
}
