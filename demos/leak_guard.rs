//! # Example: leak_guard
//!
//! A generator nobody reads from, stopped by a timeout watchdog or Ctrl-C.
//!
//! Without racing every write against the signal, the generator would park forever on its
//! full buffer. Here it exits within one scheduling step of the watchdog firing, and the
//! report accounts for every worker.
//!
//! ## Run
//! ```bash
//! cargo run --example leak_guard
//! ```

use std::time::Duration;

use stagevisor::{MapFn, Pipeline, PipelineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(PipelineConfig {
        buffer: 1,
        grace: Duration::from_secs(1),
        ..PipelineConfig::default()
    });
    pipeline.cancel_on_shutdown();
    pipeline.cancel_after(Duration::from_millis(300));

    let ticks = pipeline.generate("ticks", 0u64..);
    let _never_read = pipeline
        .stage(MapFn::new("label", |n: u64| async move { format!("tick-{n}") }))
        .fan_out(2)
        .run(ticks);

    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("alive before cancel: {:?}", pipeline.alive_workers().await);

    let report = pipeline.join().await?;
    for w in &report.workers {
        println!("{}/{}#{} -> {}", w.stage, w.role, w.index, w.exit.as_label());
    }
    Ok(())
}
