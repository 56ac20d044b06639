//! # Example: fan_out
//!
//! An expensive stage replicated across several workers.
//!
//! ```text
//!                        ┌─► replica#0 ─► mux#0 ─┐
//! generate("jobs") ──────┼─► replica#1 ─► mux#1 ─┼──► merged ──► sink::collect
//!                        └─► replica#N ─► mux#N ─┘
//! ```
//!
//! Results arrive in no particular order.
//!
//! ## Run
//! ```bash
//! cargo run --example fan_out
//! ```

use std::time::{Duration, Instant};

use stagevisor::{sink, FanOut, FanOutPolicy, MapFn, Pipeline, PipelineConfig};

const JOBS: u64 = 32;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(PipelineConfig {
        max_workers: 8,
        ..PipelineConfig::default()
    });

    let hash = pipeline.stage(MapFn::new("hash", |n: u64| async move {
        // pretend this is expensive
        tokio::time::sleep(Duration::from_millis(50)).await;
        (n, n.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }));
    let wide = FanOut::wrap(hash, FanOutPolicy::auto().expecting(JOBS as usize));
    println!("running {} replicas", wide.replicas());

    let started = Instant::now();
    let results = sink::collect(wide.run(pipeline.generate("jobs", 0..JOBS)), pipeline.signal()).await;

    for (n, h) in results.iter().take(5) {
        println!("job {n:>2} -> {h:016x}");
    }
    println!("{} results in {:?}", results.len(), started.elapsed());

    pipeline.join().await?;
    Ok(())
}
