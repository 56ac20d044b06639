//! # Example: basic_pipeline
//!
//! A finite source through two stages, drained by a collecting sink.
//!
//! ```text
//! generate("words") ──► stage("trim") ──► stage("shout") ──► sink::collect
//! ```
//!
//! The generator exhausts its input, closure propagates stage by stage, and
//! `join()` reports a natural drain.
//!
//! ## Run
//! ```bash
//! cargo run --example basic_pipeline
//! ```

use stagevisor::{sink, MapFn, Pipeline, PipelineConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default());

    let words = pipeline.generate("words", ["  alpha", "beta ", " gamma "]);
    let trimmed = pipeline
        .stage(MapFn::new("trim", |s: &'static str| async move { s.trim() }))
        .run(words);
    let shouted = pipeline
        .stage(MapFn::new("shout", |s: &'static str| async move {
            s.to_uppercase()
        }))
        .run(trimmed);

    for word in sink::collect(shouted, pipeline.signal()).await {
        println!("{word}");
    }

    let report = pipeline.join().await?;
    println!(
        "joined {} workers (cancelled: {})",
        report.workers.len(),
        report.cancelled
    );
    Ok(())
}
