//! # Example: fallible_stage
//!
//! Per-item failures travel downstream as envelopes; the sink decides what to do.
//!
//! Shows how to:
//! - Use [`TryMapFn`] with a per-attempt timeout and a retry policy.
//! - Let the terminal consumer accumulate failures instead of stopping.
//! - Watch retries and failures through the built-in [`LogWriter`].
//!
//! ## Run
//! ```bash
//! cargo run --example fallible_stage --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use stagevisor::{
    sink, BackoffPolicy, ErrorAction, JitterPolicy, LogWriter, Pipeline, PipelineConfig,
    RetryPolicy, StageError, Subscribe, TryMapFn,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let pipeline = Pipeline::builder(PipelineConfig::default())
        .with_subscribers(subs)
        .build();

    let retry = RetryPolicy::attempts(
        3,
        BackoffPolicy {
            first: Duration::from_millis(10),
            max: Duration::from_millis(100),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        },
    );

    let parse = TryMapFn::new("parse", |raw: String| async move {
        raw.trim()
            .parse::<i64>()
            .map_err(|e| StageError::fail(format!("{raw:?}: {e}")))
    })
    .with_timeout(Duration::from_millis(200))
    .with_retry(retry);

    let input: Vec<String> = ["10", "20", "x", "40", "", "60"]
        .into_iter()
        .map(String::from)
        .collect();
    let parsed = pipeline.stage(parse).run(pipeline.generate("input", input));

    let report = sink::drain_envelopes(parsed, pipeline.signal(), |_| ErrorAction::Accumulate).await;
    println!("values:   {:?}", report.values);
    for failure in &report.failures {
        println!(
            "failure:  position={} attempts={} error={}",
            failure.context.position,
            failure.attempts,
            failure
                .error
                .as_ref()
                .map(|e| e.as_message())
                .unwrap_or_default()
        );
    }

    pipeline.join().await?;
    // let the subscriber queue flush before exiting
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
