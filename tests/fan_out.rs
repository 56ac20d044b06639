use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stagevisor::{
    sink, EventKind, FanOut, FanOutPolicy, MapFn, Pipeline, PipelineConfig, WorkerExit, WorkerRole,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn four_replicas_deliver_each_item_once() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(PipelineConfig {
        buffer: 4,
        ..PipelineConfig::default()
    });
    let mut events = pipeline.bus().subscribe();

    let work = pipeline.stage(MapFn::new("work", |x: u32| async move {
        tokio::time::sleep(Duration::from_millis(u64::from(x % 3))).await;
        x
    }));
    let wide = FanOut::wrap(work, 4);
    assert_eq!(wide.replicas(), 4);

    let merged = wide.run(pipeline.generate("items", 0..100u32));
    let out = sink::collect(merged, pipeline.signal()).await;

    assert_eq!(out.len(), 100);
    let unique: HashSet<u32> = out.into_iter().collect();
    assert_eq!(unique, (0..100).collect::<HashSet<u32>>());

    let report = pipeline.join().await?;
    assert_eq!(report.count_role(WorkerRole::Replica), 4);
    assert_eq!(report.count_role(WorkerRole::Multiplexer), 4);
    assert_eq!(report.count_role(WorkerRole::Merger), 1);
    assert!(report.workers.iter().all(|w| w.exit == WorkerExit::Exhausted));

    // the merged stream closes only after every replica and multiplexer exited
    let seen: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    let merge_closed = seen
        .iter()
        .find(|ev| ev.kind == EventKind::MergeClosed)
        .expect("no MergeClosed event");
    assert_eq!(merge_closed.replicas, Some(4));
    assert_eq!(merge_closed.worker_key().as_deref(), Some("work/merge#0"));
    let merge_closed = merge_closed.seq;
    let inner_exits: Vec<u64> = seen
        .iter()
        .filter(|ev| ev.kind == EventKind::WorkerExited)
        .filter(|ev| matches!(ev.role, Some(WorkerRole::Replica | WorkerRole::Multiplexer)))
        .map(|ev| ev.seq)
        .collect();
    assert_eq!(inner_exits.len(), 8);
    assert!(inner_exits.iter().all(|seq| *seq < merge_closed));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn global_concurrency_cap_is_respected() {
    let pipeline = Pipeline::new(PipelineConfig {
        max_concurrent: 2,
        ..PipelineConfig::default()
    });

    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));

    let merged = pipeline
        .stage(MapFn::new("capped", move |x: u32| {
            let (f, p) = (Arc::clone(&f), Arc::clone(&p));
            async move {
                let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                f.fetch_sub(1, Ordering::SeqCst);
                x
            }
        }))
        .fan_out(8)
        .run(pipeline.generate("items", 0..40u32));

    assert_eq!(sink::collect(merged, pipeline.signal()).await.len(), 40);
    pipeline.join().await.unwrap();
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn replica_count_follows_policy_and_cap() {
    let pipeline = Pipeline::new(PipelineConfig {
        max_workers: 3,
        ..PipelineConfig::default()
    });
    let stage = pipeline.stage(MapFn::new("id", |x: u8| async move { x }));

    assert_eq!(stage.replicas(), 1);
    assert_eq!(stage.clone().fan_out(16).replicas(), 3);
    assert_eq!(
        stage
            .clone()
            .fan_out(FanOutPolicy::exactly(16).expecting(2))
            .replicas(),
        2
    );

    // a policy resolving to one replica runs the plain, order-preserving path
    let single = stage.fan_out(FanOutPolicy::exactly(8).expecting(1));
    let out = single.run(pipeline.generate("few", vec![9u8, 8, 7]));
    assert_eq!(sink::collect(out, pipeline.signal()).await, vec![9, 8, 7]);

    let report = pipeline.join().await.unwrap();
    assert_eq!(report.count_role(WorkerRole::Merger), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dropped_consumer_unwinds_fanned_stage() {
    let pipeline = Pipeline::new(PipelineConfig {
        buffer: 2,
        ..PipelineConfig::default()
    });

    let merged = pipeline
        .stage(MapFn::new("wide", |x: u64| async move { x }))
        .fan_out(4)
        .run(pipeline.generate("naturals", 0u64..));

    let mut merged = merged;
    let signal = pipeline.signal().clone();
    let _ = merged.recv(&signal).await;
    drop(merged);

    let report = tokio::time::timeout(Duration::from_secs(2), pipeline.join())
        .await
        .expect("fan-out kept running without a consumer")
        .unwrap();
    assert!(!report.cancelled);
    assert!(report
        .workers
        .iter()
        .any(|w| w.exit == WorkerExit::Disconnected));
}
