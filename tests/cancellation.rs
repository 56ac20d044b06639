use std::time::{Duration, Instant};

use stagevisor::{
    sink, EventKind, FanOutPolicy, MapFn, Pipeline, PipelineConfig, PipelineError, WorkerExit,
    WorkerRole,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_bounds_shutdown_of_slow_stages() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(PipelineConfig {
        buffer: 2,
        ..PipelineConfig::default()
    });

    let slow = |x: u64| async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        x
    };
    let source = pipeline.generate("ticks", 0u64..);
    let first = pipeline.stage(MapFn::new("slow", slow)).run(source);
    let second = pipeline
        .stage(MapFn::new("slow_wide", slow))
        .fan_out(4)
        .run(first);

    let started = Instant::now();
    pipeline.cancel_after(Duration::from_millis(50));

    let out = tokio::time::timeout(
        Duration::from_secs(1),
        sink::collect(second, pipeline.signal()),
    )
    .await
    .expect("terminal stream did not close after cancel");
    assert!(out.is_empty());

    let report = tokio::time::timeout(Duration::from_secs(1), pipeline.join())
        .await
        .expect("join did not finish after cancel")?;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(report.cancelled);
    assert!(report
        .workers
        .iter()
        .all(|w| matches!(w.exit, WorkerExit::Cancelled | WorkerExit::Disconnected)));
    Ok(())
}

#[tokio::test]
async fn unconsumed_generator_does_not_leak() {
    let pipeline = Pipeline::new(PipelineConfig {
        buffer: 1,
        ..PipelineConfig::default()
    });
    let mut events = pipeline.bus().subscribe();

    // nobody ever reads these streams
    let _a = pipeline.generate("left", 0u64..);
    let _b = pipeline.generate("right", std::iter::repeat("x"));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        pipeline.alive_workers().await,
        vec!["left/generator#0".to_string(), "right/generator#0".to_string()]
    );

    assert!(pipeline.cancel());
    assert!(!pipeline.cancel());
    let report = tokio::time::timeout(Duration::from_secs(1), pipeline.join())
        .await
        .expect("generator leaked past cancellation")
        .unwrap();
    assert_eq!(report.count_role(WorkerRole::Generator), 2);

    let kinds: Vec<EventKind> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|ev| ev.kind)
        .collect();
    let started = kinds.iter().filter(|k| **k == EventKind::WorkerStarted).count();
    let exited = kinds.iter().filter(|k| **k == EventKind::WorkerExited).count();
    assert_eq!(started, 2);
    assert_eq!(started, exited);
    assert!(kinds.contains(&EventKind::CancelRequested));
    assert!(kinds.contains(&EventKind::AllStoppedWithin));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn consumer_stops_infinite_pipeline() {
    let pipeline = Pipeline::new(PipelineConfig::default());

    let evens = pipeline
        .stage(MapFn::new("even", |x: u64| async move { x * 2 }))
        .fan_out(FanOutPolicy::exactly(3))
        .run(pipeline.generate("naturals", 0u64..));

    let got = sink::take(evens, 25, pipeline.signal()).await;
    assert_eq!(got.len(), 25);
    assert!(got.iter().all(|x| x % 2 == 0));
    assert!(pipeline.signal().is_closed());

    let report = pipeline.join().await.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.count_role(WorkerRole::Merger), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn grace_exceeded_names_stuck_workers() {
    let pipeline = Pipeline::new(PipelineConfig {
        buffer: 1,
        grace: Duration::from_millis(50),
        ..PipelineConfig::default()
    });

    // an iterator that blocks its thread cannot observe the signal
    let stubborn = (0u32..).map(|i| {
        if i > 0 {
            std::thread::sleep(Duration::from_millis(400));
        }
        i
    });
    let out = pipeline.generate("stubborn", stubborn);

    tokio::time::sleep(Duration::from_millis(50)).await;
    pipeline.cancel();
    drop(out);

    match pipeline.join().await {
        Err(PipelineError::GraceExceeded { grace, stuck }) => {
            assert_eq!(grace, Duration::from_millis(50));
            assert_eq!(stuck, vec!["stubborn/generator#0".to_string()]);
        }
        other => panic!("expected GraceExceeded, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stuck_run_is_reported_when_stage_runs_twice() {
    let pipeline = Pipeline::new(PipelineConfig {
        grace: Duration::from_millis(50),
        ..PipelineConfig::default()
    });

    // item 1 blocks its thread, so that replica cannot observe the signal
    let stage = pipeline.stage(MapFn::new("s", |x: u32| async move {
        if x == 1 {
            std::thread::sleep(Duration::from_millis(600));
        }
        x
    }));

    let _blocked = stage.run(pipeline.generate("slow", vec![1u32]));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let quick = stage.run(pipeline.generate("quick", vec![0u32]));
    assert_eq!(sink::collect(quick, pipeline.signal()).await, vec![0]);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // the quick run's exit must not hide the blocked run sharing its key
    assert_eq!(pipeline.alive_workers().await, vec!["s/replica#0".to_string()]);

    pipeline.cancel();
    match pipeline.join().await {
        Err(PipelineError::GraceExceeded { stuck, .. }) => {
            assert_eq!(stuck, vec!["s/replica#0".to_string()]);
        }
        other => panic!("expected GraceExceeded, got {other:?}"),
    }
}
