use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use telemetry_hub::{RuntimeError, Supervisor, WorkerError, WorkerSpec};

fn supervisor() -> Supervisor {
    Supervisor::new(Duration::from_millis(20), Duration::from_millis(500))
}

#[tokio::test]
async fn clean_exits_end_the_group_without_shutdown() {
    let specs = vec![
        WorkerSpec::new("one", |_token| async { Ok(()) }),
        WorkerSpec::new("two", |_token| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(())
        }),
    ];
    let result = supervisor().run(specs, CancellationToken::new()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn clean_exit_does_not_take_down_the_rest() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    let specs = vec![
        WorkerSpec::new("oneshot", |_token| async { Ok(()) }),
        WorkerSpec::new("steady", move |_token| async move {
            // Keeps running well past the oneshot's exit.
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }),
    ];
    let result = supervisor().run(specs, CancellationToken::new()).await;
    assert!(result.is_ok());
    assert!(
        finished.load(Ordering::SeqCst),
        "surviving worker must run to completion"
    );
}

#[tokio::test]
async fn worker_failure_shuts_down_the_group() {
    let observed = Arc::new(AtomicBool::new(false));
    let flag = observed.clone();
    let specs = vec![
        WorkerSpec::new("faulty", |_token| async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Err(WorkerError::Fatal("sensor bus wedged".to_string()))
        }),
        WorkerSpec::new("steady", move |token| async move {
            token.cancelled().await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }),
    ];
    let result = supervisor().run(specs, CancellationToken::new()).await;
    match result {
        Err(RuntimeError::WorkerFailed { name, .. }) => assert_eq!(name, "faulty"),
        other => panic!("expected worker failure, got {other:?}"),
    }
    assert!(
        observed.load(Ordering::SeqCst),
        "surviving worker must see the stop signal"
    );
}

#[tokio::test]
async fn worker_panic_is_a_failure() {
    let specs = vec![
        WorkerSpec::new("panicky", |_token| async { panic!("unhandled") }),
        WorkerSpec::new("steady", |token| async move {
            token.cancelled().await;
            Ok(())
        }),
    ];
    let result = supervisor().run(specs, CancellationToken::new()).await;
    assert!(matches!(result, Err(RuntimeError::WorkerFailed { .. })));
}

#[tokio::test]
async fn external_shutdown_stops_cooperative_workers_cleanly() {
    let specs = vec![
        WorkerSpec::new("a", |token| async move {
            token.cancelled().await;
            Ok(())
        }),
        WorkerSpec::new("b", |token| async move {
            token.cancelled().await;
            Ok(())
        }),
    ];
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });
    let result = supervisor().run(specs, shutdown).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn stubborn_worker_is_force_terminated_within_grace() {
    let specs = vec![WorkerSpec::new("stubborn", |_token| async {
        // Ignores the stop signal entirely.
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    })];
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = Supervisor::new(Duration::from_millis(20), Duration::from_millis(200))
        .run(specs, shutdown)
        .await;
    match result {
        Err(RuntimeError::GraceExceeded { stuck, .. }) => {
            assert_eq!(stuck, vec!["stubborn".to_string()]);
        }
        other => panic!("expected grace overrun, got {other:?}"),
    }
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "forced termination must fire shortly after the grace period"
    );
}
