//! Task runner behaviour under a paused tokio clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use stepmcp_core::{
    ErrorKind, McpError, McpResult, Progress, ProgressNotification, ServerNotification,
    channel_sink,
};
use stepmcp_server::{
    RunnerConfig, StepFn, StepPlan, StepWork, TaskRunner, TaskStatus,
    UNSUPPORTED_PROGRESS_RESPONSE,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

const DELAY: Duration = Duration::from_millis(500);

fn runner() -> TaskRunner {
    TaskRunner::new(&RunnerConfig::default())
}

fn tracked(token: &str) -> (Progress, mpsc::Receiver<ServerNotification>) {
    let (sink, rx) = channel_sink(64);
    (Progress::new(Some(token.into()), Some(Arc::new(sink))), rx)
}

fn drain_progress(rx: &mut mpsc::Receiver<ServerNotification>) -> Vec<ProgressNotification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        if let ServerNotification::Progress(p) = notification {
            out.push(p);
        }
    }
    out
}

fn counting_work(counter: &Arc<AtomicUsize>) -> impl StepWork<Output = String> {
    let counter = Arc::clone(counter);
    StepFn::new(
        move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), McpError>(())
            }
        },
        "ok".to_string(),
    )
}

fn ten_steps() -> StepPlan {
    StepPlan::new(10)
        .step_delay(DELAY)
        .message(|i| format!("Long running progress: {}", i))
}

#[tokio::test(start_paused = true)]
async fn unsupported_progress_completes_without_running_work() {
    let counter = Arc::new(AtomicUsize::new(0));
    let started = Instant::now();

    let handle = runner()
        .submit(&Progress::unsupported(), ten_steps(), counting_work(&counter))
        .unwrap();

    assert!(handle.is_finished());
    assert_eq!(handle.status(), TaskStatus::Completed);
    assert_eq!(handle.await.unwrap(), UNSUPPORTED_PROGRESS_RESPONSE);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn ten_steps_report_ordered_progress() {
    let counter = Arc::new(AtomicUsize::new(0));
    let (progress, mut rx) = tracked("long-1");
    let started = Instant::now();

    let handle = runner()
        .submit(&progress, ten_steps(), counting_work(&counter))
        .unwrap();
    assert!(!handle.is_finished());

    assert_eq!(handle.clone().await.unwrap(), "ok");
    assert_eq!(handle.status(), TaskStatus::Completed);
    assert_eq!(counter.load(Ordering::SeqCst), 10);
    assert!(started.elapsed() >= DELAY * 10);

    let updates = drain_progress(&mut rx);
    assert_eq!(updates.len(), 10);
    for (i, update) in updates.iter().enumerate() {
        let step = i as u64 + 1;
        assert_eq!(update.progress, step as f64);
        assert_eq!(update.total, Some(10.0));
        assert_eq!(
            update.message.as_deref(),
            Some(format!("Long running progress: {}", step).as_str())
        );
    }
}

#[tokio::test(start_paused = true)]
async fn zero_steps_finish_without_notifications() {
    let counter = Arc::new(AtomicUsize::new(0));
    let (progress, mut rx) = tracked("empty");

    let handle = runner()
        .submit(&progress, StepPlan::new(0).step_delay(DELAY), counting_work(&counter))
        .unwrap();

    assert_eq!(handle.await.unwrap(), "ok");
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(drain_progress(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_run_fails_with_cancelled() {
    let counter = Arc::new(AtomicUsize::new(0));
    let (progress, mut rx) = tracked("cancel-me");

    let handle = runner()
        .submit(&progress, ten_steps(), counting_work(&counter))
        .unwrap();

    tokio::time::sleep(DELAY * 2 + DELAY / 2).await;
    handle.cancel();

    let err = handle.clone().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert_eq!(handle.status(), TaskStatus::Failed);

    let sent = drain_progress(&mut rx).len();
    assert!(sent < 10, "expected fewer than 10 notifications, got {}", sent);
    assert_eq!(sent, counter.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_and_refuses_new_work() {
    let runner = runner();
    let counter = Arc::new(AtomicUsize::new(0));
    let (progress, _rx) = tracked("shutdown");

    let handle = runner
        .submit(&progress, ten_steps(), counting_work(&counter))
        .unwrap();
    runner.shutdown();

    assert_eq!(handle.await.unwrap_err().kind, ErrorKind::Cancelled);
    let err = runner
        .submit(&progress, ten_steps(), counting_work(&counter))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn panicking_step_fails_the_handle() {
    let (progress, mut rx) = tracked("panics");
    let work = StepFn::new(
        |i| async move {
            if i == 3 {
                panic!("step {} exploded", i);
            }
            Ok::<(), McpError>(())
        },
        "ok".to_string(),
    );

    let handle = runner().submit(&progress, ten_steps(), work).unwrap();
    let err = handle.clone().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Internal);
    assert!(err.message.contains("step 3 exploded"), "{}", err.message);
    assert_eq!(handle.status(), TaskStatus::Failed);
    assert_eq!(drain_progress(&mut rx).len(), 2);
}

struct FailsAt(u64);

#[async_trait::async_trait]
impl StepWork for FailsAt {
    type Output = String;

    async fn step(&mut self, index: u64) -> McpResult<()> {
        if index == self.0 {
            return Err(McpError::tool_execution_failed("fails", format!("step {}", index)));
        }
        Ok(())
    }

    async fn finish(self) -> McpResult<String> {
        Ok("unreachable".to_string())
    }
}

#[tokio::test(start_paused = true)]
async fn step_error_stops_remaining_steps() {
    let (progress, mut rx) = tracked("fails");
    let handle = runner().submit(&progress, ten_steps(), FailsAt(4)).unwrap();

    let err = handle.await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ToolExecutionFailed);
    assert_eq!(drain_progress(&mut rx).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn admission_limit_rejects_overflow() {
    let runner = TaskRunner::new(&RunnerConfig {
        max_concurrent_tasks: 1,
        max_pending_tasks: 2,
    });
    let counter = Arc::new(AtomicUsize::new(0));
    let (progress, _rx) = tracked("busy");

    let first = runner.submit(&progress, ten_steps(), counting_work(&counter)).unwrap();
    let second = runner.submit(&progress, ten_steps(), counting_work(&counter)).unwrap();
    assert_eq!(runner.active_tasks(), 2);

    let err = runner
        .submit(&progress, ten_steps(), counting_work(&counter))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServerOverloaded);
    assert_eq!(runner.active_tasks(), 2);

    // The queued task never gets a permit before it is cancelled.
    second.cancel();
    assert_eq!(second.await.unwrap_err().kind, ErrorKind::Cancelled);
    assert_eq!(runner.active_tasks(), 1);

    assert_eq!(first.await.unwrap(), "ok");
    assert_eq!(runner.active_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn finished_tasks_release_capacity_before_waiters_resume() {
    let runner = TaskRunner::new(&RunnerConfig {
        max_concurrent_tasks: 1,
        max_pending_tasks: 1,
    });
    let (progress, _rx) = tracked("release");

    let ok = runner
        .submit(
            &progress,
            StepPlan::new(1),
            StepFn::new(|_| async { Ok::<(), McpError>(()) }, "ok".to_string()),
        )
        .unwrap();
    assert_eq!(ok.await.unwrap(), "ok");
    assert_eq!(runner.active_tasks(), 0);

    let failing = runner.submit(&progress, StepPlan::new(2), FailsAt(1)).unwrap();
    assert_eq!(failing.await.unwrap_err().kind, ErrorKind::ToolExecutionFailed);
    assert_eq!(runner.active_tasks(), 0);

    let panics = runner
        .submit(
            &progress,
            StepPlan::new(1),
            StepFn::new(
                |i| async move {
                    if i == 1 {
                        panic!("boom");
                    }
                    Ok::<(), McpError>(())
                },
                "ok".to_string(),
            ),
        )
        .unwrap();
    assert_eq!(panics.await.unwrap_err().kind, ErrorKind::Internal);
    assert_eq!(runner.active_tasks(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sequential_submissions_fit_a_single_slot() {
    let runner = TaskRunner::new(&RunnerConfig {
        max_concurrent_tasks: 1,
        max_pending_tasks: 1,
    });
    let (sink, _rx) = channel_sink(1);
    let progress = Progress::new(Some("sequential".into()), Some(Arc::new(sink)));
    let counter = Arc::new(AtomicUsize::new(0));

    for round in 0..2_000 {
        let handle = runner
            .submit(&progress, StepPlan::new(1), counting_work(&counter))
            .unwrap_or_else(|e| panic!("round {} rejected: {}", round, e));
        assert_eq!(handle.await.unwrap(), "ok");
    }
    assert_eq!(counter.load(Ordering::SeqCst), 2_000);
    assert_eq!(runner.active_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrency_never_exceeds_pool_size() {
    let runner = TaskRunner::new(&RunnerConfig {
        max_concurrent_tasks: 2,
        max_pending_tasks: 8,
    });
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (progress, _rx) = tracked("pool");

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            let work = StepFn::new(
                move |_| {
                    let in_flight = Arc::clone(&in_flight);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<(), McpError>(())
                    }
                },
                "ok".to_string(),
            );
            runner
                .submit(&progress, StepPlan::new(3).step_delay(Duration::from_millis(10)), work)
                .unwrap()
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), "ok");
    }
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}
