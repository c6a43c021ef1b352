//! Integration tests for the shared task pool.
//!
//! Time is paused so sleeps inside tasks resolve as soon as the runtime
//! is otherwise idle.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use skirmish_tasks::{KindMetrics, SchedulerConfig, TaskError, TaskKind, TaskScheduler};

// =========================================================================
// Helpers
// =========================================================================

/// Tracks how many tasks run at once and the highest value seen.
#[derive(Default)]
struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
    done: AtomicUsize,
}

impl Gauge {
    async fn occupy(&self, hold: Duration) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(hold).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.done.fetch_add(1, Ordering::SeqCst);
    }
}

// =========================================================================
// Bounded concurrency
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_no_more_than_workers_tasks_run_at_once() {
    let tasks = TaskScheduler::new(SchedulerConfig::with_workers(2));
    let gauge = Arc::new(Gauge::default());

    for _ in 0..6 {
        let gauge = Arc::clone(&gauge);
        tasks
            .submit(TaskKind::Inbound, async move {
                gauge.occupy(Duration::from_millis(10)).await;
            })
            .unwrap();
    }
    tasks.wait_idle().await;

    assert_eq!(gauge.done.load(Ordering::SeqCst), 6);
    assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_both_kinds_share_the_same_permits() {
    let tasks = TaskScheduler::new(SchedulerConfig::with_workers(3));
    let gauge = Arc::new(Gauge::default());

    for i in 0..8 {
        let gauge = Arc::clone(&gauge);
        let kind = if i % 2 == 0 {
            TaskKind::Inbound
        } else {
            TaskKind::Delivery
        };
        tasks
            .submit(kind, async move {
                gauge.occupy(Duration::from_millis(5)).await;
            })
            .unwrap();
    }
    tasks.wait_idle().await;

    assert!(gauge.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(gauge.done.load(Ordering::SeqCst), 8);
}

// =========================================================================
// Accounting
// =========================================================================

#[tokio::test]
async fn test_metrics_count_per_kind() {
    let tasks = TaskScheduler::new(SchedulerConfig::with_workers(4));
    for _ in 0..3 {
        tasks.submit(TaskKind::Inbound, async {}).unwrap();
    }
    tasks.submit(TaskKind::Delivery, async {}).unwrap();
    tasks.wait_idle().await;

    let m = tasks.metrics();
    assert_eq!(
        m.inbound,
        KindMetrics {
            submitted: 3,
            completed: 3
        }
    );
    assert_eq!(
        m.delivery,
        KindMetrics {
            submitted: 1,
            completed: 1
        }
    );
    assert_eq!(m.in_flight, 0);
}

#[tokio::test]
async fn test_wait_idle_returns_immediately_when_empty() {
    let tasks = TaskScheduler::default();
    tasks.wait_idle().await;
    assert_eq!(tasks.in_flight(), 0);
    assert_eq!(tasks.workers(), 64);
}

#[tokio::test(start_paused = true)]
async fn test_wait_idle_covers_work_submitted_by_running_tasks() {
    let tasks = TaskScheduler::new(SchedulerConfig::with_workers(1));
    let delivered = Arc::new(AtomicUsize::new(0));

    let inner_tasks = tasks.clone();
    let counter = Arc::clone(&delivered);
    tasks
        .submit(TaskKind::Inbound, async move {
            for _ in 0..3 {
                let counter = Arc::clone(&counter);
                inner_tasks
                    .submit(TaskKind::Delivery, async move {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
            }
        })
        .unwrap();
    tasks.wait_idle().await;

    assert_eq!(delivered.load(Ordering::SeqCst), 3);
    assert_eq!(tasks.metrics().delivery.completed, 3);
}

#[tokio::test]
async fn test_panicking_task_still_completes_accounting() {
    let tasks = TaskScheduler::new(SchedulerConfig::with_workers(1));
    tasks
        .submit(TaskKind::Inbound, async { panic!("handler bug") })
        .unwrap();
    tasks.submit(TaskKind::Inbound, async {}).unwrap();
    tasks.wait_idle().await;

    assert_eq!(tasks.metrics().inbound.completed, 2);
}

// =========================================================================
// Closing
// =========================================================================

#[tokio::test]
async fn test_submit_after_close_is_refused() {
    let tasks = TaskScheduler::default();
    tasks.close();
    assert!(tasks.is_closed());
    assert_eq!(
        tasks.submit(TaskKind::Delivery, async {}),
        Err(TaskError::Closed)
    );
    assert_eq!(tasks.in_flight(), 0);
}
