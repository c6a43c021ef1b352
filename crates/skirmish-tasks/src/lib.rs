//! Bounded shared task pool for the Skirmish lobby.
//!
//! Two kinds of work run on the pool:
//!
//! - **Inbound**: handling one frame received from a client
//! - **Delivery**: sending one encoded notification to one recipient
//!
//! Both kinds share the same `workers` permits and have no ordering
//! relative to each other. Two frames from the same connection may be
//! handled in either order.
//!
//! # Integration
//!
//! ```ignore
//! let tasks = TaskScheduler::new(SchedulerConfig::default());
//! tasks.submit(TaskKind::Inbound, async move { dispatch(frame).await })?;
//! ```
//!
//! Submitted work always runs to completion; nothing is cancelled when the
//! connection it concerns goes away.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::{Notify, Semaphore};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the task pool.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of tasks running at once. Default: 64.
    pub workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { workers: 64 }
    }
}

impl SchedulerConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self { workers }
    }

    /// Fixes out-of-range values. A pool needs at least one worker.
    ///
    /// Called automatically by [`TaskScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.workers == 0 {
            warn!("workers is 0, using 1");
            self.workers = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskError {
    /// The scheduler was closed; no new work is accepted.
    #[error("task scheduler is closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// Kinds and metrics
// ---------------------------------------------------------------------------

/// What a submitted task does. Only used for accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Inbound,
    Delivery,
}

impl TaskKind {
    fn index(self) -> usize {
        match self {
            Self::Inbound => 0,
            Self::Delivery => 1,
        }
    }
}

/// Counters for one [`TaskKind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindMetrics {
    pub submitted: u64,
    /// Tasks that finished, including ones that panicked or were dropped
    /// because the scheduler closed before they got a worker.
    pub completed: u64,
}

/// Point-in-time counters, returned by [`TaskScheduler::metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskMetrics {
    pub inbound: KindMetrics,
    pub delivery: KindMetrics,
    /// Submitted but not yet finished (queued or running).
    pub in_flight: usize,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
}

impl Counters {
    fn load(&self) -> KindMetrics {
        KindMetrics {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Inner {
    workers: usize,
    permits: Arc<Semaphore>,
    in_flight: AtomicUsize,
    idle: Notify,
    counters: [Counters; 2],
}

/// The shared pool. Cheap to clone; clones share the same permits.
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    inner: Arc<Inner>,
}

/// Accounts for a task when it finishes, however it finishes.
struct Completion {
    inner: Arc<Inner>,
    kind: TaskKind,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.inner.counters[self.kind.index()]
            .completed
            .fetch_add(1, Ordering::Relaxed);
        if self.inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

impl TaskScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let config = config.validated();
        debug!(workers = config.workers, "task scheduler created");
        Self {
            inner: Arc::new(Inner {
                workers: config.workers,
                permits: Arc::new(Semaphore::new(config.workers)),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
                counters: Default::default(),
            }),
        }
    }

    /// Queues `work` on the pool. It starts as soon as a worker is free.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// [`TaskError::Closed`] after [`close`](Self::close).
    pub fn submit<F>(&self, kind: TaskKind, work: F) -> Result<(), TaskError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.inner.permits.is_closed() {
            return Err(TaskError::Closed);
        }
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        self.inner.counters[kind.index()]
            .submitted
            .fetch_add(1, Ordering::Relaxed);

        let completion = Completion {
            inner: Arc::clone(&self.inner),
            kind,
        };
        let permits = Arc::clone(&self.inner.permits);
        tokio::spawn(async move {
            let _completion = completion;
            let Ok(_permit) = permits.acquire_owned().await else {
                trace!(?kind, "scheduler closed before task started");
                return;
            };
            work.await;
        });
        Ok(())
    }

    /// Stops accepting work. Tasks already running finish; queued tasks
    /// that have not started are dropped.
    pub fn close(&self) {
        self.inner.permits.close();
        debug!("task scheduler closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.permits.is_closed()
    }

    /// Maximum concurrent tasks.
    pub fn workers(&self) -> usize {
        self.inner.workers
    }

    /// Tasks submitted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> TaskMetrics {
        TaskMetrics {
            inbound: self.inner.counters[TaskKind::Inbound.index()].load(),
            delivery: self.inner.counters[TaskKind::Delivery.index()].load(),
            in_flight: self.in_flight(),
        }
    }

    /// Resolves once no task is in flight.
    ///
    /// Work submitted by running tasks (a handler scheduling deliveries)
    /// keeps the pool busy, so this waits for the whole cascade.
    pub async fn wait_idle(&self) {
        loop {
            let idle = self.inner.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
