//! Fixed-width worker pool.
//!
//! Each submitted unit becomes a tokio task that must hold one of `workers`
//! semaphore permits while it executes, so at most `workers` units run at
//! once and the rest queue. Every unit carries a child of the pool's
//! cancellation token, which gives per-unit `cancel` and pool-wide
//! `shutdown_now` the same mechanism.

use super::handle::{WorkHandle, WorkId, WorkOutcome, WorkStatus};
use super::PoolError;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Worker count used by the command-line driver.
pub const DEFAULT_WORKERS: usize = 3;

/// Point-in-time pool statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker slots.
    pub workers: usize,
    /// Units accepted since the pool was created.
    pub submitted: u64,
    /// Units that produced a value.
    pub completed: u64,
    /// Units that ended cancelled.
    pub cancelled: u64,
    /// Units that panicked.
    pub faulted: u64,
    /// Units not yet finished (queued or running).
    pub in_flight: usize,
    /// Highest number of units running at once.
    pub peak_running: usize,
    /// Whether the pool refuses new work.
    pub closed: bool,
}

struct PoolShared {
    workers: usize,
    slots: Arc<Semaphore>,
    shutdown: CancellationToken,
    closed: AtomicBool,
    in_flight: watch::Sender<usize>,
    next_seq: AtomicU64,
    running: AtomicUsize,
    peak_running: AtomicUsize,
    submitted: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
    faulted: AtomicU64,
}

impl PoolShared {
    fn record(&self, outcome: &WorkOutcomeKind) {
        let counter = match outcome {
            WorkOutcomeKind::Completed => &self.completed,
            WorkOutcomeKind::Cancelled => &self.cancelled,
            WorkOutcomeKind::Faulted => &self.faulted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn mark_running(&self) {
        let current = self.running.fetch_add(1, Ordering::Relaxed) + 1;
        let mut peak = self.peak_running.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_running.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }
}

enum WorkOutcomeKind {
    Completed,
    Cancelled,
    Faulted,
}

/// Decrements the in-flight count when a unit's task ends, however it ends.
struct InFlightGuard(Arc<PoolShared>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// A fixed number of execution slots with queueing and cooperative
/// cancellation.
///
/// Cloning yields another handle to the same pool.
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Creates a pool with `workers` slots (at least one).
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (in_flight, _) = watch::channel(0);
        debug!(workers, "Worker pool created");
        Self {
            shared: Arc::new(PoolShared {
                workers,
                slots: Arc::new(Semaphore::new(workers)),
                shutdown: CancellationToken::new(),
                closed: AtomicBool::new(false),
                in_flight,
                next_seq: AtomicU64::new(0),
                running: AtomicUsize::new(0),
                peak_running: AtomicUsize::new(0),
                submitted: AtomicU64::new(0),
                completed: AtomicU64::new(0),
                cancelled: AtomicU64::new(0),
                faulted: AtomicU64::new(0),
            }),
        }
    }

    /// Number of worker slots.
    pub fn workers(&self) -> usize {
        self.shared.workers
    }

    /// Submits a unit of work.
    ///
    /// The unit queues until a slot is free. Fails with [`PoolError::Closed`]
    /// once either shutdown mode has been requested.
    pub fn submit<T, Fut>(
        &self,
        name: impl Into<String>,
        work: Fut,
    ) -> Result<WorkHandle<T>, PoolError>
    where
        T: Clone + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let name = name.into();
        if self.is_closed() {
            debug!(work = %name, "Submission refused, pool closed");
            return Err(PoolError::Closed);
        }

        let seq = self.shared.next_seq.fetch_add(1, Ordering::Relaxed);
        let id = WorkId::new(name, seq);
        let token = self.shared.shutdown.child_token();
        let (status_tx, _) = watch::channel(WorkStatus::Queued);
        let status = Arc::new(status_tx);

        self.shared.submitted.fetch_add(1, Ordering::Relaxed);
        self.shared.in_flight.send_modify(|n| *n += 1);

        let join = tokio::spawn(run_unit(
            Arc::clone(&self.shared),
            id.clone(),
            Arc::clone(&status),
            token.clone(),
            work,
        ));

        Ok(WorkHandle::new(id, status, token, join))
    }

    /// Graceful shutdown: queued and running work finishes, new work is
    /// refused.
    pub fn shutdown(&self) {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            info!(in_flight = self.in_flight(), "Worker pool shutting down");
        }
    }

    /// Forced shutdown: running work is cancelled, queued work is dropped
    /// without running, new work is refused.
    pub fn shutdown_now(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        if !self.shared.shutdown.is_cancelled() {
            warn!(in_flight = self.in_flight(), "Worker pool force-stopped");
            self.shared.shutdown.cancel();
        }
    }

    /// Returns true once either shutdown mode was requested.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Number of units queued or running.
    pub fn in_flight(&self) -> usize {
        *self.shared.in_flight.borrow()
    }

    /// Returns true when the pool is closed and every unit has finished.
    pub fn is_terminated(&self) -> bool {
        self.is_closed() && self.in_flight() == 0
    }

    /// Waits until the pool is closed and drained.
    ///
    /// Returns false if the pool is still open or the wait timed out.
    pub async fn await_termination(&self, timeout: Duration) -> bool {
        if !self.is_closed() {
            return false;
        }
        let mut rx = self.shared.in_flight.subscribe();
        tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0))
            .await
            .is_ok_and(|r| r.is_ok())
    }

    /// Returns a statistics snapshot.
    pub fn stats(&self) -> PoolStats {
        let s = &self.shared;
        PoolStats {
            workers: s.workers,
            submitted: s.submitted.load(Ordering::Relaxed),
            completed: s.completed.load(Ordering::Relaxed),
            cancelled: s.cancelled.load(Ordering::Relaxed),
            faulted: s.faulted.load(Ordering::Relaxed),
            in_flight: self.in_flight(),
            peak_running: s.peak_running.load(Ordering::Relaxed),
            closed: self.is_closed(),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.shared.workers)
            .field("in_flight", &self.in_flight())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Body of the tokio task behind one unit of work.
async fn run_unit<T, Fut>(
    shared: Arc<PoolShared>,
    id: WorkId,
    status: Arc<watch::Sender<WorkStatus>>,
    token: CancellationToken,
    work: Fut,
) -> WorkOutcome<T>
where
    Fut: Future<Output = T> + Send + 'static,
{
    let _guard = InFlightGuard(Arc::clone(&shared));

    let permit = tokio::select! {
        biased;
        _ = token.cancelled() => None,
        permit = Arc::clone(&shared.slots).acquire_owned() => permit.ok(),
    };
    let Some(permit) = permit else {
        debug!(work = %id, "Dropped before a slot was free");
        return settle(&shared, &id, &status, WorkOutcome::Cancelled);
    };

    let started = status.send_if_modified(|s| {
        if *s == WorkStatus::Queued {
            *s = WorkStatus::Running;
            true
        } else {
            false
        }
    });
    if !started {
        return settle(&shared, &id, &status, WorkOutcome::Cancelled);
    }

    shared.mark_running();
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => WorkOutcome::Cancelled,
        result = AssertUnwindSafe(work).catch_unwind() => match result {
            Ok(value) => WorkOutcome::Completed(value),
            Err(panic) => WorkOutcome::Faulted(panic_message(panic.as_ref())),
        },
    };
    shared.running.fetch_sub(1, Ordering::Relaxed);
    drop(permit);

    settle(&shared, &id, &status, outcome)
}

/// Publishes the terminal status. A unit cancelled through its handle while
/// finishing reports `Cancelled` and its value is discarded.
fn settle<T>(
    shared: &PoolShared,
    id: &WorkId,
    status: &watch::Sender<WorkStatus>,
    outcome: WorkOutcome<T>,
) -> WorkOutcome<T> {
    let terminal = match &outcome {
        WorkOutcome::Completed(_) => WorkStatus::Completed,
        WorkOutcome::Faulted(_) => WorkStatus::Faulted,
        WorkOutcome::Cancelled | WorkOutcome::TimedOut => WorkStatus::Cancelled,
    };
    let applied = status.send_if_modified(|s| {
        if s.is_terminal() {
            false
        } else {
            *s = terminal;
            true
        }
    });

    let outcome = if applied { outcome } else { WorkOutcome::Cancelled };
    let kind = match &outcome {
        WorkOutcome::Completed(_) => WorkOutcomeKind::Completed,
        WorkOutcome::Faulted(msg) => {
            warn!(work = %id, error = %msg, "Unit of work panicked");
            WorkOutcomeKind::Faulted
        }
        WorkOutcome::Cancelled | WorkOutcome::TimedOut => WorkOutcomeKind::Cancelled,
    };
    shared.record(&kind);
    outcome
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
