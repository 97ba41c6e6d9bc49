//! Handle to a unit of work submitted to the [`WorkerPool`](super::WorkerPool).
//!
//! The [`WorkHandle`] is returned by `submit`. It reports the unit's status,
//! waits for its outcome with a deadline, and requests cancellation.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use fanjoin::pool::{WorkOutcome, WorkerPool};
//!
//! let pool = WorkerPool::new(3);
//! let mut handle = pool.submit("f", async { 42 })?;
//!
//! match handle.await_with_timeout(Duration::from_secs(1)).await {
//!     WorkOutcome::Completed(v) => println!("got {}", v),
//!     WorkOutcome::TimedOut => handle.cancel(),
//!     other => println!("{}", other),
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Identifier of a unit of work, unique within its pool.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct WorkId {
    name: String,
    seq: u64,
}

impl WorkId {
    pub(crate) fn new(name: impl Into<String>, seq: u64) -> Self {
        Self {
            name: name.into(),
            seq,
        }
    }

    /// The name given at submission.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submission sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.seq)
    }
}

/// Lifecycle state of a unit of work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkStatus {
    /// Waiting for a free worker slot.
    #[default]
    Queued,
    /// Holding a slot and executing.
    Running,
    /// Finished and produced a value.
    Completed,
    /// Panicked while executing.
    Faulted,
    /// Cancelled before it produced a value.
    Cancelled,
}

impl WorkStatus {
    /// Returns true once the unit can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Faulted | Self::Cancelled)
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "Queued"),
            Self::Running => write!(f, "Running"),
            Self::Completed => write!(f, "Completed"),
            Self::Faulted => write!(f, "Faulted"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// What a caller observes when awaiting a unit of work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkOutcome<T> {
    /// The unit finished and produced a value.
    Completed(T),
    /// The deadline passed first. The unit keeps running until cancelled.
    TimedOut,
    /// The unit was cancelled, individually or by a forced shutdown.
    Cancelled,
    /// The unit panicked; carries the panic message.
    Faulted(String),
}

impl<T> fmt::Display for WorkOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(_) => write!(f, "completed"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Faulted(msg) => write!(f, "faulted: {}", msg),
        }
    }
}

/// Handle to a submitted unit of work.
pub struct WorkHandle<T> {
    id: WorkId,
    status: Arc<watch::Sender<WorkStatus>>,
    cancellation: CancellationToken,
    join: Option<JoinHandle<WorkOutcome<T>>>,
    resolved: Option<WorkOutcome<T>>,
}

impl<T: Clone> WorkHandle<T> {
    pub(crate) fn new(
        id: WorkId,
        status: Arc<watch::Sender<WorkStatus>>,
        cancellation: CancellationToken,
        join: JoinHandle<WorkOutcome<T>>,
    ) -> Self {
        Self {
            id,
            status,
            cancellation,
            join: Some(join),
            resolved: None,
        }
    }

    /// Returns the unit's identifier.
    pub fn id(&self) -> &WorkId {
        &self.id
    }

    /// Returns the current status without waiting.
    pub fn status(&self) -> WorkStatus {
        *self.status.borrow()
    }

    /// Requests cancellation.
    ///
    /// Best effort: a unit that already completed keeps its result and this
    /// is a no-op. Otherwise the status becomes `Cancelled` immediately and
    /// any later value the unit produces is discarded.
    pub fn cancel(&self) {
        self.cancellation.cancel();
        self.status.send_if_modified(|status| {
            if status.is_terminal() {
                false
            } else {
                *status = WorkStatus::Cancelled;
                true
            }
        });
    }

    /// Waits up to `timeout` for the unit to finish.
    ///
    /// A timed-out wait leaves the unit running; the caller decides whether
    /// to cancel it. Once resolved, later calls return the same outcome.
    pub async fn await_with_timeout(&mut self, timeout: Duration) -> WorkOutcome<T> {
        if let Some(done) = &self.resolved {
            return done.clone();
        }
        let Some(join) = self.join.as_mut() else {
            return WorkOutcome::Cancelled;
        };

        let outcome = match tokio::time::timeout(timeout, join).await {
            Err(_) => return WorkOutcome::TimedOut,
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) if e.is_cancelled() => WorkOutcome::Cancelled,
            Ok(Err(e)) => WorkOutcome::Faulted(e.to_string()),
        };

        self.join = None;
        self.resolved = Some(outcome.clone());
        outcome
    }
}

impl<T> fmt::Debug for WorkHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkHandle")
            .field("id", &self.id)
            .field("status", &*self.status.borrow())
            .finish()
    }
}
