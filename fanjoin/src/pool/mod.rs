//! Bounded worker pool with cooperative cancellation.
//!
//! # Architecture
//!
//! ```text
//! submit(name, future) ──► tokio task ──► wait for slot ──► run ──► WorkOutcome
//!        │                     ▲                 ▲
//!        ▼                     │                 │
//!   WorkHandle ── cancel() ────┘   shutdown_now() (pool token)
//! ```
//!
//! - [`WorkerPool`]: fixed number of slots, queueing beyond capacity, graceful
//!   and forced shutdown with an explicit closed state.
//! - [`WorkHandle`]: status queries, deadline waits and cancellation for one
//!   unit of work.

mod handle;
mod worker;

pub use handle::{WorkHandle, WorkId, WorkOutcome, WorkStatus};
pub use worker::{PoolStats, WorkerPool, DEFAULT_WORKERS};

use thiserror::Error;

/// Errors returned by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool has been shut down and accepts no more work.
    #[error("worker pool is closed")]
    Closed,
}
