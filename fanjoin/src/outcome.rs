//! Result types shared by the pool, cache and orchestrator.
//!
//! An [`Outcome`] is the immutable value produced by a sub-function or by a
//! combination. A [`CombinedResult`] wraps an outcome with the per-request
//! cache annotation and is built fresh for every caller, so the cached value
//! itself is never mutated.

use crate::monitor::FatalCondition;
use std::fmt;

/// Value produced by a sub-function or a combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The computation produced a value.
    Success(i64),
    /// The computation failed with a message.
    Failure(String),
}

impl Outcome {
    /// Creates a failure outcome from anything printable.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    /// Returns true if this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true if this is a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Returns the value of a success.
    pub fn value(&self) -> Option<i64> {
        match self {
            Self::Success(v) => Some(*v),
            Self::Failure(_) => None,
        }
    }

    /// Returns the message of a failure.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(msg) => Some(msg),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(v) => write!(f, "{}", v),
            Self::Failure(msg) => write!(f, "{}", msg),
        }
    }
}

/// Outcome delivered to one caller of `combine`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedResult {
    /// The (shared, immutable) combined outcome.
    pub outcome: Outcome,
    /// Whether this request was answered from the cache.
    pub served_from_cache: bool,
}

impl CombinedResult {
    /// Result for the request that performed the computation.
    pub fn computed(outcome: Outcome) -> Self {
        Self {
            outcome,
            served_from_cache: false,
        }
    }

    /// Result for a request answered from the cache.
    pub fn cached(outcome: Outcome) -> Self {
        Self {
            outcome,
            served_from_cache: true,
        }
    }
}

/// Identifies one of the two sub-functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// The first sub-function, always joined first.
    F,
    /// The second sub-function.
    G,
}

impl Branch {
    /// The other branch.
    pub fn sibling(self) -> Self {
        match self {
            Self::F => Self::G,
            Self::G => Self::F,
        }
    }

    /// Short label used in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::F => "F",
            Self::G => "G",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ways a combination can end without producing an [`Outcome`].
///
/// Per-input failures are data ([`Outcome::Failure`]); these are not.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CombineAbort {
    /// The error threshold tripped while this combination was running.
    #[error(transparent)]
    Fatal(#[from] FatalCondition),

    /// The pool refused the work because it is shutting down.
    #[error("worker pool is closed")]
    PoolClosed,

    /// The pool was force-stopped while this combination was waiting.
    #[error("computation cancelled")]
    Cancelled,
}
