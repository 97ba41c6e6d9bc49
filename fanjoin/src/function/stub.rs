//! Deterministic sub-functions for tests and embedding.

use super::SlowFunction;
use crate::outcome::Outcome;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Returns the same outcome after the same delay for every input.
#[derive(Debug)]
pub struct FixedFunction {
    name: String,
    outcome: Outcome,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl FixedFunction {
    /// Creates a function that always returns `outcome` without delay.
    pub fn new(name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            outcome,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sets the delay before the outcome is returned.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times `compute` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared call counter, usable after the function is moved into an `Arc`.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl SlowFunction for FixedFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, _x: i64) -> BoxFuture<'static, Outcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome.clone();
        let delay = self.delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            outcome
        }
        .boxed()
    }
}

/// Wraps a closure producing a future per input.
pub struct FnFunction<C> {
    name: String,
    f: C,
}

impl<C> FnFunction<C>
where
    C: Fn(i64) -> BoxFuture<'static, Outcome> + Send + Sync,
{
    /// Creates a function from a closure.
    pub fn new(name: impl Into<String>, f: C) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<C> SlowFunction for FnFunction<C>
where
    C: Fn(i64) -> BoxFuture<'static, Outcome> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, x: i64) -> BoxFuture<'static, Outcome> {
        (self.f)(x)
    }
}
