//! Fan-out / join of the two sub-functions for one input.
//!
//! # Protocol (cache miss)
//!
//! ```text
//! submit F(x) ─┐
//! submit G(x) ─┤  both launched at once, joined in fixed order
//!              ▼
//!     await F (deadline) ── timeout ──► cancel F, G ──► Failure("timeout in F")
//!              │ ── failure ──► cancel G ──────────────► F's failure
//!              │ ── fault ────► cancel G ──────────────► Failure(panic text)
//!              ▼ success
//!     await G (deadline) ── timeout ──► cancel G, F ──► Failure("timeout in G")
//!              │ ── failure ──► G's failure
//!              ▼ success
//!     Success(F + G)
//! ```
//!
//! After every observed sub-result the error threshold is checked before the
//! result is used; a trip aborts the combination in place with
//! [`CombineAbort::Fatal`].

use crate::cache::{CachedValue, ResultCache};
use crate::function::SlowFunction;
use crate::monitor::{Counters, ErrorThresholdMonitor, ThresholdConfig};
use crate::notify::Notifier;
use crate::outcome::{Branch, CombineAbort, CombinedResult, Outcome};
use crate::pool::{WorkHandle, WorkOutcome, WorkerPool};
use futures::FutureExt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-sub-function deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Orchestrator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombineConfig {
    /// Deadline applied to each sub-function join.
    pub timeout: Duration,
    /// Circuit breaker policy.
    pub threshold: ThresholdConfig,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            threshold: ThresholdConfig::default(),
        }
    }
}

/// How one branch's join ended, when it did not abort.
enum Joined {
    Value(i64),
    Failed(Outcome),
}

/// Computes `F(x) + G(x)` through the worker pool, memoized per input.
pub struct CombineOrchestrator {
    f: Arc<dyn SlowFunction>,
    g: Arc<dyn SlowFunction>,
    pool: RwLock<WorkerPool>,
    cache: ResultCache,
    monitor: ErrorThresholdMonitor,
    notifier: Arc<Notifier>,
    timeout: Duration,
}

impl CombineOrchestrator {
    /// Creates an orchestrator with fresh counters and an empty cache.
    pub fn new(
        f: Arc<dyn SlowFunction>,
        g: Arc<dyn SlowFunction>,
        pool: WorkerPool,
        notifier: Arc<Notifier>,
        config: CombineConfig,
    ) -> Self {
        Self {
            f,
            g,
            pool: RwLock::new(pool),
            cache: ResultCache::new(),
            monitor: ErrorThresholdMonitor::new(config.threshold, Arc::new(Counters::new())),
            notifier,
            timeout: config.timeout,
        }
    }

    /// Returns the combined result for `x`.
    ///
    /// Repeated inputs are served from the cache. Sub-function failures and
    /// timeouts come back as `Ok` with a failure outcome; only a tripped
    /// threshold, a closed pool or a forced cancel produce `Err`.
    pub async fn combine(self: &Arc<Self>, x: i64) -> Result<CombinedResult, CombineAbort> {
        if self.monitor.is_tripped() {
            self.monitor.check()?;
        }

        let this = Arc::clone(self);
        let result = self
            .cache
            .get_or_compute(x, move || async move { this.compute(x).await }.boxed())
            .await?;

        self.monitor
            .counters()
            .record_combination(result.outcome.is_failure());
        debug!(
            x,
            outcome = %result.outcome,
            cached = result.served_from_cache,
            "Combination complete"
        );
        Ok(result)
    }

    /// The fan-out / join protocol for a cache miss.
    async fn compute(&self, x: i64) -> CachedValue {
        let pool = self.pool();

        let mut f = pool
            .submit(work_name(&*self.f, x), self.f.compute(x))
            .map_err(|_| CombineAbort::PoolClosed)?;
        let mut g = match pool.submit(work_name(&*self.g, x), self.g.compute(x)) {
            Ok(handle) => handle,
            Err(_) => {
                f.cancel();
                return Err(CombineAbort::PoolClosed);
            }
        };

        let f_value = match self.join(Branch::F, x, &mut f, &g).await? {
            Joined::Value(v) => v,
            Joined::Failed(outcome) => return Ok(outcome),
        };
        let g_value = match self.join(Branch::G, x, &mut g, &f).await? {
            Joined::Value(v) => v,
            Joined::Failed(outcome) => return Ok(outcome),
        };

        Ok(match f_value.checked_add(g_value) {
            Some(sum) => Outcome::Success(sum),
            None => Outcome::failure(format!("sum of {} and {} overflows", f_value, g_value)),
        })
    }

    /// Joins one branch and applies the timeout / cancellation policy.
    async fn join(
        &self,
        branch: Branch,
        x: i64,
        handle: &mut WorkHandle<Outcome>,
        sibling: &WorkHandle<Outcome>,
    ) -> Result<Joined, CombineAbort> {
        match handle.await_with_timeout(self.timeout).await {
            WorkOutcome::Completed(outcome) => {
                match &outcome {
                    Outcome::Success(v) => {
                        self.monitor.record_success(branch);
                        self.notifier
                            .message(format_args!("{}(x = {}) = {}", branch, x, v));
                    }
                    Outcome::Failure(msg) => {
                        self.monitor.record_failure(branch);
                        self.notifier
                            .message(format_args!("{}(x = {}) failed: {}", branch, x, msg));
                    }
                }
                self.guard_threshold(handle, sibling)?;

                match outcome {
                    Outcome::Success(v) => Ok(Joined::Value(v)),
                    failure => {
                        sibling.cancel();
                        Ok(Joined::Failed(failure))
                    }
                }
            }
            WorkOutcome::TimedOut => {
                handle.cancel();
                sibling.cancel();
                warn!(branch = %branch, x, timeout_ms = self.timeout.as_millis() as u64, "Sub-function timed out");
                Ok(Joined::Failed(Outcome::failure(format!("timeout in {}", branch))))
            }
            WorkOutcome::Faulted(msg) => {
                sibling.cancel();
                self.monitor.record_failure(branch);
                warn!(branch = %branch, x, error = %msg, "Sub-function faulted");
                self.guard_threshold(handle, sibling)?;
                Ok(Joined::Failed(Outcome::Failure(msg)))
            }
            WorkOutcome::Cancelled => {
                sibling.cancel();
                debug!(branch = %branch, x, "Sub-function cancelled");
                Err(CombineAbort::Cancelled)
            }
        }
    }

    /// Aborts the combination in place if the threshold has been crossed.
    fn guard_threshold(
        &self,
        handle: &WorkHandle<Outcome>,
        sibling: &WorkHandle<Outcome>,
    ) -> Result<(), CombineAbort> {
        if let Err(fatal) = self.monitor.check() {
            handle.cancel();
            sibling.cancel();
            return Err(fatal.into());
        }
        Ok(())
    }

    /// Returns the pool currently in use.
    pub fn pool(&self) -> WorkerPool {
        match self.pool.read() {
            Ok(pool) => pool.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Installs a new pool, returning the previous one.
    pub fn replace_pool(&self, pool: WorkerPool) -> WorkerPool {
        let mut slot = match self.pool.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *slot, pool)
    }

    /// Returns the result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Returns the threshold monitor.
    pub fn monitor(&self) -> &ErrorThresholdMonitor {
        &self.monitor
    }

    /// Returns the shared counters.
    pub fn counters(&self) -> &Arc<Counters> {
        self.monitor.counters()
    }

    /// Returns the output gate.
    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// Returns the per-branch deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for CombineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombineOrchestrator")
            .field("f", &self.f.name())
            .field("g", &self.g.name())
            .field("timeout", &self.timeout)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

fn work_name(function: &dyn SlowFunction, x: i64) -> String {
    format!("{}({})", function.name(), x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{FixedFunction, FnFunction};
    use crate::monitor::FatalCondition;
    use crate::notify::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn orchestrator(
        f: impl SlowFunction + 'static,
        g: impl SlowFunction + 'static,
    ) -> (Arc<CombineOrchestrator>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let orch = CombineOrchestrator::new(
            Arc::new(f),
            Arc::new(g),
            WorkerPool::new(3),
            Arc::new(Notifier::new(sink.clone())),
            CombineConfig::default(),
        );
        (Arc::new(orch), sink)
    }

    #[tokio::test]
    async fn test_scenario_5_5_7() {
        let f = FixedFunction::new("F", Outcome::Success(3));
        let g = FixedFunction::new("G", Outcome::Success(4));
        let f_calls = f.call_counter();
        let (orch, _sink) = orchestrator(f, g);

        let first = orch.combine(5).await.unwrap();
        let second = orch.combine(5).await.unwrap();
        let third = orch.combine(7).await.unwrap();

        assert_eq!(first, CombinedResult::computed(Outcome::Success(7)));
        assert_eq!(second, CombinedResult::cached(Outcome::Success(7)));
        assert_eq!(third, CombinedResult::computed(Outcome::Success(7)));
        assert_eq!(f_calls.load(Ordering::SeqCst), 2);
        assert_eq!(orch.counters().total_computed(), 3);
        assert_eq!(orch.counters().total_failed(), 0);
    }

    #[tokio::test]
    async fn test_f_failure_short_circuits() {
        let f = FixedFunction::new("F", Outcome::failure("f broke"));
        let g = FixedFunction::new("G", Outcome::failure("g broke"))
            .with_delay(Duration::from_millis(500));
        let (orch, _sink) = orchestrator(f, g);

        let result = orch.combine(1).await.unwrap();
        assert_eq!(result.outcome, Outcome::failure("f broke"));
        assert_eq!(orch.counters().total_failed(), 1);
        assert_eq!(orch.counters().failed(Branch::F), 1);
        assert_eq!(orch.counters().failed(Branch::G), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_f_timeout_cancels_both() {
        let f = FixedFunction::new("F", Outcome::Success(1)).with_delay(Duration::from_secs(5));
        let g = FixedFunction::new("G", Outcome::Success(2)).with_delay(Duration::from_secs(5));
        let (orch, _sink) = orchestrator(f, g);

        let result = orch.combine(9).await.unwrap();
        assert_eq!(result.outcome, Outcome::failure("timeout in F"));
        assert!(!result.served_from_cache);

        // Both units were cancelled, so the pool drains without waiting 5s.
        let pool = orch.pool();
        pool.shutdown();
        assert!(pool.await_termination(Duration::from_millis(10)).await);
        assert_eq!(pool.stats().cancelled, 2);
        assert_eq!(pool.stats().completed, 0);
        assert_eq!(orch.counters().total_failed(), 1);
        assert_eq!(orch.counters().failed(Branch::F), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_g_timeout() {
        let f = FixedFunction::new("F", Outcome::Success(1));
        let g = FixedFunction::new("G", Outcome::Success(2)).with_delay(Duration::from_secs(3));
        let (orch, _sink) = orchestrator(f, g);

        let result = orch.combine(2).await.unwrap();
        assert_eq!(result.outcome, Outcome::failure("timeout in G"));
        assert_eq!(orch.counters().total_failed(), 1);

        // F had already completed; only G is cancelled.
        let pool = orch.pool();
        pool.shutdown();
        assert!(pool.await_termination(Duration::from_millis(10)).await);
        assert_eq!(pool.stats().completed, 1);
        assert_eq!(pool.stats().cancelled, 1);
    }

    #[tokio::test]
    async fn test_g_failure_after_f_success() {
        let f = FixedFunction::new("F", Outcome::Success(1));
        let g = FixedFunction::new("G", Outcome::failure("g broke"));
        let (orch, sink) = orchestrator(f, g);

        let result = orch.combine(3).await.unwrap();
        assert_eq!(result.outcome, Outcome::failure("g broke"));
        assert_eq!(orch.counters().failed(Branch::G), 1);
        assert_eq!(
            sink.messages(),
            vec!["F(x = 3) = 1", "G(x = 3) failed: g broke"]
        );
    }

    #[tokio::test]
    async fn test_fault_becomes_failure() {
        let f = FnFunction::new("F", |_x| {
            async {
                if true {
                    panic!("unexpected fault");
                }
                Outcome::Success(0)
            }
            .boxed()
        });
        let g = FixedFunction::new("G", Outcome::Success(2));
        let (orch, _sink) = orchestrator(f, g);

        let result = orch.combine(4).await.unwrap();
        assert_eq!(result.outcome, Outcome::failure("unexpected fault"));
        assert_eq!(orch.counters().failed(Branch::F), 1);
    }

    #[tokio::test]
    async fn test_threshold_aborts_in_place() {
        let f = FixedFunction::new("F", Outcome::failure("always"));
        let g = FixedFunction::new("G", Outcome::Success(1));
        let (orch, _sink) = orchestrator(f, g);

        let mut aborted = None;
        for x in 0..20 {
            match orch.combine(x).await {
                Ok(result) => assert!(result.outcome.is_failure()),
                Err(abort) => {
                    aborted = Some((x, abort));
                    break;
                }
            }
        }

        let (x, abort) = aborted.expect("threshold should trip");
        // 11 completed combinations, then the 12th trips on F's failure.
        assert_eq!(x, 11);
        assert!(matches!(
            abort,
            CombineAbort::Fatal(FatalCondition::ThresholdExceeded { branch: Branch::F, .. })
        ));
        assert_eq!(orch.counters().total_computed(), 11);

        // Later calls, cache hits included, are refused.
        assert!(matches!(orch.combine(0).await, Err(CombineAbort::Fatal(_))));
    }

    #[tokio::test]
    async fn test_closed_pool_aborts() {
        let f = FixedFunction::new("F", Outcome::Success(1));
        let g = FixedFunction::new("G", Outcome::Success(1));
        let (orch, _sink) = orchestrator(f, g);
        orch.pool().shutdown();

        assert_eq!(orch.combine(1).await, Err(CombineAbort::PoolClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_shutdown_yields_cancelled() {
        let f = FixedFunction::new("F", Outcome::Success(1)).with_delay(Duration::from_millis(800));
        let g = FixedFunction::new("G", Outcome::Success(1));
        let (orch, _sink) = orchestrator(f, g);

        let pool = orch.pool();
        let waiter = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.combine(1).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        pool.shutdown_now();

        assert_eq!(waiter.await.unwrap(), Err(CombineAbort::Cancelled));
        assert_eq!(orch.counters().total_computed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_g_cancelled_when_f_fails() {
        let g_ran_to_end = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&g_ran_to_end);
        let f = FixedFunction::new("F", Outcome::failure("nope"));
        let g = FnFunction::new("G", move |_x| {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Outcome::Success(5)
            }
            .boxed()
        });
        let (orch, _sink) = orchestrator(f, g);

        orch.combine(6).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(g_ran_to_end.load(Ordering::SeqCst), 0);
        assert_eq!(orch.pool().stats().cancelled, 1);
    }

    #[tokio::test]
    async fn test_replace_pool() {
        let f = FixedFunction::new("F", Outcome::Success(1));
        let g = FixedFunction::new("G", Outcome::Success(1));
        let (orch, _sink) = orchestrator(f, g);
        let old = orch.replace_pool(WorkerPool::new(2));
        assert_eq!(old.workers(), 3);
        assert_eq!(orch.pool().workers(), 2);
    }
}
