//! Run counters and the error-rate circuit breaker.
//!
//! [`Counters`] holds the process-wide tallies. [`ErrorThresholdMonitor`]
//! records per-branch results into them and decides, after every observed
//! sub-result, whether either branch's failure rate has crossed the limit.
//!
//! # Trip rule
//!
//! ```text
//! total_computed > min_completed
//!   && (failed_f > ratio * total_computed || failed_g > ratio * total_computed)
//! ```
//!
//! With the defaults (10, 0.5) this is `failed * 2 > total` once more than
//! ten combinations have completed. Tripping latches until
//! [`ErrorThresholdMonitor::rearm`].

use crate::outcome::Branch;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, trace};

/// Default number of completed combinations before the rule applies.
pub const DEFAULT_MIN_COMPLETED: u64 = 10;

/// Default maximum tolerated failure ratio per branch.
pub const DEFAULT_MAX_FAILURE_RATIO: f64 = 0.5;

/// Fatal, non-local condition raised by the monitor.
///
/// Delivered to the lifecycle controller, which decides how the run ends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FatalCondition {
    /// A branch's failure rate crossed the configured limit.
    #[error(
        "error threshold exceeded: {branch} failed {failed} of {total} computations (limit {ratio})"
    )]
    ThresholdExceeded {
        /// Branch that crossed the limit (F wins if both did).
        branch: Branch,
        /// Failures recorded for that branch.
        failed: u64,
        /// Completed combinations at the time of the check.
        total: u64,
        /// Configured ratio.
        ratio: f64,
    },
}

/// Threshold policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    /// The rule applies only once `total_computed` exceeds this.
    pub min_completed: u64,
    /// Failure ratio per branch that trips the breaker when exceeded.
    pub max_failure_ratio: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_completed: DEFAULT_MIN_COMPLETED,
            max_failure_ratio: DEFAULT_MAX_FAILURE_RATIO,
        }
    }
}

/// A point-in-time copy of [`Counters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    /// Completed `combine` calls, cache hits included.
    pub total_computed: u64,
    /// Completed calls whose outcome was a failure.
    pub total_failed: u64,
    /// Failures attributed to F.
    pub failed_f: u64,
    /// Failures attributed to G.
    pub failed_g: u64,
    /// Successes observed from F.
    pub succeeded_f: u64,
    /// Successes observed from G.
    pub succeeded_g: u64,
}

/// Process-wide atomic tallies, reset together.
#[derive(Debug, Default)]
pub struct Counters {
    total_computed: AtomicU64,
    total_failed: AtomicU64,
    failed_f: AtomicU64,
    failed_g: AtomicU64,
    succeeded_f: AtomicU64,
    succeeded_g: AtomicU64,
}

impl Counters {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed combination.
    pub fn record_combination(&self, failed: bool) {
        self.total_computed.fetch_add(1, Ordering::SeqCst);
        if failed {
            self.total_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Completed combinations.
    pub fn total_computed(&self) -> u64 {
        self.total_computed.load(Ordering::SeqCst)
    }

    /// Completed combinations that failed.
    pub fn total_failed(&self) -> u64 {
        self.total_failed.load(Ordering::SeqCst)
    }

    /// Failures attributed to `branch`.
    pub fn failed(&self, branch: Branch) -> u64 {
        self.failed_counter(branch).load(Ordering::SeqCst)
    }

    fn failed_counter(&self, branch: Branch) -> &AtomicU64 {
        match branch {
            Branch::F => &self.failed_f,
            Branch::G => &self.failed_g,
        }
    }

    fn succeeded_counter(&self, branch: Branch) -> &AtomicU64 {
        match branch {
            Branch::F => &self.succeeded_f,
            Branch::G => &self.succeeded_g,
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        for counter in [
            &self.total_computed,
            &self.total_failed,
            &self.failed_f,
            &self.failed_g,
            &self.succeeded_f,
            &self.succeeded_g,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            total_computed: self.total_computed(),
            total_failed: self.total_failed(),
            failed_f: self.failed_f.load(Ordering::SeqCst),
            failed_g: self.failed_g.load(Ordering::SeqCst),
            succeeded_f: self.succeeded_f.load(Ordering::SeqCst),
            succeeded_g: self.succeeded_g.load(Ordering::SeqCst),
        }
    }
}

/// Circuit breaker over per-branch failure rates.
#[derive(Debug)]
pub struct ErrorThresholdMonitor {
    config: ThresholdConfig,
    counters: Arc<Counters>,
    tripped: AtomicBool,
}

impl ErrorThresholdMonitor {
    /// Creates a monitor over shared counters.
    pub fn new(config: ThresholdConfig, counters: Arc<Counters>) -> Self {
        Self {
            config,
            counters,
            tripped: AtomicBool::new(false),
        }
    }

    /// Returns the policy.
    pub fn config(&self) -> ThresholdConfig {
        self.config
    }

    /// Returns the shared counters.
    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    /// Records a successful sub-result.
    pub fn record_success(&self, branch: Branch) {
        self.counters
            .succeeded_counter(branch)
            .fetch_add(1, Ordering::SeqCst);
    }

    /// Records a failed sub-result.
    pub fn record_failure(&self, branch: Branch) {
        let failed = self
            .counters
            .failed_counter(branch)
            .fetch_add(1, Ordering::SeqCst)
            + 1;
        trace!(branch = %branch, failed, "Sub-function failure recorded");
    }

    /// Returns true once the breaker has tripped.
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Checks the trip rule.
    ///
    /// The first caller to observe a crossing latches the breaker and logs
    /// it; every check after that fails too.
    pub fn check(&self) -> Result<(), FatalCondition> {
        let total = self.counters.total_computed();
        let breach = self.breach(total);

        if self.is_tripped() || breach.is_some() {
            let condition = breach.unwrap_or_else(|| self.current_condition(total));
            if !self.tripped.swap(true, Ordering::SeqCst) {
                error!(
                    branch = %branch_of(&condition),
                    total,
                    ratio = self.config.max_failure_ratio,
                    "Error threshold exceeded"
                );
            }
            return Err(condition);
        }
        Ok(())
    }

    /// Clears the latch. Counters are reset separately.
    pub fn rearm(&self) {
        self.tripped.store(false, Ordering::SeqCst);
    }

    fn breach(&self, total: u64) -> Option<FatalCondition> {
        if total <= self.config.min_completed {
            return None;
        }
        [Branch::F, Branch::G].into_iter().find_map(|branch| {
            let failed = self.counters.failed(branch);
            (failed as f64 > self.config.max_failure_ratio * total as f64).then(|| {
                FatalCondition::ThresholdExceeded {
                    branch,
                    failed,
                    total,
                    ratio: self.config.max_failure_ratio,
                }
            })
        })
    }

    /// Condition reported after the latch is set, when the counters may no
    /// longer show a breach (e.g. total has grown since).
    fn current_condition(&self, total: u64) -> FatalCondition {
        let branch = if self.counters.failed(Branch::F) >= self.counters.failed(Branch::G) {
            Branch::F
        } else {
            Branch::G
        };
        FatalCondition::ThresholdExceeded {
            branch,
            failed: self.counters.failed(branch),
            total,
            ratio: self.config.max_failure_ratio,
        }
    }
}

fn branch_of(condition: &FatalCondition) -> Branch {
    match condition {
        FatalCondition::ThresholdExceeded { branch, .. } => *branch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> ErrorThresholdMonitor {
        ErrorThresholdMonitor::new(ThresholdConfig::default(), Arc::new(Counters::new()))
    }

    fn complete(monitor: &ErrorThresholdMonitor, n: u64) {
        for _ in 0..n {
            monitor.counters().record_combination(false);
        }
    }

    #[test]
    fn test_no_trip_at_or_below_min_completed() {
        let m = monitor();
        complete(&m, 10);
        for _ in 0..10 {
            m.record_failure(Branch::F);
        }
        assert!(m.check().is_ok());
        assert!(!m.is_tripped());
    }

    #[test]
    fn test_trips_when_f_exceeds_half() {
        let m = monitor();
        complete(&m, 11);
        for _ in 0..5 {
            m.record_failure(Branch::F);
        }
        assert!(m.check().is_ok());

        m.record_failure(Branch::F);
        let err = m.check().unwrap_err();
        assert_eq!(
            err,
            FatalCondition::ThresholdExceeded {
                branch: Branch::F,
                failed: 6,
                total: 11,
                ratio: 0.5
            }
        );
        assert!(m.is_tripped());
    }

    #[test]
    fn test_trips_on_g() {
        let m = monitor();
        complete(&m, 12);
        for _ in 0..7 {
            m.record_failure(Branch::G);
        }
        match m.check() {
            Err(FatalCondition::ThresholdExceeded { branch, .. }) => assert_eq!(branch, Branch::G),
            other => panic!("expected trip, got {:?}", other),
        }
    }

    #[test]
    fn test_exactly_half_does_not_trip() {
        let m = monitor();
        complete(&m, 12);
        for _ in 0..6 {
            m.record_failure(Branch::G);
        }
        assert!(m.check().is_ok());
    }

    #[test]
    fn test_latch_and_rearm() {
        let m = monitor();
        complete(&m, 11);
        for _ in 0..6 {
            m.record_failure(Branch::F);
        }
        assert!(m.check().is_err());

        // Latched even after the ratio drops.
        complete(&m, 20);
        assert!(m.check().is_err());

        m.counters().reset();
        m.rearm();
        assert!(m.check().is_ok());
    }

    #[test]
    fn test_custom_config() {
        let config = ThresholdConfig {
            min_completed: 2,
            max_failure_ratio: 0.25,
        };
        let m = ErrorThresholdMonitor::new(config, Arc::new(Counters::new()));
        complete(&m, 4);
        m.record_failure(Branch::F);
        assert!(m.check().is_ok());
        m.record_failure(Branch::F);
        assert!(m.check().is_err());
    }

    #[test]
    fn test_counters_snapshot_and_reset() {
        let m = monitor();
        m.counters().record_combination(true);
        m.counters().record_combination(false);
        m.record_success(Branch::F);
        m.record_failure(Branch::G);

        let snap = m.counters().snapshot();
        assert_eq!(snap.total_computed, 2);
        assert_eq!(snap.total_failed, 1);
        assert_eq!(snap.succeeded_f, 1);
        assert_eq!(snap.failed_g, 1);

        m.counters().reset();
        assert_eq!(m.counters().snapshot(), CountersSnapshot::default());
    }

    #[test]
    fn test_fatal_condition_display() {
        let condition = FatalCondition::ThresholdExceeded {
            branch: Branch::G,
            failed: 7,
            total: 12,
            ratio: 0.5,
        };
        assert_eq!(
            condition.to_string(),
            "error threshold exceeded: G failed 7 of 12 computations (limit 0.5)"
        );
    }
}
