//! Administrative control over a whole run.
//!
//! The [`LifecycleController`] owns the orchestrator and everything behind
//! it (pool, cache, counters, output gate) and treats them as one unit:
//!
//! ```text
//!            start(source) ──► driver task ──► combine(x) per input ──► sink
//!                                   │
//!   force_cancel() ─ pause + shutdown_now + stop driver
//!   reset()        ─ new pool, zero counters, empty cache, resume output
//!   pause/resume   ─ output gate only
//! ```
//!
//! A tripped error threshold reaches the controller as a [`FatalCondition`];
//! the controller reports it, force-stops the pool and ends the run as
//! [`RunOutcome::Halted`]. Whether the process exits is left to the caller.

use crate::cache::CacheStats;
use crate::function::SlowFunction;
use crate::monitor::{CountersSnapshot, FatalCondition};
use crate::notify::{NotificationSink, Notifier};
use crate::orchestrator::{CombineConfig, CombineOrchestrator};
use crate::outcome::{CombineAbort, CombinedResult, Outcome};
use crate::pool::{PoolStats, WorkerPool, DEFAULT_WORKERS};
use crate::source::{InputSource, SourceError};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Errors from administrative operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// `start` was called while a run is active.
    #[error("a run is already active")]
    AlreadyRunning,

    /// `reset` was called while work could still observe the old state.
    #[error("cannot reset while busy: {0}")]
    Busy(String),

    /// The pool was shut down by a previous run.
    #[error("worker pool is closed; reset before starting another run")]
    PoolClosed,

    /// The driver task ended abnormally.
    #[error("driver task failed: {0}")]
    Driver(String),
}

/// Controller settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleConfig {
    /// Worker slots in each pool this controller creates.
    pub workers: usize,
    /// Orchestrator settings.
    pub combine: CombineConfig,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            combine: CombineConfig::default(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The input was exhausted.
    Completed,
    /// Stopped by `force_cancel` or by the pool closing underneath it.
    Cancelled,
    /// Stopped by the error threshold.
    Halted(FatalCondition),
    /// Reading the input failed part way through.
    InputFailed(String),
}

impl RunOutcome {
    /// Returns true for a halt by the error threshold.
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted(_))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Halted(condition) => write!(f, "halted: {}", condition),
            Self::InputFailed(msg) => write!(f, "input failed: {}", msg),
        }
    }
}

/// Summary returned when a run ends.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Inputs whose result was delivered.
    pub processed: u64,
    /// Why the run ended.
    pub outcome: RunOutcome,
}

/// Handle to a run started with [`LifecycleController::start`].
#[derive(Debug)]
pub struct RunHandle {
    join: JoinHandle<RunSummary>,
}

impl RunHandle {
    /// Waits for the run to end.
    pub async fn wait(self) -> Result<RunSummary, LifecycleError> {
        self.join
            .await
            .map_err(|e| LifecycleError::Driver(e.to_string()))
    }

    /// Returns true once the driver task has finished.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Read-only view for status queries.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub counters: CountersSnapshot,
    pub cache: CacheStats,
    pub pool: PoolStats,
    pub running: bool,
    pub output_paused: bool,
    pub threshold_tripped: bool,
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "computed: {}  failed: {}  (F failures: {}, G failures: {})",
            self.counters.total_computed,
            self.counters.total_failed,
            self.counters.failed_f,
            self.counters.failed_g
        )?;
        writeln!(
            f,
            "cache: {} entries, {} hits / {} requests",
            self.cache.entries, self.cache.hits, self.cache.requests
        )?;
        writeln!(
            f,
            "pool: {} workers, {} in flight, {}",
            self.pool.workers,
            self.pool.in_flight,
            if self.pool.closed { "closed" } else { "open" }
        )?;
        write!(
            f,
            "run: {}  output: {}  threshold: {}",
            if self.running { "active" } else { "idle" },
            if self.output_paused { "paused" } else { "on" },
            if self.threshold_tripped { "tripped" } else { "ok" }
        )
    }
}

/// Owns one orchestrator and the run driving it.
pub struct LifecycleController {
    orchestrator: Arc<CombineOrchestrator>,
    workers: usize,
    running: AtomicBool,
    run_token: Mutex<CancellationToken>,
}

impl LifecycleController {
    /// Creates a controller with a fresh pool, cache and counters.
    pub fn new(
        config: LifecycleConfig,
        f: Arc<dyn SlowFunction>,
        g: Arc<dyn SlowFunction>,
        sink: Arc<dyn NotificationSink>,
    ) -> Arc<Self> {
        let notifier = Arc::new(Notifier::new(sink));
        let orchestrator = CombineOrchestrator::new(
            f,
            g,
            WorkerPool::new(config.workers),
            notifier,
            config.combine,
        );
        Arc::new(Self {
            orchestrator: Arc::new(orchestrator),
            workers: config.workers.max(1),
            running: AtomicBool::new(false),
            run_token: Mutex::new(CancellationToken::new()),
        })
    }

    /// Opens the input file for a run.
    ///
    /// An unavailable source is fatal at startup and is reported to the sink
    /// before the error is returned.
    pub async fn open_source(&self, path: impl AsRef<Path>) -> Result<InputSource, SourceError> {
        match InputSource::open(path).await {
            Ok(source) => Ok(source),
            Err(e) => {
                error!(error = %e, "Input source unavailable");
                self.orchestrator.notifier().error(format_args!("{}", e));
                Err(e)
            }
        }
    }

    /// Starts the driver over `source`.
    pub fn start(self: &Arc<Self>, source: InputSource) -> Result<RunHandle, LifecycleError> {
        if self.orchestrator.pool().is_closed() {
            return Err(LifecycleError::PoolClosed);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(LifecycleError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        *self.run_token.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();

        let this = Arc::clone(self);
        let join = tokio::spawn(async move { this.drive(source, token).await });
        Ok(RunHandle { join })
    }

    /// Starts a run and waits for it to end.
    pub async fn run(self: &Arc<Self>, source: InputSource) -> Result<RunSummary, LifecycleError> {
        self.start(source)?.wait().await
    }

    /// Driver loop: one input at a time, results delivered in input order.
    async fn drive(self: Arc<Self>, mut source: InputSource, token: CancellationToken) -> RunSummary {
        let started = Instant::now();
        let notifier = Arc::clone(self.orchestrator.notifier());
        let mut processed = 0u64;
        info!(workers = self.workers, "Run started");

        let outcome = loop {
            if token.is_cancelled() {
                break RunOutcome::Cancelled;
            }
            let x = match source.next_value().await {
                Ok(Some(x)) => x,
                Ok(None) => break RunOutcome::Completed,
                Err(e) => {
                    notifier.error(format_args!("{}", e));
                    break RunOutcome::InputFailed(e.to_string());
                }
            };

            match self.combine(x).await {
                Ok(result) => {
                    processed += 1;
                    deliver(&notifier, x, &result);
                }
                Err(CombineAbort::Fatal(condition)) => break RunOutcome::Halted(condition),
                Err(CombineAbort::PoolClosed) | Err(CombineAbort::Cancelled) => {
                    break RunOutcome::Cancelled
                }
            }
        };

        if outcome == RunOutcome::Completed {
            self.orchestrator.pool().shutdown();
        }
        self.running.store(false, Ordering::SeqCst);

        info!(
            processed,
            outcome = %outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Run finished"
        );
        RunSummary { processed, outcome }
    }

    /// Combines one input under this controller's supervision.
    ///
    /// A tripped threshold halts the pool before the abort is returned.
    pub async fn combine(&self, x: i64) -> Result<CombinedResult, CombineAbort> {
        let result = self.orchestrator.combine(x).await;
        if let Err(CombineAbort::Fatal(condition)) = &result {
            self.halt(condition);
        }
        result
    }

    /// Reports a fatal condition and force-stops the pool.
    fn halt(&self, condition: &FatalCondition) {
        let pool = self.orchestrator.pool();
        if pool.is_closed() && pool.in_flight() == 0 {
            return;
        }
        error!(condition = %condition, "Halting run");
        self.orchestrator
            .notifier()
            .error(format_args!("{}", condition));
        pool.shutdown_now();
    }

    /// Restores a fresh state: new pool, zero counters, empty cache,
    /// output resumed, breaker re-armed.
    ///
    /// Refused while a run is active or the current pool still has work in
    /// flight, so stragglers never observe the new state.
    pub fn reset(&self) -> Result<(), LifecycleError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(LifecycleError::Busy("a run is active".to_string()));
        }
        let old = self.orchestrator.pool();
        let in_flight = old.in_flight();
        if in_flight > 0 {
            return Err(LifecycleError::Busy(format!(
                "{} unit(s) of work still in flight",
                in_flight
            )));
        }

        old.shutdown();
        self.orchestrator.counters().reset();
        self.orchestrator.cache().clear();
        self.orchestrator.notifier().resume();
        self.orchestrator.monitor().rearm();
        self.orchestrator.replace_pool(WorkerPool::new(self.workers));

        info!(workers = self.workers, "Lifecycle reset");
        Ok(())
    }

    /// Pauses output, force-stops the pool and stops the driver.
    ///
    /// Callers waiting on in-flight work observe `Cancelled`.
    pub fn force_cancel(&self) {
        self.orchestrator.notifier().pause();
        self.orchestrator.pool().shutdown_now();
        self.run_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
        warn!("Run force-cancelled");
    }

    /// Suppresses notifications. Computation continues.
    pub fn pause_output(&self) {
        self.orchestrator.notifier().pause();
    }

    /// Lets notifications through again. Nothing is replayed.
    pub fn resume_output(&self) {
        self.orchestrator.notifier().resume();
    }

    pub fn total_computed(&self) -> u64 {
        self.orchestrator.counters().total_computed()
    }

    pub fn total_failed(&self) -> u64 {
        self.orchestrator.counters().total_failed()
    }

    /// Returns true while a run is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns a snapshot for status queries.
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            counters: self.orchestrator.counters().snapshot(),
            cache: self.orchestrator.cache().stats(),
            pool: self.orchestrator.pool().stats(),
            running: self.is_running(),
            output_paused: self.orchestrator.notifier().is_paused(),
            threshold_tripped: self.orchestrator.monitor().is_tripped(),
        }
    }

    /// Returns the orchestrator.
    pub fn orchestrator(&self) -> &Arc<CombineOrchestrator> {
        &self.orchestrator
    }
}

impl fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleController")
            .field("orchestrator", &self.orchestrator)
            .field("workers", &self.workers)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Renders the per-input line the driver sends to the sink.
fn deliver(notifier: &Notifier, x: i64, result: &CombinedResult) {
    let cached = if result.served_from_cache { " (cached)" } else { "" };
    match &result.outcome {
        Outcome::Success(v) => notifier.message(format_args!("Result for x = {}: {}{}", x, v, cached)),
        Outcome::Failure(msg) => {
            notifier.error(format_args!("Error for x = {}: {}{}", x, msg, cached))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FixedFunction;
    use crate::notify::MemorySink;
    use std::time::Duration;

    fn controller(
        f: impl SlowFunction + 'static,
        g: impl SlowFunction + 'static,
    ) -> (Arc<LifecycleController>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let controller = LifecycleController::new(
            LifecycleConfig::default(),
            Arc::new(f),
            Arc::new(g),
            sink.clone(),
        );
        (controller, sink)
    }

    fn ok(name: &str, v: i64) -> FixedFunction {
        FixedFunction::new(name, Outcome::Success(v))
    }

    #[tokio::test]
    async fn test_run_delivers_lines_in_order() {
        let (ctl, sink) = controller(ok("F", 3), ok("G", 4));

        let summary = ctl.run(InputSource::from_text("5 5\n7")).await.unwrap();

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.processed, 3);
        let results: Vec<String> = sink
            .messages()
            .into_iter()
            .filter(|m| m.starts_with("Result"))
            .collect();
        assert_eq!(
            results,
            vec![
                "Result for x = 5: 7",
                "Result for x = 5: 7 (cached)",
                "Result for x = 7: 7",
            ]
        );
        assert_eq!(ctl.total_computed(), 3);
        assert_eq!(ctl.total_failed(), 0);
        // End of input closes the pool gracefully.
        assert!(ctl.status().pool.closed);
        assert!(!ctl.is_running());
    }

    #[tokio::test]
    async fn test_failures_are_error_lines() {
        let (ctl, sink) = controller(FixedFunction::new("F", Outcome::failure("bad")), ok("G", 1));

        ctl.run(InputSource::from_text("1 1")).await.unwrap();

        assert_eq!(
            sink.errors(),
            vec!["Error for x = 1: bad", "Error for x = 1: bad (cached)"]
        );
        assert_eq!(ctl.total_failed(), 2);
    }

    #[tokio::test]
    async fn test_missing_source_reported_to_sink() {
        let (ctl, sink) = controller(ok("F", 1), ok("G", 1));
        let dir = tempfile::tempdir().unwrap();

        let err = ctl
            .open_source(dir.path().join("missing.txt"))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Unavailable { .. }));
        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("input source unavailable"));
        assert!(errors[0].contains("missing.txt"));
        assert!(!ctl.is_running());
    }

    #[tokio::test]
    async fn test_open_source_runs_file() {
        let (ctl, sink) = controller(ok("F", 1), ok("G", 2));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        std::fs::write(&path, "4\n").unwrap();

        let source = ctl.open_source(&path).await.unwrap();
        let summary = ctl.run(source).await.unwrap();

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert!(sink.messages().contains(&"Result for x = 4: 3".to_string()));
        assert!(sink.errors().is_empty());
    }

    #[tokio::test]
    async fn test_threshold_halts_run() {
        let (ctl, sink) = controller(FixedFunction::new("F", Outcome::failure("bad")), ok("G", 1));
        let input: Vec<String> = (0..30).map(|x| x.to_string()).collect();

        let summary = ctl.run(InputSource::from_text(input.join(" "))).await.unwrap();

        assert!(summary.outcome.is_halted());
        assert_eq!(summary.processed, 11);
        let last = sink.errors().pop().unwrap();
        assert!(last.starts_with("error threshold exceeded"), "{}", last);
        let status = ctl.status();
        assert!(status.pool.closed);
        assert!(status.threshold_tripped);
    }

    #[tokio::test]
    async fn test_start_requires_reset_after_run() {
        let (ctl, _sink) = controller(ok("F", 1), ok("G", 1));
        ctl.run(InputSource::from_text("1")).await.unwrap();

        assert_eq!(
            ctl.start(InputSource::from_text("2")).unwrap_err(),
            LifecycleError::PoolClosed
        );
        ctl.reset().unwrap();
        let summary = ctl.run(InputSource::from_text("2")).await.unwrap();
        assert_eq!(summary.outcome, RunOutcome::Completed);
    }

    #[tokio::test]
    async fn test_reset_clears_cache_and_counters() {
        let (ctl, sink) = controller(ok("F", 3), ok("G", 4));
        ctl.run(InputSource::from_text("5 6 5")).await.unwrap();
        assert_eq!(ctl.total_computed(), 3);

        ctl.reset().unwrap();
        let status = ctl.status();
        assert_eq!(status.counters, CountersSnapshot::default());
        assert_eq!(status.cache.entries, 0);
        assert!(!status.pool.closed);

        sink.clear();
        let again = ctl.combine(5).await.unwrap();
        assert!(!again.served_from_cache);
        assert_eq!(again.outcome, Outcome::Success(7));
        assert_eq!(ctl.total_computed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_refused_while_running() {
        let slow = ok("F", 1).with_delay(Duration::from_millis(500));
        let (ctl, _sink) = controller(slow, ok("G", 1));

        let handle = ctl.start(InputSource::from_text("1 2 3")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(ctl.reset(), Err(LifecycleError::Busy(_))));
        assert_eq!(
            ctl.start(InputSource::from_text("4")).unwrap_err(),
            LifecycleError::AlreadyRunning
        );
        handle.wait().await.unwrap();
        ctl.reset().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_cancel_stops_run() {
        let slow = ok("F", 1).with_delay(Duration::from_millis(800));
        let (ctl, sink) = controller(slow, ok("G", 1));

        let handle = ctl.start(InputSource::from_text("1 2 3 4")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        ctl.force_cancel();

        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert_eq!(summary.processed, 0);
        assert!(ctl.status().output_paused);
        assert!(sink.all().is_empty());

        // Drained: reset succeeds and output is back on.
        assert!(ctl.orchestrator().pool().await_termination(Duration::from_secs(1)).await);
        ctl.reset().unwrap();
        assert!(!ctl.status().output_paused);
    }

    #[tokio::test]
    async fn test_pause_drops_output_without_replay() {
        let (ctl, sink) = controller(ok("F", 1), ok("G", 2));
        ctl.pause_output();
        ctl.combine(1).await.unwrap();
        ctl.resume_output();
        assert!(sink.all().is_empty());

        ctl.combine(2).await.unwrap();
        assert_eq!(sink.messages(), vec!["F(x = 2) = 1", "G(x = 2) = 2"]);
        assert_eq!(ctl.total_computed(), 2);
    }

    #[test]
    fn test_status_display() {
        let status = StatusSnapshot {
            counters: CountersSnapshot {
                total_computed: 4,
                total_failed: 1,
                failed_f: 1,
                ..Default::default()
            },
            cache: CacheStats::default(),
            pool: PoolStats {
                workers: 3,
                ..Default::default()
            },
            running: true,
            output_paused: false,
            threshold_tripped: false,
        };
        let text = status.to_string();
        assert!(text.contains("computed: 4  failed: 1"));
        assert!(text.contains("pool: 3 workers, 0 in flight, open"));
        assert!(text.contains("run: active"));
    }

    #[test]
    fn test_run_outcome_display() {
        assert_eq!(RunOutcome::Completed.to_string(), "completed");
        assert_eq!(RunOutcome::Cancelled.to_string(), "cancelled");
    }
}
