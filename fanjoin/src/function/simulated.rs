//! Randomised sub-function used by the command-line driver.

use super::SlowFunction;
use crate::outcome::Outcome;
use futures::future::BoxFuture;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tracing::trace;

/// Tunables for [`SimulatedFunction`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Values are drawn uniformly from `0..value_range`.
    pub value_range: i64,
    /// Values below this are reported as failures.
    pub failure_below: i64,
    /// Probability of taking `slow_delay` instead of `base_delay`.
    pub slow_probability: f64,
    /// Delay on the slow path (longer than the combine timeout by default).
    pub slow_delay: Duration,
    /// Delay on the normal path.
    pub base_delay: Duration,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            value_range: 10,
            failure_below: 3,
            slow_probability: 0.2,
            slow_delay: Duration::from_millis(1500),
            base_delay: Duration::from_millis(100),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Same settings with a different normal-path delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }
}

/// Sub-function that sleeps for a random delay and then succeeds or fails
/// at random.
pub struct SimulatedFunction {
    name: String,
    label: String,
    config: SimulationConfig,
    rng: Mutex<StdRng>,
}

impl SimulatedFunction {
    /// Creates a simulated function.
    ///
    /// The label used in failure messages is `name` lowercased.
    pub fn new(name: impl Into<String>, config: SimulationConfig) -> Self {
        let name = name.into();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            label: name.to_lowercase(),
            name,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Draws the value and delay for one call.
    fn draw(&self) -> (i64, Duration) {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let value = rng.gen_range(0..self.config.value_range.max(1));
        let slow = rng.gen_bool(self.config.slow_probability.clamp(0.0, 1.0));
        let delay = if slow {
            self.config.slow_delay
        } else {
            self.config.base_delay
        };
        (value, delay)
    }
}

impl SlowFunction for SimulatedFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, x: i64) -> BoxFuture<'static, Outcome> {
        let (value, delay) = self.draw();
        let failure_below = self.config.failure_below;
        let label = self.label.clone();
        trace!(function = %self.name, x, value, delay_ms = delay.as_millis() as u64, "Simulated call");

        async move {
            tokio::time::sleep(delay).await;
            if value < failure_below {
                Outcome::Failure(format!("computation of {}(x) failed for x = {}", label, x))
            } else {
                Outcome::Success(value)
            }
        }
        .boxed()
    }
}

impl std::fmt::Debug for SimulatedFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedFunction")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(seed: u64) -> SimulationConfig {
        SimulationConfig {
            slow_probability: 0.0,
            base_delay: Duration::from_millis(1),
            seed: Some(seed),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert_eq!(config.value_range, 10);
        assert_eq!(config.failure_below, 3);
        assert_eq!(config.slow_delay, Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcomes_follow_failure_rule() {
        let f = SimulatedFunction::new("F", fast(7));
        for x in 0..50 {
            match f.compute(x).await {
                Outcome::Success(v) => assert!((3..10).contains(&v)),
                Outcome::Failure(msg) => {
                    assert_eq!(msg, format!("computation of f(x) failed for x = {}", x))
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_seed_same_sequence() {
        let a = SimulatedFunction::new("G", fast(42));
        let b = SimulatedFunction::new("G", fast(42));
        for x in 0..20 {
            assert_eq!(a.compute(x).await, b.compute(x).await);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_path_uses_slow_delay() {
        let config = SimulationConfig {
            slow_probability: 1.0,
            slow_delay: Duration::from_millis(1500),
            seed: Some(1),
            ..SimulationConfig::default()
        };
        let f = SimulatedFunction::new("F", config);
        let start = tokio::time::Instant::now();
        let _ = f.compute(1).await;
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[test]
    fn test_name_and_debug() {
        let f = SimulatedFunction::new("F", SimulationConfig::default());
        assert_eq!(f.name(), "F");
        assert!(format!("{:?}", f).contains("SimulatedFunction"));
    }
}
