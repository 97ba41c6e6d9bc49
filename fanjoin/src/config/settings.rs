//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use crate::function::SimulationConfig;
use crate::lifecycle::LifecycleConfig;
use crate::monitor::ThresholdConfig;
use crate::orchestrator::CombineConfig;
use crate::outcome::Branch;
use std::path::PathBuf;
use std::time::Duration;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Worker pool settings
    pub pool: PoolSettings,
    /// Fan-out / join settings
    pub combine: CombineSettings,
    /// Error threshold settings
    pub threshold: ThresholdSettings,
    /// Simulated sub-function settings
    pub simulation: SimulationSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// `[pool]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Number of worker slots.
    pub workers: usize,
}

/// `[combine]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineSettings {
    /// Deadline for each sub-function, in milliseconds.
    pub timeout_ms: u64,
}

/// `[threshold]`
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSettings {
    /// Completed combinations required before the rule applies.
    pub min_completed: u64,
    /// Per-branch failure ratio that trips the breaker when exceeded.
    pub max_failure_ratio: f64,
}

/// `[simulation]`
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    /// Values are drawn from `0..value_range`.
    pub value_range: i64,
    /// Values below this are failures.
    pub failure_below: i64,
    /// Probability of the slow path.
    pub slow_probability: f64,
    /// Slow path delay in milliseconds.
    pub slow_delay_ms: u64,
    /// Normal delay of F in milliseconds.
    pub f_delay_ms: u64,
    /// Normal delay of G in milliseconds.
    pub g_delay_ms: u64,
    /// Fixed RNG seed. G uses `seed + 1`.
    pub seed: Option<u64>,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path.
    pub file: PathBuf,
}

impl ConfigFile {
    /// Builds the controller settings.
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            workers: self.pool.workers,
            combine: CombineConfig {
                timeout: Duration::from_millis(self.combine.timeout_ms),
                threshold: ThresholdConfig {
                    min_completed: self.threshold.min_completed,
                    max_failure_ratio: self.threshold.max_failure_ratio,
                },
            },
        }
    }

    /// Builds the simulation settings for one sub-function.
    pub fn simulation_config(&self, branch: Branch) -> SimulationConfig {
        let sim = &self.simulation;
        let (base_delay_ms, seed) = match branch {
            Branch::F => (sim.f_delay_ms, sim.seed),
            Branch::G => (sim.g_delay_ms, sim.seed.map(|s| s.wrapping_add(1))),
        };
        SimulationConfig {
            value_range: sim.value_range,
            failure_below: sim.failure_below,
            slow_probability: sim.slow_probability,
            slow_delay: Duration::from_millis(sim.slow_delay_ms),
            base_delay: Duration::from_millis(base_delay_ms),
            seed,
        }
    }
}
