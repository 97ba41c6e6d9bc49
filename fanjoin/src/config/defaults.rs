//! Default values for all configuration settings.

use super::file::config_directory;
use super::settings::*;
use crate::monitor::{DEFAULT_MAX_FAILURE_RATIO, DEFAULT_MIN_COMPLETED};
use crate::pool::DEFAULT_WORKERS;

/// Default sub-function deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default upper bound (exclusive) of simulated values.
pub const DEFAULT_VALUE_RANGE: i64 = 10;

/// Default failure cut-off for simulated values.
pub const DEFAULT_FAILURE_BELOW: i64 = 3;

/// Default probability of the simulated slow path.
pub const DEFAULT_SLOW_PROBABILITY: f64 = 0.2;

/// Default slow-path delay in milliseconds.
pub const DEFAULT_SLOW_DELAY_MS: u64 = 1500;

/// Default normal delay of F in milliseconds.
pub const DEFAULT_F_DELAY_MS: u64 = 100;

/// Default normal delay of G in milliseconds.
pub const DEFAULT_G_DELAY_MS: u64 = 300;

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE: &str = "fanjoin.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            pool: PoolSettings {
                workers: DEFAULT_WORKERS,
            },
            combine: CombineSettings {
                timeout_ms: DEFAULT_TIMEOUT_MS,
            },
            threshold: ThresholdSettings {
                min_completed: DEFAULT_MIN_COMPLETED,
                max_failure_ratio: DEFAULT_MAX_FAILURE_RATIO,
            },
            simulation: SimulationSettings {
                value_range: DEFAULT_VALUE_RANGE,
                failure_below: DEFAULT_FAILURE_BELOW,
                slow_probability: DEFAULT_SLOW_PROBABILITY,
                slow_delay_ms: DEFAULT_SLOW_DELAY_MS,
                f_delay_ms: DEFAULT_F_DELAY_MS,
                g_delay_ms: DEFAULT_G_DELAY_MS,
                seed: None,
            },
            logging: LoggingSettings {
                file: config_directory().join(DEFAULT_LOG_FILE),
            },
        }
    }
}
