//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, runtime creation and
//! controller construction so command handlers stay short.

use crate::error::CliError;
use crate::sink::ConsoleSink;
use fanjoin::config::{config_file_path, ConfigFile};
use fanjoin::function::SimulatedFunction;
use fanjoin::lifecycle::LifecycleController;
use fanjoin::logging::{init_logging, LoggingGuard, LoggingOptions};
use fanjoin::outcome::Branch;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
    runtime: Runtime,
}

impl CliRunner {
    /// Create a runner: load config, initialize logging, start the runtime.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Config file to use instead of ~/.fanjoin/config.ini
    /// * `debug` - Debug-level logging, mirrored to stderr
    pub fn new(config_path: Option<&Path>, debug: bool) -> Result<Self, CliError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let options = LoggingOptions {
            console: debug,
            debug,
        };
        let logging_guard = init_logging(&config.logging.file, options)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let runtime = Runtime::new().map_err(CliError::Runtime)?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            config_path,
            runtime,
        })
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("fanjoin v{}", fanjoin::VERSION);
        info!(
            config = %self.config_path.display(),
            "fanjoin CLI: {} command", command
        );
    }

    /// Build a controller over simulated F and G, reporting to the console.
    pub fn create_controller(&self) -> Arc<LifecycleController> {
        let f = SimulatedFunction::new("F", self.config.simulation_config(Branch::F));
        let g = SimulatedFunction::new("G", self.config.simulation_config(Branch::G));
        LifecycleController::new(
            self.config.lifecycle_config(),
            Arc::new(f),
            Arc::new(g),
            Arc::new(ConsoleSink::stdout()),
        )
    }

    /// Drive a future to completion on the runner's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
