//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init`.

use clap::Subcommand;
use std::path::{Path, PathBuf};

use fanjoin::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration
    Show,

    /// Write a commented configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand against `path` (or the default location).
pub fn run(command: ConfigCommands, path: Option<PathBuf>) -> Result<(), CliError> {
    let path = path.unwrap_or_else(config_file_path);
    match command {
        ConfigCommands::Path => run_path(&path),
        ConfigCommands::Show => run_show(&path),
        ConfigCommands::Init { force } => run_init(&path, force),
    }
}

/// Show the configuration file path.
fn run_path(path: &Path) -> Result<(), CliError> {
    println!("{}", path.display());
    Ok(())
}

/// Show the effective configuration, defaults included.
fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    let seed = config
        .simulation
        .seed
        .map(|s| s.to_string())
        .unwrap_or_else(|| "(not set)".to_string());

    println!("Configuration Settings");
    println!("======================");
    if !path.exists() {
        println!("(no file at {}, showing defaults)", path.display());
    }
    println!();
    println!("[pool]");
    println!("  workers = {}", config.pool.workers);
    println!();
    println!("[combine]");
    println!("  timeout_ms = {}", config.combine.timeout_ms);
    println!();
    println!("[threshold]");
    println!("  min_completed = {}", config.threshold.min_completed);
    println!("  max_failure_ratio = {}", config.threshold.max_failure_ratio);
    println!();
    println!("[simulation]");
    println!("  value_range = {}", config.simulation.value_range);
    println!("  failure_below = {}", config.simulation.failure_below);
    println!("  slow_probability = {}", config.simulation.slow_probability);
    println!("  slow_delay_ms = {}", config.simulation.slow_delay_ms);
    println!("  f_delay_ms = {}", config.simulation.f_delay_ms);
    println!("  g_delay_ms = {}", config.simulation.g_delay_ms);
    println!("  seed = {}", seed);
    println!();
    println!("[logging]");
    println!("  file = {}", config.logging.file.display());

    Ok(())
}

/// Write the default configuration file.
fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::AlreadyExists(path.to_path_buf()));
    }
    ConfigFile::default().save_to(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
