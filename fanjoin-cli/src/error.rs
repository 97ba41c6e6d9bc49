//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;
use fanjoin::config::ConfigFileError;
use fanjoin::lifecycle::LifecycleError;
use fanjoin::monitor::FatalCondition;
use fanjoin::source::SourceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Input file missing or unreadable
    Input(SourceError),
    /// Administrative operation refused
    Lifecycle(LifecycleError),
    /// The run was halted by the error threshold
    Halted(FatalCondition),
    /// A file already exists where one would be written
    AlreadyExists(PathBuf),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value in your config file, or regenerate it with:");
                eprintln!("  fanjoin config init --force");
            }
            CliError::Input(SourceError::Unavailable { .. }) => {
                eprintln!();
                eprintln!("The input file should contain whitespace-separated integers.");
            }
            CliError::Halted(_) => {
                eprintln!();
                eprintln!("Too many sub-function failures; all pending work was cancelled.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Input(e) => write!(f, "{}", e),
            CliError::Lifecycle(e) => write!(f, "{}", e),
            CliError::Halted(condition) => write!(f, "Run halted: {}", condition),
            CliError::AlreadyExists(path) => {
                write!(f, "'{}' already exists (use --force to overwrite)", path.display())
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Input(e) => Some(e),
            CliError::Lifecycle(e) => Some(e),
            CliError::Halted(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<SourceError> for CliError {
    fn from(e: SourceError) -> Self {
        CliError::Input(e)
    }
}

impl From<LifecycleError> for CliError {
    fn from(e: LifecycleError) -> Self {
        CliError::Lifecycle(e)
    }
}
