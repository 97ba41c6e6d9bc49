//! Logging infrastructure for fanjoin.
//!
//! Provides structured logging with file output and optional console output:
//! - Writes to the configured log file (cleared on session start)
//! - Optionally mirrors to stderr, leaving stdout to result lines
//! - Configurable via RUST_LOG environment variable

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Logging switches chosen on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Mirror log records to stderr.
    pub console: bool,
    /// Default to `debug` instead of `info` when RUST_LOG is unset.
    pub debug: bool,
}

/// Initialize logging system.
///
/// Creates the log directory if needed, clears the previous log file,
/// and installs the global subscriber.
///
/// # Returns
///
/// LoggingGuard that must be kept alive for logging to work
///
/// # Errors
///
/// Returns error if the log directory cannot be created or the log file
/// cannot be cleared
pub fn init_logging(log_file: &Path, options: LoggingOptions) -> Result<LoggingGuard, io::Error> {
    let (log_dir, file_name) = split_log_path(log_file)?;
    prepare_log_file(&log_dir, &file_name)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    let console_layer = options.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(true)
            .compact()
    });

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(options.debug)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Filter directive used when RUST_LOG is not set.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Creates the directory and truncates the file.
fn prepare_log_file(log_dir: &Path, file_name: &str) -> Result<(), io::Error> {
    fs::create_dir_all(log_dir)?;
    fs::write(log_dir.join(file_name), "")
}

fn split_log_path(log_file: &Path) -> Result<(PathBuf, String), io::Error> {
    let file_name = log_file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid log file path: {}", log_file.display()),
            )
        })?
        .to_string();
    let log_dir = match log_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((log_dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "info");
        assert_eq!(default_filter(true), "debug");
    }

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("/var/log/fanjoin.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log"));
        assert_eq!(name, "fanjoin.log");

        let (dir, name) = split_log_path(Path::new("run.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "run.log");

        assert!(split_log_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_prepare_creates_nested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("deep").join("nested");

        prepare_log_file(&log_dir, "test.log").unwrap();

        let log_path = log_dir.join("test.log");
        assert!(log_path.exists());
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "");
    }

    #[test]
    fn test_prepare_clears_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");
        fs::write(&log_path, "old log data").unwrap();

        prepare_log_file(temp_dir.path(), "test.log").unwrap();

        assert_eq!(fs::read_to_string(&log_path).unwrap(), "");
    }

    #[test]
    fn test_guard_structure() {
        use tracing_appender::non_blocking::NonBlocking;

        let (non_blocking, guard) = NonBlocking::new(std::io::sink());
        drop(non_blocking);

        let _logging_guard = LoggingGuard { _file_guard: guard };
    }

    // Actual log output needs a global subscriber, which can only be set once
    // per process; the CLI integration tests cover it.
}
