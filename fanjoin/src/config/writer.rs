//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented representation written by `config init`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let seed = config
        .simulation
        .seed
        .map(|s| s.to_string())
        .unwrap_or_default();

    format!(
        r#"[pool]
; Number of worker slots shared by F and G (default: 3)
workers = {}

[combine]
; Deadline for each sub-function in milliseconds (default: 1000)
; A sub-function that misses it is cancelled together with its sibling
timeout_ms = {}

[threshold]
; The error threshold applies once more than this many inputs completed (default: 10)
min_completed = {}
; Halt when either F or G fails on more than this share of completed inputs (default: 0.5)
max_failure_ratio = {}

[simulation]
; Simulated values are drawn from 0 up to value_range - 1 (default: 10)
value_range = {}
; Values below this are reported as failures (default: 3)
failure_below = {}
; Chance of taking the slow path on any call, 0.0 to 1.0 (default: 0.2)
slow_probability = {}
; Slow path delay in milliseconds (default: 1500)
slow_delay_ms = {}
; Normal delay of F and G in milliseconds (defaults: 100 and 300)
f_delay_ms = {}
g_delay_ms = {}
; Fixed random seed for repeatable runs; empty seeds from the OS
seed = {}

[logging]
; Log file, cleared at the start of each session (default: ~/.fanjoin/fanjoin.log)
file = {}
"#,
        config.pool.workers,
        config.combine.timeout_ms,
        config.threshold.min_completed,
        config.threshold.max_failure_ratio,
        config.simulation.value_range,
        config.simulation.failure_below,
        config.simulation.slow_probability,
        config.simulation.slow_delay_ms,
        config.simulation.f_delay_ms,
        config.simulation.g_delay_ms,
        seed,
        path_to_string(&config.logging.file),
    )
}

/// Render a path, collapsing the home directory back to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::ConfigFileError;
    use tempfile::TempDir;

    #[test]
    fn test_written_file_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.pool.workers = 4;
        config.threshold.max_failure_ratio = 0.25;
        config.simulation.seed = Some(7);
        config.logging.file = temp_dir.path().join("run.log");
        config.save_to(&config_path).unwrap();

        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_output_is_commented() {
        let text = to_config_string(&ConfigFile::default());
        assert!(text.contains("[threshold]"));
        assert!(text.contains("workers = 3"));
        assert!(text.contains("timeout_ms = 1000"));
        assert!(text.contains("seed = \n"));
        assert!(text.lines().filter(|l| l.starts_with(';')).count() > 5);
    }

    #[test]
    fn test_save_into_file_path_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let err = ConfigFile::default()
            .save_to(&blocker.join("config.ini"))
            .unwrap_err();
        assert!(matches!(err, ConfigFileError::DirectoryError(_)));
    }
}
