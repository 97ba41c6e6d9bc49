//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [pool] section
    if let Some(section) = ini.section(Some("pool")) {
        if let Some(v) = section.get("workers") {
            let workers: usize = parse_value("pool", "workers", v, "must be a positive integer")?;
            if workers == 0 {
                return Err(invalid("pool", "workers", v, "must be at least 1"));
            }
            config.pool.workers = workers;
        }
    }

    // [combine] section
    if let Some(section) = ini.section(Some("combine")) {
        if let Some(v) = section.get("timeout_ms") {
            let timeout: u64 = parse_value(
                "combine",
                "timeout_ms",
                v,
                "must be a positive integer (milliseconds)",
            )?;
            if timeout == 0 {
                return Err(invalid("combine", "timeout_ms", v, "must be greater than 0"));
            }
            config.combine.timeout_ms = timeout;
        }
    }

    // [threshold] section
    if let Some(section) = ini.section(Some("threshold")) {
        if let Some(v) = section.get("min_completed") {
            config.threshold.min_completed = parse_value(
                "threshold",
                "min_completed",
                v,
                "must be a non-negative integer",
            )?;
        }
        if let Some(v) = section.get("max_failure_ratio") {
            config.threshold.max_failure_ratio = parse_ratio("threshold", "max_failure_ratio", v)?;
        }
    }

    // [simulation] section
    if let Some(section) = ini.section(Some("simulation")) {
        if let Some(v) = section.get("value_range") {
            let range: i64 = parse_value("simulation", "value_range", v, "must be an integer")?;
            if range <= 0 {
                return Err(invalid("simulation", "value_range", v, "must be greater than 0"));
            }
            config.simulation.value_range = range;
        }
        if let Some(v) = section.get("failure_below") {
            config.simulation.failure_below =
                parse_value("simulation", "failure_below", v, "must be an integer")?;
        }
        if let Some(v) = section.get("slow_probability") {
            config.simulation.slow_probability =
                parse_ratio("simulation", "slow_probability", v)?;
        }
        if let Some(v) = section.get("slow_delay_ms") {
            config.simulation.slow_delay_ms = parse_value(
                "simulation",
                "slow_delay_ms",
                v,
                "must be a non-negative integer (milliseconds)",
            )?;
        }
        if let Some(v) = section.get("f_delay_ms") {
            config.simulation.f_delay_ms = parse_value(
                "simulation",
                "f_delay_ms",
                v,
                "must be a non-negative integer (milliseconds)",
            )?;
        }
        if let Some(v) = section.get("g_delay_ms") {
            config.simulation.g_delay_ms = parse_value(
                "simulation",
                "g_delay_ms",
                v,
                "must be a non-negative integer (milliseconds)",
            )?;
        }
        if let Some(v) = section.get("seed") {
            let v = v.trim();
            config.simulation.seed = if v.is_empty() {
                None
            } else {
                Some(parse_value("simulation", "seed", v, "must be an unsigned integer or empty")?)
            };
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_ratio(section: &str, key: &str, value: &str) -> Result<f64, ConfigFileError> {
    let ratio: f64 = parse_value(section, key, value, "must be a number between 0.0 and 1.0")?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(invalid(section, key, value, "must be a number between 0.0 and 1.0"));
    }
    Ok(ratio)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
