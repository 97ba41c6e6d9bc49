//! Configuration file for the fanjoin runtime.
//!
//! The user configuration lives in `~/.fanjoin/config.ini`. A missing file
//! means defaults; every key is optional.
//!
//! - [`settings`]: one plain struct per `[section]`
//! - [`defaults`]: `DEFAULT_*` constants and `ConfigFile::default()`
//! - `parser`: INI → [`ConfigFile`], with validation
//! - `writer`: [`ConfigFile`] → commented INI
//!
//! # Example
//!
//! ```ignore
//! use fanjoin::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let lifecycle = config.lifecycle_config();
//! assert_eq!(lifecycle.workers, 3);
//! ```

pub mod defaults;
mod file;
mod parser;
pub mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    CombineSettings, ConfigFile, LoggingSettings, PoolSettings, SimulationSettings,
    ThresholdSettings,
};
