//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`console`] - Interactive control of a run from stdin
//! - [`run`] - Batch run over an input file

pub mod config;
pub mod console;
pub mod run;
