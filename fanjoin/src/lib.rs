//! fanjoin - fan-out/join orchestration of slow, unreliable functions
//!
//! For each integer input the library computes `F(x) + G(x)`, where F and G
//! are slow operations that may fail. The two run in parallel on a bounded
//! worker pool under a per-call deadline; a failure or timeout on one side
//! cancels the other, results are memoized per input, and a circuit breaker
//! halts the run once either side fails too often.
//!
//! # High-Level API
//!
//! The [`lifecycle`] module ties everything together:
//!
//! ```ignore
//! use std::sync::Arc;
//! use fanjoin::function::{SimulatedFunction, SimulationConfig};
//! use fanjoin::lifecycle::{LifecycleConfig, LifecycleController};
//! use fanjoin::notify::TracingSink;
//! use fanjoin::source::InputSource;
//!
//! let controller = LifecycleController::new(
//!     LifecycleConfig::default(),
//!     Arc::new(SimulatedFunction::new("F", SimulationConfig::default())),
//!     Arc::new(SimulatedFunction::new("G", SimulationConfig::default())),
//!     Arc::new(TracingSink),
//! );
//! let summary = controller.run(InputSource::open("input.txt").await?).await?;
//! ```

pub mod cache;
pub mod config;
pub mod function;
pub mod lifecycle;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod orchestrator;
pub mod outcome;
pub mod pool;
pub mod source;

/// Version of the fanjoin library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
