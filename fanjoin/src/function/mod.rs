//! Slow, unreliable sub-functions.
//!
//! The orchestrator only depends on the [`SlowFunction`] trait. Production
//! runs use [`SimulatedFunction`], which manufactures values, delays and
//! failures at random; tests plug in [`FixedFunction`] or [`FnFunction`] for
//! deterministic timing and outcomes.

mod simulated;
mod stub;

pub use simulated::{SimulatedFunction, SimulationConfig};
pub use stub::{FixedFunction, FnFunction};

use crate::outcome::Outcome;
use futures::future::BoxFuture;

/// A slow operation that maps an input to an [`Outcome`] after some delay.
///
/// Implementations must stop at an await point when the returned future is
/// dropped; the worker pool cancels work by dropping it.
pub trait SlowFunction: Send + Sync {
    /// Name used in logs and progress messages.
    fn name(&self) -> &str;

    /// Computes the outcome for `x`.
    fn compute(&self, x: i64) -> BoxFuture<'static, Outcome>;
}
