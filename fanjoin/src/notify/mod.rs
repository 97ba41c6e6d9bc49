//! Notification plumbing between the orchestrator and whoever displays
//! results.
//!
//! # Architecture
//!
//! - [`NotificationSink`]: the external interface (`on_message` / `on_error`)
//! - [`TracingSink`]: forwards notifications to the `tracing` crate
//! - [`MemorySink`]: records notifications, for tests and embedding
//! - [`NoOpSink`]: discards everything
//! - [`Notifier`]: a sink behind the output gate; while paused, notifications
//!   are dropped rather than queued
//!
//! ```
//! use fanjoin::notify::{MemorySink, Notifier};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new());
//! let notifier = Notifier::new(sink.clone());
//!
//! notifier.message(format_args!("Result for x = {}: {}", 5, 7));
//! notifier.pause();
//! notifier.error(format_args!("dropped while paused"));
//!
//! assert_eq!(sink.messages(), vec!["Result for x = 5: 7".to_string()]);
//! assert!(sink.errors().is_empty());
//! ```

mod memory;
mod noop;
mod notifier;
mod tracing_adapter;
mod r#trait;

pub use memory::{MemorySink, Notification};
pub use noop::NoOpSink;
pub use notifier::Notifier;
pub use r#trait::NotificationSink;
pub use tracing_adapter::TracingSink;
