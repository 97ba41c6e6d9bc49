//! Output gate in front of a notification sink.

use super::NotificationSink;
use std::fmt::Arguments;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A [`NotificationSink`] behind a pause switch.
///
/// Pausing affects visibility only. Notifications issued while paused are
/// dropped; resuming does not replay them.
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    paused: AtomicBool,
}

impl Notifier {
    /// Creates an open (unpaused) gate in front of `sink`.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            paused: AtomicBool::new(false),
        }
    }

    /// Delivers an informational line unless paused.
    pub fn message(&self, args: Arguments<'_>) {
        if !self.is_paused() {
            self.sink.on_message(&args.to_string());
        }
    }

    /// Delivers an error line unless paused.
    pub fn error(&self, args: Arguments<'_>) {
        if !self.is_paused() {
            self.sink.on_error(&args.to_string());
        }
    }

    /// Stops delivery.
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            debug!("Output paused");
        }
    }

    /// Restarts delivery.
    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            debug!("Output resumed");
        }
    }

    /// Returns true while delivery is suppressed.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("paused", &self.is_paused())
            .finish_non_exhaustive()
    }
}
