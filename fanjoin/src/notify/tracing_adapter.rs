//! Sink that forwards notifications to `tracing`.

use super::NotificationSink;

/// Emits messages at `info` and errors at `error` level under the
/// `fanjoin::notify` target.
///
/// Useful when the log file is the only output, e.g. for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn on_message(&self, text: &str) {
        tracing::info!(target: "fanjoin::notify", "{}", text);
    }

    fn on_error(&self, text: &str) {
        tracing::error!(target: "fanjoin::notify", "{}", text);
    }
}
