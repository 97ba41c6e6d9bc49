//! Sink that discards every notification.

use super::NotificationSink;

/// Discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl NotificationSink for NoOpSink {
    #[inline]
    fn on_message(&self, _text: &str) {}

    #[inline]
    fn on_error(&self, _text: &str) {}
}
