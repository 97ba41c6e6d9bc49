//! Notification sink trait definition.

/// Receiver of user-facing notifications.
///
/// Informational messages cover sub-function progress and successful
/// results; error messages cover timeouts, failures and the terminal
/// threshold condition. Each call carries one fully rendered line.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; notifications arrive from the
/// driver task and from pool workers.
pub trait NotificationSink: Send + Sync {
    /// Receives an informational line.
    fn on_message(&self, text: &str);

    /// Receives an error line.
    fn on_error(&self, text: &str);
}
