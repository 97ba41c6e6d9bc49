//! Sink that records notifications in memory.

use super::NotificationSink;
use std::sync::Mutex;

/// A recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Informational line.
    Message(String),
    /// Error line.
    Error(String),
}

/// Records every notification in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Notification>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications in arrival order.
    pub fn all(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    /// Informational lines only.
    pub fn messages(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Message(text) => Some(text.clone()),
                Notification::Error(_) => None,
            })
            .collect()
    }

    /// Error lines only.
    pub fn errors(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Error(text) => Some(text.clone()),
                Notification::Message(_) => None,
            })
            .collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl NotificationSink for MemorySink {
    fn on_message(&self, text: &str) {
        self.lock().push(Notification::Message(text.to_string()));
    }

    fn on_error(&self, text: &str) {
        self.lock().push(Notification::Error(text.to_string()));
    }
}
