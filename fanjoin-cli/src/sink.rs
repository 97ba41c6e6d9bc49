//! Notification sink that prints to the terminal.

use fanjoin::notify::NotificationSink;
use std::io::{self, Write};
use std::sync::Mutex;

/// Writes each notification as one line.
///
/// Messages and errors share one writer so lines keep their delivery order.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Sink writing to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Sink writing to any writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }

    fn write_line(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        // A closed stdout must not take the run down.
        let _ = writeln!(out, "{}", text).and_then(|_| out.flush());
    }
}

impl NotificationSink for ConsoleSink {
    fn on_message(&self, text: &str) {
        self.write_line(text);
    }

    fn on_error(&self, text: &str) {
        self.write_line(text);
    }
}
