//! Input stream of integers for the driver.
//!
//! Tokens are separated by any whitespace, including newlines. The stream
//! ends at end of input or at the first token that is not an integer.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Errors raised by the input source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be opened. Fatal at startup.
    #[error("input source unavailable: {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading failed part way through.
    #[error("failed to read input: {0}")]
    Read(#[from] std::io::Error),
}

/// Whitespace-delimited integer reader.
pub struct InputSource {
    reader: Box<dyn AsyncBufRead + Unpin + Send>,
    pending: VecDeque<String>,
    finished: bool,
    line: String,
}

impl InputSource {
    /// Opens a file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| SourceError::Unavailable {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "Input source opened");
        Ok(Self::from_reader(BufReader::new(file)))
    }

    /// Wraps any buffered reader.
    pub fn from_reader(reader: impl AsyncBufRead + Unpin + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            pending: VecDeque::new(),
            finished: false,
            line: String::new(),
        }
    }

    /// Convenience constructor over an in-memory string.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::from_reader(std::io::Cursor::new(text.into().into_bytes()))
    }

    /// Returns the next integer, or `None` at the end of the stream.
    pub async fn next_value(&mut self) -> Result<Option<i64>, SourceError> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if let Some(token) = self.pending.pop_front() {
                return match token.parse::<i64>() {
                    Ok(value) => Ok(Some(value)),
                    Err(_) => {
                        warn!(token = %token, "Non-integer token, ending input");
                        self.finished = true;
                        Ok(None)
                    }
                };
            }

            self.line.clear();
            if self.reader.read_line(&mut self.line).await? == 0 {
                self.finished = true;
                return Ok(None);
            }
            self.pending
                .extend(self.line.split_whitespace().map(str::to_string));
        }
    }

    /// Reads every remaining value.
    pub async fn collect_all(&mut self) -> Result<Vec<i64>, SourceError> {
        let mut values = Vec::new();
        while let Some(v) = self.next_value().await? {
            values.push(v);
        }
        Ok(values)
    }
}

impl std::fmt::Debug for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSource")
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
