//! Ingestion layer for the dedicated server's console log
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ FactoryGame.log │ ──► │  LogTailer   │ ──► │   parse()    │ ──► │ SessionTracker │
//! │  (appending)    │     │ (byte offset)│     │ (6 patterns) │     │  (Database)    │
//! └─────────────────┘     └──────────────┘     └──────────────┘     └────────────────┘
//! ```
//!
//! [`LogIngestor`] couples the tailer with the parser. Lines keep their
//! arrival order. A line that trips a pattern but fails to decode is logged
//! and recorded as a warning; it never stops the lines after it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use satisbot_core::ingest::{LogIngestor, LogTailer};
//!
//! let mut ingestor = LogIngestor::new(LogTailer::new("FactoryGame.log"));
//! let result = ingestor.poll().expect("failed to read log");
//! for event in &result.events {
//!     println!("{}", event.kind());
//! }
//! ```

mod parser;
mod tailer;
mod timestamp;

pub use parser::{matching_kinds, parse};
pub use tailer::{LogTailer, TailBatch};
pub use timestamp::normalize_timestamp;

use crate::error::Result;
use crate::types::LogEvent;

/// Events decoded from a run of log lines.
#[derive(Debug, Default)]
pub struct IngestResult {
    /// Recognized events, in line order
    pub events: Vec<LogEvent>,
    /// Number of lines examined
    pub lines_read: usize,
    /// Lines that matched a pattern but failed to decode
    pub warnings: Vec<String>,
    /// The log file was truncated (server restart) before this read
    pub truncated: bool,
}

/// Decode a sequence of lines, continuing past malformed ones.
///
/// `first_line_number` is only used to label warnings.
pub fn parse_lines<I, S>(lines: I, first_line_number: usize) -> IngestResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = IngestResult::default();

    for (i, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        result.lines_read += 1;

        match parse(line) {
            Ok(Some(event)) => {
                tracing::debug!(kind = %event.kind(), "Parsed log event");
                result.events.push(event);
            }
            Ok(None) => {}
            Err(e) => {
                let line_number = first_line_number + i;
                tracing::warn!(line = line_number, error = %e, "Failed to decode log line");
                result
                    .warnings
                    .push(format!("Line {}: {}", line_number, e));
            }
        }
    }

    result
}

/// Reads new log lines and decodes them.
pub struct LogIngestor {
    tailer: LogTailer,
    lines_seen: usize,
}

impl LogIngestor {
    /// Create an ingestor over the given tailer.
    pub fn new(tailer: LogTailer) -> Self {
        Self {
            tailer,
            lines_seen: 0,
        }
    }

    /// The underlying tailer.
    pub fn tailer(&self) -> &LogTailer {
        &self.tailer
    }

    /// Read and decode everything appended since the previous poll.
    pub fn poll(&mut self) -> Result<IngestResult> {
        let batch = self.tailer.read_new_lines()?;
        if batch.truncated {
            self.lines_seen = 0;
        }

        let mut result = parse_lines(&batch.lines, self.lines_seen + 1);
        result.truncated = batch.truncated;
        self.lines_seen += batch.lines.len();

        if !result.events.is_empty() || !result.warnings.is_empty() {
            tracing::info!(
                path = %self.tailer.path().display(),
                lines = result.lines_read,
                events = result.events.len(),
                warnings = result.warnings.len(),
                "Ingested log lines"
            );
        }

        Ok(result)
    }
}
