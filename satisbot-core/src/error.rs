//! Error types for satisbot-core

use thiserror::Error;

/// Main error type for the satisbot-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A log pattern matched but one of its capture groups was absent.
    ///
    /// This means the pattern table and the server's log format have
    /// drifted apart. It is never used for ordinary unrecognized lines.
    #[error("malformed match for '{pattern}' pattern: capture group {group} is missing")]
    MalformedMatch { pattern: &'static str, group: usize },

    /// A captured server timestamp could not be normalized
    #[error("invalid server timestamp '{value}': {message}")]
    Timestamp { value: String, message: String },

    /// Chat transport error (reported by `PurgeChannel` implementations)
    #[error("transport error: {0}")]
    Transport(String),

    /// History pagination stopped making progress
    #[error("pagination error: {0}")]
    Pagination(String),
}

impl Error {
    /// True for errors that signal a pattern/log-format mismatch
    pub fn is_malformed_match(&self) -> bool {
        matches!(self, Error::MalformedMatch { .. } | Error::Timestamp { .. })
    }
}

/// Result type alias for satisbot-core
pub type Result<T> = std::result::Result<T, Error>;
