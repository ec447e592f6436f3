//! Log line classification
//!
//! [`parse`] checks one console line against an ordered table of patterns
//! and decodes the first match into a [`LogEvent`].
//!
//! ## Outcomes
//!
//! - `Ok(None)`: the line is not one we care about (most lines)
//! - `Ok(Some(event))`: exactly one pattern matched; every field is populated
//! - `Err(_)`: a pattern matched but a capture was missing or the timestamp
//!   did not normalize. This means the pattern table no longer fits the
//!   server's log format; callers should log it and move on to the next line.
//!
//! ## Pattern order
//!
//! Patterns are tried in this fixed order, first match wins:
//!
//! | # | Kind | Marker |
//! |---|------|--------|
//! | 1 | Log file open | `Log file open, ` |
//! | 2 | Command line | `LogInit: Command Line: ` |
//! | 3 | Login request | `LogNet: Login request:` |
//! | 4 | Join request | `LogNet: Join request:` |
//! | 5 | Join succeeded | `LogNet: Join succeeded:` |
//! | 6 | Connection close | `LogNet: UNetConnection::Close:` |

use crate::error::{Error, Result};
use crate::ingest::timestamp::normalize_timestamp;
use crate::types::{LogEvent, LogEventKind};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// One entry of the pattern table.
struct LinePattern {
    kind: LogEventKind,
    regex: Regex,
    decode: fn(&Captures<'_>) -> Result<LogEvent>,
}

// Timestamped lines look like `[2024.01.15-12.31.00:417][ 12]LogNet: ...`.
const STAMP: &str = r"^\[([^\]]+)\]\[[^\]]*\]";

static PATTERNS: Lazy<Vec<LinePattern>> = Lazy::new(|| {
    vec![
        LinePattern {
            kind: LogEventKind::LogFileOpen,
            regex: compile(r"^Log file open, (.*)$"),
            decode: decode_log_file_open,
        },
        LinePattern {
            kind: LogEventKind::CommandLine,
            regex: compile(r"^LogInit: Command Line: (.*)$"),
            decode: decode_command_line,
        },
        LinePattern {
            kind: LogEventKind::LoginRequest,
            regex: compile(&format!(
                r"{}LogNet: Login request: .*\?Name=([^?]+?)(?:\?.*?)? userId: (.+?) platform: .*$",
                STAMP
            )),
            decode: decode_login_request,
        },
        LinePattern {
            kind: LogEventKind::JoinRequest,
            regex: compile(&format!(
                r"{}LogNet: Join request: .*\?Name=([^?]+)\?SplitscreenCount=.*$",
                STAMP
            )),
            decode: decode_join_request,
        },
        LinePattern {
            kind: LogEventKind::JoinSucceeded,
            regex: compile(&format!(r"{}LogNet: Join succeeded: (.+)$", STAMP)),
            decode: decode_join_succeeded,
        },
        LinePattern {
            kind: LogEventKind::ConnectionClose,
            regex: compile(&format!(
                r"{}LogNet: UNetConnection::Close: .*, Driver: GameNetDriver .*, UniqueId: ([^,]+),.*$",
                STAMP
            )),
            decode: decode_connection_close,
        },
    ]
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern)
        .unwrap_or_else(|e| panic!("invalid built-in log pattern {}: {}", pattern, e))
}

fn decode_log_file_open(caps: &Captures<'_>) -> Result<LogEvent> {
    Ok(LogEvent::LogFileOpen {
        date: group(caps, LogEventKind::LogFileOpen, 1)?.to_string(),
    })
}

fn decode_command_line(caps: &Captures<'_>) -> Result<LogEvent> {
    Ok(LogEvent::CommandLine {
        command_line: group(caps, LogEventKind::CommandLine, 1)?.to_string(),
    })
}

fn decode_login_request(caps: &Captures<'_>) -> Result<LogEvent> {
    let kind = LogEventKind::LoginRequest;
    Ok(LogEvent::LoginRequest {
        timestamp: normalize_timestamp(group(caps, kind, 1)?)?,
        name: group(caps, kind, 2)?.to_string(),
        user_id: group(caps, kind, 3)?.to_string(),
    })
}

fn decode_join_request(caps: &Captures<'_>) -> Result<LogEvent> {
    let kind = LogEventKind::JoinRequest;
    Ok(LogEvent::JoinRequest {
        timestamp: normalize_timestamp(group(caps, kind, 1)?)?,
        name: group(caps, kind, 2)?.to_string(),
    })
}

fn decode_join_succeeded(caps: &Captures<'_>) -> Result<LogEvent> {
    let kind = LogEventKind::JoinSucceeded;
    Ok(LogEvent::JoinSucceeded {
        timestamp: normalize_timestamp(group(caps, kind, 1)?)?,
        name: group(caps, kind, 2)?.to_string(),
    })
}

fn decode_connection_close(caps: &Captures<'_>) -> Result<LogEvent> {
    let kind = LogEventKind::ConnectionClose;
    Ok(LogEvent::ConnectionClose {
        timestamp: normalize_timestamp(group(caps, kind, 1)?)?,
        user_id: group(caps, kind, 2)?.to_string(),
    })
}

/// Fetch a capture group that the pattern guarantees.
fn group<'h>(caps: &Captures<'h>, kind: LogEventKind, index: usize) -> Result<&'h str> {
    caps.get(index)
        .map(|m| m.as_str())
        .ok_or(Error::MalformedMatch {
            pattern: kind.as_str(),
            group: index,
        })
}

/// Decode one log line.
///
/// Trailing whitespace (including the `\r` of CRLF logs) is ignored.
/// Leading whitespace is not: every pattern is anchored at the line start.
pub fn parse(line: &str) -> Result<Option<LogEvent>> {
    let line = line.trim_end();

    for pattern in PATTERNS.iter() {
        if let Some(caps) = pattern.regex.captures(line) {
            return (pattern.decode)(&caps).map(Some);
        }
    }

    Ok(None)
}

/// Kinds whose pattern matches `line`, ignoring order and decoding.
///
/// Used to check that the patterns do not overlap.
pub fn matching_kinds(line: &str) -> Vec<LogEventKind> {
    let line = line.trim_end();
    PATTERNS
        .iter()
        .filter(|p| p.regex.is_match(line))
        .map(|p| p.kind)
        .collect()
}
