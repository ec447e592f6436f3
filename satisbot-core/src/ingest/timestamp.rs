//! Server timestamp normalization
//!
//! The dedicated server stamps log lines as `YYYY.MM.DD-HH.MM.SS`, usually
//! followed by `:mmm` milliseconds (`[2024.01.15-12.31.00:417][ 12]LogNet: ...`).
//! These are UTC wall-clock values; no timezone adjustment is applied.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

const SERVER_FORMAT: &str = "%Y.%m.%d-%H.%M.%S";

/// Convert a server timestamp into a UTC instant.
///
/// The optional `:mmm` suffix becomes the instant's milliseconds.
pub fn normalize_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let (date_time, millis) = match raw.split_once(':') {
        Some((date_time, millis)) => (date_time, Some(millis)),
        None => (raw, None),
    };

    let parsed =
        NaiveDateTime::parse_from_str(date_time, SERVER_FORMAT).map_err(|e| Error::Timestamp {
            value: raw.to_string(),
            message: e.to_string(),
        })?;

    let millis = match millis {
        None => 0,
        Some(m) if m.len() == 3 && m.bytes().all(|b| b.is_ascii_digit()) => {
            m.parse::<i64>().map_err(|e| Error::Timestamp {
                value: raw.to_string(),
                message: e.to_string(),
            })?
        }
        Some(m) => {
            return Err(Error::Timestamp {
                value: raw.to_string(),
                message: format!("expected three millisecond digits, got '{}'", m),
            })
        }
    };

    Ok(parsed.and_utc() + chrono::Duration::milliseconds(millis))
}
