//! Incremental reader for the server's console log
//!
//! The tailer remembers a byte offset and only hands out complete lines
//! written after it. A trailing line without its newline is left in place
//! until the server finishes writing it.
//!
//! The dedicated server starts a fresh log file on every restart. The tailer
//! keeps the first bytes of the file it is reading; when the file no longer
//! starts with them, or is shorter than the remembered offset, it is read
//! again from the top.

use crate::error::Result;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Leading bytes compared to recognize a replaced log file
const FINGERPRINT_LEN: u64 = 256;

/// Lines read by one [`LogTailer::read_new_lines`] call.
#[derive(Debug, Default)]
pub struct TailBatch {
    /// Complete lines, newline stripped
    pub lines: Vec<String>,
    /// Offset just past the last complete line
    pub new_offset: u64,
    /// The file was replaced or shrank, and was re-read from 0
    pub truncated: bool,
}

/// Tracks a read position in a growing log file.
#[derive(Debug, Clone)]
pub struct LogTailer {
    path: PathBuf,
    offset: u64,
    fingerprint: Vec<u8>,
}

impl LogTailer {
    /// Tail `path` from the beginning.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_offset(path, 0)
    }

    /// Resume tailing `path` from a known offset.
    pub fn with_offset(path: impl Into<PathBuf>, offset: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            fingerprint: Vec::new(),
        }
    }

    /// Tail `path` from its current end, skipping existing content.
    ///
    /// A missing file is tailed from offset 0 once it appears.
    pub fn from_end(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new(path)),
            Err(e) => return Err(e.into()),
        };
        let offset = file.metadata()?.len();
        let fingerprint = read_fingerprint(&mut file, offset)?;
        Ok(Self {
            path,
            offset,
            fingerprint,
        })
    }

    /// The file being tailed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current read position.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read every complete line written since the last call.
    pub fn read_new_lines(&mut self) -> Result<TailBatch> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Log file not present yet");
                return Ok(TailBatch {
                    new_offset: self.offset,
                    ..Default::default()
                });
            }
            Err(e) => return Err(e.into()),
        };
        let file_size = file.metadata()?.len();
        let head = read_fingerprint(&mut file, file_size)?;

        let mut batch = TailBatch::default();

        if self.offset > file_size || !head.starts_with(&self.fingerprint) {
            tracing::warn!(
                path = %self.path.display(),
                offset = self.offset,
                file_size,
                "Log file replaced or truncated, reading from the beginning"
            );
            self.offset = 0;
            batch.truncated = true;
        }
        self.fingerprint = head;

        if self.offset == file_size {
            batch.new_offset = self.offset;
            return Ok(batch);
        }

        file.seek(SeekFrom::Start(self.offset))?;

        let mut buf = Vec::with_capacity((file_size - self.offset) as usize);
        file.take(file_size - self.offset).read_to_end(&mut buf)?;

        // Only consume up to the last newline; the rest is still being written.
        let complete = match buf.iter().rposition(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None => 0,
        };

        batch.lines = buf[..complete]
            .split(|&b| b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect();
        // `split` yields an empty tail after the final newline.
        batch.lines.pop();

        self.offset += complete as u64;
        batch.new_offset = self.offset;

        Ok(batch)
    }
}

fn read_fingerprint(file: &mut File, file_size: u64) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(0))?;
    let mut head = Vec::new();
    file.by_ref()
        .take(FINGERPRINT_LEN.min(file_size))
        .read_to_end(&mut head)?;
    Ok(head)
}
