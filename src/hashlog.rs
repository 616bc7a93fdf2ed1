//! Hash log files
//!
//! One log per (block size, iteration) pair at `<hash_dir>/<b>/<i>`.
//! Records are fixed width: 64 lowercase hex characters and a newline,
//! 65 bytes total. The fixed width lets the next iteration count records
//! from the file size without a pre-scan. No header, no footer, no sort
//! order; write order is arrival order at the aggregator.

use crate::error::HashLogError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Bytes per record: 64 hex digits plus a newline
pub const HASH_RECORD_LEN: u64 = 65;

/// Path of the hash log for one (block size, iteration) pair
pub fn log_path(hash_dir: &Path, block_size: usize, iteration: u64) -> PathBuf {
    hash_dir
        .join(block_size.to_string())
        .join(iteration.to_string())
}

/// Number of records in an existing hash log
///
/// Derived from the file size; a size that is not a whole number of
/// records means the log was truncated or tampered with and is an error,
/// never silently rounded.
pub fn count_records(path: &Path) -> Result<u64, HashLogError> {
    let size = std::fs::metadata(path)
        .map_err(|source| HashLogError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    if size % HASH_RECORD_LEN != 0 {
        return Err(HashLogError::Corrupt {
            path: path.to_path_buf(),
            size,
            record_len: HASH_RECORD_LEN,
        });
    }
    Ok(size / HASH_RECORD_LEN)
}

/// Append-only writer for one hash log
///
/// Owned by the aggregator for the duration of an iteration; the log is
/// flushed and closed before results are published.
pub struct HashLogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl HashLogWriter {
    /// Create the log for this iteration, creating the per-block-size
    /// directory as needed. An existing log at the same path is
    /// truncated.
    pub fn create(hash_dir: &Path, block_size: usize, iteration: u64) -> Result<Self, HashLogError> {
        let path = log_path(hash_dir, block_size, iteration);
        let parent = path.parent().expect("log path always has a parent");

        std::fs::create_dir_all(parent).map_err(|source| HashLogError::Create {
            path: path.clone(),
            source,
        })?;
        let file = File::create(&path).map_err(|source| HashLogError::Create {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Append one digest record
    pub fn append(&mut self, digest: &str) -> Result<(), HashLogError> {
        debug_assert_eq!(digest.len() as u64, HASH_RECORD_LEN - 1);
        self.writer
            .write_all(digest.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|source| HashLogError::Write {
                path: self.path.clone(),
                source,
            })
    }

    /// Flush buffered records and close the log
    pub fn finish(mut self) -> Result<(), HashLogError> {
        self.writer.flush().map_err(|source| HashLogError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Path of the log being written
    pub fn path(&self) -> &Path {
        &self.path
    }
}
