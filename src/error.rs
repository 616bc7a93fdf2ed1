//! Error types for backup-sizer
//!
//! This module defines the error hierarchy for an estimation run:
//! - Configuration validation errors
//! - File enumeration and per-file I/O errors
//! - Hash log I/O and corruption errors
//! - Replication log (oplog) sampling errors
//! - The aggregate worker-error report produced at iteration end
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include the path or value that failed
//! - Preserve error chains for debugging

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the backup-sizer library
#[derive(Error, Debug)]
pub enum SizerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Hash log errors (creation, append, corruption)
    #[error("Hash log error: {0}")]
    HashLog(#[from] HashLogError),

    /// Replication log errors
    #[error("Replication log error: {0}")]
    Oplog(#[from] OplogError),

    /// Instance probe failures, propagated verbatim
    #[error("Instance probe error: {0}")]
    Probe(String),

    /// I/O errors (file reads, directory listing)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Aggregate report of worker errors collected during an iteration
    #[error("{0}")]
    Aggregate(#[from] AggregateError),

    /// Broken internal invariant
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// Iteration cancelled via the cancellation flag
    #[error("Iteration cancelled")]
    Cancelled,

    /// Channel closed unexpectedly
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No block sizes configured
    #[error("At least one block size is required")]
    NoBlockSizes,

    /// A block size of zero was configured
    #[error("Block sizes must be positive")]
    ZeroBlockSize,

    /// False-positive rate outside (0, 1)
    #[error("Invalid false-positive rate {rate}: must be in (0, 1)")]
    InvalidFalsePositiveRate { rate: f64 },

    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Buffer pool too small to keep the pipeline moving
    #[error("Invalid buffer count {count}: must be at least {min}")]
    InvalidBufferCount { count: usize, min: usize },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },
}

/// Hash log errors
///
/// Hash logs are the ground truth for the next iteration's dedup rate, so
/// any failure here is fatal for the iteration.
#[derive(Error, Debug)]
pub enum HashLogError {
    /// Failed to create a log file or its parent directory
    #[error("Failed to create hash log '{path}': {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to append a record
    #[error("Failed to write hash log '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a prior iteration's log
    #[error("Failed to read hash log '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Log size is not a whole number of records
    #[error("Hash log '{path}' is corrupt: size {size} is not a multiple of {record_len} bytes")]
    Corrupt {
        path: PathBuf,
        size: u64,
        record_len: u64,
    },
}

/// Replication log errors
#[derive(Error, Debug)]
pub enum OplogError {
    /// The replication log collection does not exist on this instance
    #[error("Replication log collection does not exist")]
    NotFound,

    /// Start timestamp after end timestamp
    #[error("Start timestamp ({first}) cannot be later than end timestamp ({last})")]
    InvalidTimeRange { first: u32, last: u32 },

    /// The replication log is not a capped collection
    #[error("Replication log is not capped")]
    NotCapped,

    /// Snappy encoding failed
    #[error("Snappy encoding failed: {0}")]
    Compression(#[from] snap::Error),

    /// Iterator failure from the instance probe
    #[error("Replication log iterator failed: {0}")]
    Iterator(String),
}

/// Maximum number of worker error messages retained verbatim
pub const MAX_RETAINED_ERRORS: usize = 5;

/// Aggregate of all worker errors collected during one iteration
///
/// Retains the first [`MAX_RETAINED_ERRORS`] messages verbatim and the
/// total count of errors received.
#[derive(Debug)]
pub struct AggregateError {
    /// Total number of errors received
    pub total: u64,

    /// First few error messages, in arrival order
    pub retained: Vec<String>,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Encountered {} errors. Printing first {}.",
            self.total, MAX_RETAINED_ERRORS
        )?;
        for (n, msg) in self.retained.iter().enumerate() {
            writeln!(f, "Error {}: {}", n + 1, msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Result type alias for SizerError
pub type Result<T> = std::result::Result<T, SizerError>;
