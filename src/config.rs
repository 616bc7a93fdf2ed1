//! Configuration types for backup-sizer
//!
//! This module defines the per-iteration configuration with validation.
//! The command-line layer that produces these values lives outside the
//! library; everything here is already parsed and typed.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Maximum reasonable worker count per pool
pub const MAX_WORKERS: usize = 512;

/// Default number of file splitter workers
pub const DEFAULT_NUM_SPLITTERS: usize = 3;

/// Default number of hasher-compressor workers
pub const DEFAULT_NUM_HASHERS: usize = 3;

/// Validated configuration for one scan iteration
///
/// Immutable once constructed. Block sizes are sorted ascending and
/// deduplicated; the largest is the outer read-buffer capacity.
#[derive(Debug, Clone)]
pub struct IterationConfig {
    /// Root of the data files to hash
    pub data_dir: PathBuf,

    /// Root of the hash-log directory tree (one subdirectory per block size)
    pub hash_dir: PathBuf,

    /// Block sizes to evaluate, sorted ascending
    pub block_sizes: Vec<usize>,

    /// Target false-positive rate for the previous-iteration Bloom filter
    pub false_positive_rate: f64,

    /// Iteration index; names the new log and locates the prior one
    pub iteration: u64,

    /// Number of file splitter workers
    pub num_splitters: usize,

    /// Number of hasher-compressor workers
    pub num_hashers: usize,

    /// Number of outer buffers allocated at pipeline start
    pub max_in_flight_buffers: usize,
}

impl IterationConfig {
    /// Create a validated configuration with default worker counts
    ///
    /// The buffer pool defaults to `num_splitters * 2 + num_hashers`,
    /// which bounds the bytes in flight and doubles as backpressure.
    pub fn new(
        data_dir: impl Into<PathBuf>,
        hash_dir: impl Into<PathBuf>,
        block_sizes: &[usize],
        false_positive_rate: f64,
        iteration: u64,
    ) -> Result<Self, ConfigError> {
        Self::with_workers(
            data_dir,
            hash_dir,
            block_sizes,
            false_positive_rate,
            iteration,
            DEFAULT_NUM_SPLITTERS,
            DEFAULT_NUM_HASHERS,
            DEFAULT_NUM_SPLITTERS * 2 + DEFAULT_NUM_HASHERS,
        )
    }

    /// Create a validated configuration with explicit pipeline sizing
    #[allow(clippy::too_many_arguments)]
    pub fn with_workers(
        data_dir: impl Into<PathBuf>,
        hash_dir: impl Into<PathBuf>,
        block_sizes: &[usize],
        false_positive_rate: f64,
        iteration: u64,
        num_splitters: usize,
        num_hashers: usize,
        max_in_flight_buffers: usize,
    ) -> Result<Self, ConfigError> {
        if block_sizes.is_empty() {
            return Err(ConfigError::NoBlockSizes);
        }
        if block_sizes.contains(&0) {
            return Err(ConfigError::ZeroBlockSize);
        }

        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(ConfigError::InvalidFalsePositiveRate {
                rate: false_positive_rate,
            });
        }

        for count in [num_splitters, num_hashers] {
            if count == 0 || count > MAX_WORKERS {
                return Err(ConfigError::InvalidWorkerCount {
                    count,
                    max: MAX_WORKERS,
                });
            }
        }

        // Every splitter and hasher can hold a buffer; anything less than
        // one per worker deadlocks the pipeline.
        let min_buffers = num_splitters + num_hashers;
        if max_in_flight_buffers < min_buffers {
            return Err(ConfigError::InvalidBufferCount {
                count: max_in_flight_buffers,
                min: min_buffers,
            });
        }

        let mut block_sizes = block_sizes.to_vec();
        block_sizes.sort_unstable();
        block_sizes.dedup();

        Ok(Self {
            data_dir: data_dir.into(),
            hash_dir: hash_dir.into(),
            block_sizes,
            false_positive_rate,
            iteration,
            num_splitters,
            num_hashers,
            max_in_flight_buffers,
        })
    }

    /// The largest configured block size; capacity of every outer buffer
    pub fn max_block_size(&self) -> usize {
        *self
            .block_sizes
            .last()
            .expect("validated config has at least one block size")
    }
}
