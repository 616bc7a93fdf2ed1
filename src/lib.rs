//! backup-sizer - Backup Workload Size Estimation
//!
//! A library for estimating the size and compressibility of a backup
//! workload by repeatedly scanning the data files of a running database
//! replica. Each pass decomposes every file into fixed-size blocks at
//! several candidate block sizes at once and reports, per block size, how
//! well the blocks compress and what fraction duplicate blocks seen on
//! the previous pass. The numbers size a deduplicating, compressing
//! block-based backup store.
//!
//! # Features
//!
//! - **Multi-block-size analysis**: One streaming pass evaluates every
//!   configured block size; files are read once into buffers of the
//!   largest size and re-sliced for the smaller ones.
//!
//! - **Bounded memory**: A fixed pool of outer buffers recycles between
//!   the splitter and hasher pools, bounding bytes in flight and applying
//!   backpressure. Whole files are never materialized.
//!
//! - **Probabilistic dedup accounting**: The previous iteration's hash
//!   log is replayed into a Bloom filter sized for a caller-chosen
//!   false-positive rate, so dedup detection costs bits per digest, not
//!   the digest set.
//!
//! - **Replication log sampling**: Throughput (GiB/day) from the log's
//!   time window and capped size, plus a snappy compression ratio over
//!   batched documents.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Data directory                            │
//! │            (files filtered by storage-engine rules)              │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ file paths
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Splitter pool ──▶ outer buffers ──▶ Hasher pool                 │
//! │       ▲                                  │                       │
//! │       └────────── buffer pool ◀──────────┘                       │
//! │                                          │ block records         │
//! │                                          ▼                       │
//! │  Bloom filter (iteration i-1) ──▶ Aggregator ──▶ hash logs +     │
//! │                                               per-size stats     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use backup_sizer::{BlockScan, IterationConfig, StaticProbe};
//!
//! let config = IterationConfig::new(
//!     "/data/db",
//!     "/var/lib/backup-sizer/hashes",
//!     &[16 * 1024, 64 * 1024, 256 * 1024],
//!     0.01,
//!     0,
//! )?;
//!
//! let probe = StaticProbe::for_dir("/data/db");
//! let stats = BlockScan::new(config).run(&probe)?;
//!
//! for (block_size, stat) in &stats {
//!     println!(
//!         "{}: dedup {:.3}, compression {:.3}",
//!         block_size, stat.dedup_rate, stat.data_compression_ratio
//!     );
//! }
//! # Ok::<(), backup_sizer::SizerError>(())
//! ```

pub mod bloom;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod hashlog;
pub mod oplog;
pub mod pipeline;
pub mod probe;
pub mod stats;

pub use bloom::{bloom_params, BloomFilter};
pub use config::IterationConfig;
pub use error::{AggregateError, Result, SizerError};
pub use oplog::{sample_oplog, OplogInfo, OplogStats};
pub use pipeline::{BlockRecord, BlockScan};
pub use probe::{
    exclude_patterns_for, InstanceProbe, ReplicationLogIter, StaticProbe, StorageEngine,
};
pub use stats::{AllBlockSizeStats, BlockStats};
