//! Iteration coordinator - orchestrates one block-analysis pass
//!
//! The coordinator is responsible for:
//! - Enumerating the backup-relevant files through the instance probe
//! - Loading the previous iteration's Bloom filters before anything runs
//! - Wiring the splitter, hasher, and aggregator stages with bounded
//!   channels and the shared buffer pool
//! - Deterministic termination: the file queue closes first, each stage's
//!   output channel closes when its workers finish, and the error channel
//!   closes exactly once after every worker has joined
//! - Surfacing either the statistics snapshot or the aggregate error

use crate::bloom::{self, BloomFilter};
use crate::config::IterationConfig;
use crate::enumerate::{compile_exclude_patterns, list_backup_files, total_file_size};
use crate::error::{Result, SizerError};
use crate::hashlog::{self, HashLogWriter};
use crate::pipeline::buffer::BufferPool;
use crate::pipeline::collector::ErrorCollector;
use crate::pipeline::{spawn_aggregator, spawn_hashers, spawn_splitters};
use crate::probe::InstanceProbe;
use crate::stats::AllBlockSizeStats;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, unbounded};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// One multi-block-size scan over a data directory
///
/// Create once per iteration; the cancellation flag may be shared with a
/// signal handler. On cancel, workers stop producing, drain in-flight
/// buffers back to the pool, and the run fails with an aggregate error
/// naming the cancellation.
pub struct BlockScan {
    config: IterationConfig,
    cancel: Arc<AtomicBool>,
}

impl BlockScan {
    /// Create a scan for one iteration
    pub fn new(config: IterationConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a clone of the cancellation flag (for signal handlers)
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// The configuration this scan runs with
    pub fn config(&self) -> &IterationConfig {
        &self.config
    }

    /// Run the iteration to completion
    ///
    /// On success returns the per-block-size statistics; the hash logs
    /// for this iteration are flushed and closed before the map is
    /// returned. On any worker error the results are discarded and the
    /// aggregate error is returned instead. Partial hash logs on disk are
    /// not rolled back.
    pub fn run(&self, probe: &dyn InstanceProbe) -> Result<AllBlockSizeStats> {
        let config = &self.config;
        let start = Instant::now();
        let started_at: DateTime<Utc> = Utc::now();

        info!(
            data_dir = %config.data_dir.display(),
            iteration = config.iteration,
            block_sizes = ?config.block_sizes,
            started = %started_at.to_rfc3339(),
            "Starting block scan"
        );

        let patterns = probe.exclude_patterns()?;
        let exclude = compile_exclude_patterns(&patterns)?;
        let files = list_backup_files(&config.data_dir, &exclude, true)?;
        let data_bytes = total_file_size(&files);

        info!(
            files = files.len(),
            data_bytes,
            "Enumerated backup-relevant files"
        );

        // The filters are fully loaded before the first record is
        // aggregated; this is the happens-before edge the dedup rate
        // depends on.
        let mut writers: HashMap<usize, HashLogWriter> = HashMap::new();
        let mut filters: HashMap<usize, BloomFilter> = HashMap::new();
        for &block_size in &config.block_sizes {
            writers.insert(
                block_size,
                HashLogWriter::create(&config.hash_dir, block_size, config.iteration)?,
            );

            let filter = match config.iteration.checked_sub(1) {
                Some(prev) => bloom::load_previous(
                    &hashlog::log_path(&config.hash_dir, block_size, prev),
                    config.false_positive_rate,
                )?,
                None => BloomFilter::degenerate(),
            };
            filters.insert(block_size, filter);
        }

        let pool = BufferPool::new(config.max_in_flight_buffers, config.max_block_size());
        let (files_tx, files_rx) = bounded(files.len().max(1));
        let (blocks_tx, blocks_rx) = bounded(config.num_splitters);
        let (records_tx, records_rx) = bounded(config.num_hashers);
        let (errors_tx, errors_rx) = unbounded();

        let collector = ErrorCollector::spawn(errors_rx)?;
        let aggregator = spawn_aggregator(records_rx, writers, filters, errors_tx.clone())?;
        let hashers = spawn_hashers(
            config.num_hashers,
            blocks_rx,
            pool.clone(),
            Arc::new(config.block_sizes.clone()),
            records_tx,
            errors_tx.clone(),
            Arc::clone(&self.cancel),
        )?;
        let splitters = spawn_splitters(
            config.num_splitters,
            files_rx,
            pool,
            blocks_tx,
            errors_tx.clone(),
            Arc::clone(&self.cancel),
        )?;

        // The queue was sized to hold every name, so this never blocks.
        for path in files {
            let _ = files_tx.send(path);
        }
        drop(files_tx);

        for handle in splitters {
            if handle.join().is_err() {
                let _ = errors_tx.send(SizerError::Invariant("splitter worker panicked".into()));
            }
        }
        for handle in hashers {
            if handle.join().is_err() {
                let _ = errors_tx.send(SizerError::Invariant("hasher worker panicked".into()));
            }
        }

        // Hashers are done, so the record channel is closed and the
        // aggregator runs to completion.
        let stats = match aggregator.join() {
            Ok(stats) => stats,
            Err(_) => {
                let _ = errors_tx.send(SizerError::Invariant("aggregator panicked".into()));
                AllBlockSizeStats::new()
            }
        };

        if self.cancel.load(Ordering::Relaxed) {
            let _ = errors_tx.send(SizerError::Cancelled);
        }

        // Last sender: dropping it closes the error channel, once.
        drop(errors_tx);
        let report = collector.finish();

        let duration = start.elapsed();
        match report {
            Some(aggregate) => {
                warn!(
                    errors = aggregate.total,
                    duration_secs = duration.as_secs_f64(),
                    "Block scan failed"
                );
                Err(aggregate.into())
            }
            None => {
                let records: u64 = stats.values().map(|s| s.total_hashes).sum();
                info!(
                    records,
                    duration_secs = duration.as_secs_f64(),
                    "Block scan complete"
                );
                Ok(stats)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::StaticProbe;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_of_missing_data_dir_is_fatal() {
        let dir = tempdir().unwrap();
        let config = IterationConfig::new(
            dir.path().join("does-not-exist"),
            dir.path().join("hashes"),
            &[4096],
            0.01,
            0,
        )
        .unwrap();

        let probe = StaticProbe::for_dir(dir.path());
        let err = BlockScan::new(config).run(&probe).unwrap_err();
        assert!(matches!(err, SizerError::Io(_)));
    }

    #[test]
    fn test_cancelled_scan_surfaces_aggregate_error() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("f"), vec![b'x'; 4096]).unwrap();

        let config = IterationConfig::new(&data, dir.path().join("hashes"), &[1024], 0.01, 0)
            .unwrap();
        let scan = BlockScan::new(config);
        scan.cancel_flag().store(true, Ordering::Relaxed);

        let err = scan.run(&StaticProbe::for_dir(&data)).unwrap_err();
        let SizerError::Aggregate(report) = err else {
            panic!("expected aggregate error");
        };
        assert!(report.to_string().contains("Iteration cancelled"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_fails_iteration_but_keeps_scanning() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("good"), vec![b'x'; 2048]).unwrap();

        // Enumerated as a plain entry, but open fails: the target is gone.
        std::os::unix::fs::symlink(data.join("gone"), data.join("ghost")).unwrap();

        let config = IterationConfig::new(&data, dir.path().join("hashes"), &[1024], 0.01, 0)
            .unwrap();
        let err = BlockScan::new(config)
            .run(&StaticProbe::for_dir(&data))
            .unwrap_err();
        let SizerError::Aggregate(report) = err else {
            panic!("expected aggregate error");
        };
        assert_eq!(report.total, 1);
        assert!(report.to_string().contains("ghost"));
    }
}
