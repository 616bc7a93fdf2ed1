//! Terminal statistics aggregator
//!
//! A single consumer owns all per-block-size state: the open hash log
//! writers, the previous iteration's Bloom filters, and the running
//! totals. Single-threaded by design - the per-size state is small and a
//! lone reader needs no per-size serialization of log writes.
//!
//! Correctness depends only on the multiset of records received, not
//! their order; records from different files interleave arbitrarily.

use crate::bloom::BloomFilter;
use crate::error::SizerError;
use crate::hashlog::HashLogWriter;
use crate::pipeline::hasher::BlockRecord;
use crate::stats::AllBlockSizeStats;
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::io;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Spawn the aggregator thread
///
/// Consumes records until the channel closes, then finalizes the derived
/// rates, flushes and closes every hash log, and returns the snapshot
/// through the join handle. Write failures are reported to the error
/// channel; any reported error discards the iteration's results upstream.
pub(crate) fn spawn_aggregator(
    records_rx: Receiver<BlockRecord>,
    writers: HashMap<usize, HashLogWriter>,
    filters: HashMap<usize, BloomFilter>,
    errors_tx: Sender<SizerError>,
) -> io::Result<JoinHandle<AllBlockSizeStats>> {
    thread::Builder::new()
        .name("aggregator".into())
        .spawn(move || aggregate(records_rx, writers, filters, errors_tx))
}

fn aggregate(
    records_rx: Receiver<BlockRecord>,
    mut writers: HashMap<usize, HashLogWriter>,
    filters: HashMap<usize, BloomFilter>,
    errors_tx: Sender<SizerError>,
) -> AllBlockSizeStats {
    let mut stats: AllBlockSizeStats = writers
        .keys()
        .map(|&block_size| (block_size, Default::default()))
        .collect();

    while let Ok(record) = records_rx.recv() {
        let Some(stat) = stats.get_mut(&record.block_size) else {
            let _ = errors_tx.send(SizerError::Invariant(format!(
                "record for unconfigured block size {}",
                record.block_size
            )));
            continue;
        };

        stat.total_hashes += 1;
        stat.compressed_total += record.compressed_len;
        stat.uncompressed_total += record.uncompressed_len as u64;

        let writer = writers
            .get_mut(&record.block_size)
            .expect("writer exists for every stats key");
        if let Err(e) = writer.append(&record.digest) {
            let _ = errors_tx.send(e.into());
        }

        if let Some(filter) = filters.get(&record.block_size) {
            if filter.contains(record.digest.as_bytes()) {
                stat.total_dupe_count += 1;
            }
        }
    }

    for stat in stats.values_mut() {
        stat.finalize();
    }

    // Logs must be durable before the results are published.
    for (block_size, writer) in writers {
        debug!(block_size, "Closing hash log");
        if let Err(e) = writer.finish() {
            let _ = errors_tx.send(e.into());
        }
    }

    stats
}
