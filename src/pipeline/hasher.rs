//! Hasher-compressor workers
//!
//! Each worker re-slices an outer buffer at every configured block size,
//! computing the SHA-256 digest and the zlib-compressed length of every
//! sub-block. Only the compressed *length* is needed, so the encoder
//! streams into a counting sink and the compressed bytes are never
//! materialized.

use crate::error::SizerError;
use crate::pipeline::buffer::BufferPool;
use crossbeam_channel::{Receiver, Sender};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// One hashed and size-measured sub-block
///
/// The digest covers exactly the sub-block bytes; the last sub-block of a
/// file carries its true remainder length, never padded to the block
/// size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    /// Block size this record was produced at
    pub block_size: usize,

    /// Lowercase hex SHA-256 of the sub-block bytes (64 chars)
    pub digest: String,

    /// zlib-compressed length of the sub-block, default level
    pub compressed_len: u64,

    /// Sub-block length; equals `block_size` except possibly at EOF
    pub uncompressed_len: usize,
}

/// `Write` sink that discards data and counts bytes
#[derive(Debug, Default)]
struct CountingWriter {
    written: u64,
}

impl Write for CountingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// zlib-compressed length of `data` at the default compression level
fn compressed_len(data: &[u8]) -> io::Result<u64> {
    let mut encoder = ZlibEncoder::new(CountingWriter::default(), Compression::default());
    encoder.write_all(data)?;
    let sink = encoder.finish()?;
    Ok(sink.written)
}

/// Slice `buf` at `block_size` and produce one record per sub-block
///
/// `ceil(len / block_size)` records; the digest is independent of the
/// other configured block sizes.
pub fn split_blocks(buf: &[u8], block_size: usize) -> io::Result<Vec<BlockRecord>> {
    let mut records = Vec::with_capacity(buf.len().div_ceil(block_size));

    for chunk in buf.chunks(block_size) {
        let digest = hex::encode(Sha256::digest(chunk));
        let compressed = compressed_len(chunk)?;
        records.push(BlockRecord {
            block_size,
            digest,
            compressed_len: compressed,
            uncompressed_len: chunk.len(),
        });
    }

    Ok(records)
}

/// Spawn the hasher pool
///
/// Workers exit when the block channel is drained and closed; the record
/// channel closes when the last hasher finishes.
pub(crate) fn spawn_hashers(
    count: usize,
    blocks_rx: Receiver<Vec<u8>>,
    pool: BufferPool,
    block_sizes: Arc<Vec<usize>>,
    records_tx: Sender<BlockRecord>,
    errors_tx: Sender<SizerError>,
    cancel: Arc<AtomicBool>,
) -> io::Result<Vec<JoinHandle<()>>> {
    let mut handles = Vec::with_capacity(count);
    for id in 0..count {
        let blocks_rx = blocks_rx.clone();
        let pool = pool.clone();
        let block_sizes = Arc::clone(&block_sizes);
        let records_tx = records_tx.clone();
        let errors_tx = errors_tx.clone();
        let cancel = Arc::clone(&cancel);

        let handle = thread::Builder::new()
            .name(format!("hasher-{}", id))
            .spawn(move || {
                hasher_loop(
                    id, blocks_rx, pool, block_sizes, records_tx, errors_tx, cancel,
                );
            })?;
        handles.push(handle);
    }
    Ok(handles)
}

fn hasher_loop(
    id: usize,
    blocks_rx: Receiver<Vec<u8>>,
    pool: BufferPool,
    block_sizes: Arc<Vec<usize>>,
    records_tx: Sender<BlockRecord>,
    errors_tx: Sender<SizerError>,
    cancel: Arc<AtomicBool>,
) {
    debug!(worker = id, "Hasher starting");

    // After cancellation, keep draining so no splitter stays blocked on
    // the block channel; buffers still go back to the pool.
    while let Ok(buf) = blocks_rx.recv() {
        if !cancel.load(Ordering::Relaxed) {
            'sizes: for &block_size in block_sizes.iter() {
                match split_blocks(&buf, block_size) {
                    Ok(records) => {
                        for record in records {
                            if records_tx.send(record).is_err() {
                                break 'sizes;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = errors_tx.send(SizerError::Io(e));
                        break 'sizes;
                    }
                }
            }
        }
        pool.put(buf);
    }

    debug!(worker = id, "Hasher finished");
}
