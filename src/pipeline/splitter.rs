//! File splitter workers
//!
//! Each splitter pulls file paths from the shared queue, reads the file
//! into pooled outer buffers of the maximum block size, and hands the
//! filled buffers to the hasher pool. Buffers are truncated to the bytes
//! actually read so a short final read never pads the tail with zeros;
//! padding would fabricate identical zero blocks at every smaller block
//! size.

use crate::error::SizerError;
use crate::pipeline::buffer::BufferPool;
use crossbeam_channel::{Receiver, Sender};
use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Spawn the splitter pool
///
/// Workers exit when the file queue is drained and closed. Each worker's
/// sender clone keeps the block channel open; the channel closes when the
/// last splitter finishes.
pub(crate) fn spawn_splitters(
    count: usize,
    files_rx: Receiver<PathBuf>,
    pool: BufferPool,
    blocks_tx: Sender<Vec<u8>>,
    errors_tx: Sender<SizerError>,
    cancel: Arc<AtomicBool>,
) -> io::Result<Vec<JoinHandle<()>>> {
    let mut handles = Vec::with_capacity(count);
    for id in 0..count {
        let files_rx = files_rx.clone();
        let pool = pool.clone();
        let blocks_tx = blocks_tx.clone();
        let errors_tx = errors_tx.clone();
        let cancel = Arc::clone(&cancel);

        let handle = thread::Builder::new()
            .name(format!("splitter-{}", id))
            .spawn(move || {
                splitter_loop(id, files_rx, pool, blocks_tx, errors_tx, cancel);
            })?;
        handles.push(handle);
    }
    Ok(handles)
}

fn splitter_loop(
    id: usize,
    files_rx: Receiver<PathBuf>,
    pool: BufferPool,
    blocks_tx: Sender<Vec<u8>>,
    errors_tx: Sender<SizerError>,
    cancel: Arc<AtomicBool>,
) {
    debug!(worker = id, "Splitter starting");

    while let Ok(path) = files_rx.recv() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }

        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                warn!(worker = id, path = %path.display(), error = %e, "Failed to open file");
                report_io(&errors_tx, &path, e);
                continue;
            }
        };

        trace!(worker = id, path = %path.display(), "Splitting file");

        loop {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            let Some(mut buf) = pool.take() else {
                return;
            };

            match read_full(&mut file, &mut buf) {
                Ok(0) => {
                    // EOF; the file closes when it drops.
                    pool.put(buf);
                    break;
                }
                Ok(n) => {
                    buf.truncate(n);
                    if blocks_tx.send(buf).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(worker = id, path = %path.display(), error = %e, "Read failed, abandoning file");
                    pool.put(buf);
                    report_io(&errors_tx, &path, e);
                    break;
                }
            }
        }
    }

    debug!(worker = id, "Splitter finished");
}

/// Fill `buf` from `file`, stopping only at EOF
///
/// A plain `read` may return short mid-file; looping keeps outer buffers
/// full so every file yields `ceil(len / capacity)` buffers.
fn read_full(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn report_io(errors_tx: &Sender<SizerError>, path: &std::path::Path, e: io::Error) {
    let err = io::Error::new(e.kind(), format!("{}: {}", path.display(), e));
    let _ = errors_tx.send(SizerError::Io(err));
}
