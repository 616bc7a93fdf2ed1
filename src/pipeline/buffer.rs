//! Recycled outer-buffer pool
//!
//! All outer read buffers are allocated once at pipeline start and cycle
//! between splitters (writers) and hashers (readers) through a bounded
//! channel. The pool's cardinality is the hard bound on bytes in flight
//! and doubles as backpressure: a splitter with no free buffer blocks
//! until a hasher returns one.

use crossbeam_channel::{bounded, Receiver, Sender};

/// Pool of fixed-capacity byte buffers
///
/// Handles are cheap to clone; all clones share the same buffers.
#[derive(Clone)]
pub(crate) struct BufferPool {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    buf_capacity: usize,
}

impl BufferPool {
    /// Allocate `count` buffers of `buf_capacity` bytes each
    pub fn new(count: usize, buf_capacity: usize) -> Self {
        let (tx, rx) = bounded(count);
        for _ in 0..count {
            tx.send(vec![0u8; buf_capacity])
                .expect("pool channel sized to hold every buffer");
        }
        Self {
            tx,
            rx,
            buf_capacity,
        }
    }

    /// Take a buffer, blocking until one is free
    ///
    /// The buffer comes back at full capacity: a previous borrower may
    /// have truncated it for a short final read, so the length is
    /// restored before reuse.
    pub fn take(&self) -> Option<Vec<u8>> {
        let mut buf = self.rx.recv().ok()?;
        if buf.len() != self.buf_capacity {
            buf.resize(self.buf_capacity, 0);
        }
        Some(buf)
    }

    /// Return a buffer to the pool
    pub fn put(&self, buf: Vec<u8>) {
        // Only fails if every handle is gone, at which point the buffer
        // is garbage anyway.
        let _ = self.tx.send(buf);
    }

    /// Buffer capacity in bytes
    #[cfg(test)]
    pub fn buf_capacity(&self) -> usize {
        self.buf_capacity
    }
}
