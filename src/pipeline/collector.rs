//! Error collector
//!
//! A single task drains the unbounded error channel shared by every
//! worker. It keeps the first few messages verbatim, counts the rest, and
//! reports one aggregate error when the channel closes. The driver closes
//! the channel exactly once, by dropping the last sender after all
//! workers have joined.

use crate::error::{AggregateError, SizerError, MAX_RETAINED_ERRORS};
use crossbeam_channel::Receiver;
use std::io;
use std::thread::{self, JoinHandle};
use tracing::warn;

/// Drains worker errors for one iteration
pub(crate) struct ErrorCollector {
    handle: JoinHandle<Option<AggregateError>>,
}

impl ErrorCollector {
    /// Spawn the collector thread
    pub fn spawn(errors_rx: Receiver<SizerError>) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("error-collector".into())
            .spawn(move || collect(errors_rx))?;
        Ok(Self { handle })
    }

    /// Wait for the channel to close and return the aggregate report
    ///
    /// `None` means no worker reported an error and the iteration's
    /// results may be published.
    pub fn finish(self) -> Option<AggregateError> {
        match self.handle.join() {
            Ok(report) => report,
            Err(_) => Some(AggregateError {
                total: 1,
                retained: vec!["error collector panicked".into()],
            }),
        }
    }
}

fn collect(errors_rx: Receiver<SizerError>) -> Option<AggregateError> {
    let mut total = 0u64;
    let mut retained = Vec::with_capacity(MAX_RETAINED_ERRORS);

    while let Ok(e) = errors_rx.recv() {
        total += 1;
        warn!(error = %e, "Worker error");
        if retained.len() < MAX_RETAINED_ERRORS {
            retained.push(e.to_string());
        }
    }

    if total == 0 {
        None
    } else {
        Some(AggregateError { total, retained })
    }
}
