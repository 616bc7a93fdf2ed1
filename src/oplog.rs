//! Replication log sampling
//!
//! Two estimates feed the backup-store sizing alongside the block scan:
//! how many bytes per day the replication log turns over, and how well
//! its documents compress. Throughput comes from the log's time window
//! and capped size; the compression ratio comes from snappy-encoding the
//! document stream in large batches, the same discipline a slice-based
//! backup store applies.

use crate::error::{OplogError, Result};
use crate::probe::{InstanceProbe, ReplicationLogIter};
use std::time::Duration;
use tracing::{debug, info};

/// Batch at least this many bytes before snappy-encoding
pub const FLUSH_THRESHOLD: usize = 10 * 1024 * 1024;

const SECONDS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;
const GIB: f64 = (1u64 << 30) as f64;

/// Time window and capped size of the replication log
///
/// Timestamps are 64-bit composites; only the upper 32 bits (epoch
/// seconds) participate in throughput math.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OplogInfo {
    /// Earliest entry's composite timestamp
    pub start_ts: u64,

    /// Latest entry's composite timestamp
    pub end_ts: u64,

    /// Capped collection size, in bytes
    pub size: u64,
}

impl OplogInfo {
    /// Estimated replication log throughput in GiB per day
    ///
    /// A window shorter than one second is clamped to one second; a
    /// start after the end is an invariant violation.
    pub fn gb_per_day(&self) -> Result<f64> {
        let first = (self.start_ts >> 32) as u32;
        let last = (self.end_ts >> 32) as u32;

        if first > last {
            return Err(OplogError::InvalidTimeRange { first, last }.into());
        }

        let total_time = (last - first).max(1) as f64;
        Ok(self.size as f64 / GIB * (SECONDS_PER_DAY / total_time))
    }
}

/// Combined replication log estimates for one sampling pass
#[derive(Debug, Clone, PartialEq)]
pub struct OplogStats {
    /// Earliest entry's composite timestamp
    pub start_ts: u64,

    /// Latest entry's composite timestamp
    pub end_ts: u64,

    /// Capped collection size, in bytes
    pub size: u64,

    /// Uncompressed throughput estimate
    pub gb_per_day: f64,

    /// Snappy compression ratio over the sampled window
    pub compression_ratio: f64,

    /// Throughput after compression
    pub compressed_gb_per_day: f64,
}

/// Snappy compression ratio of a serialized document stream
///
/// Documents accumulate in a buffer that is encoded and reset each time
/// it crosses [`FLUSH_THRESHOLD`]; the residual tail is encoded when the
/// stream ends. An empty stream yields NaN. An iterator error abandons
/// the sample; partial results are never published.
pub fn compression_ratio(iter: ReplicationLogIter) -> Result<f64> {
    let mut encoder = snap::raw::Encoder::new();
    let mut buffer: Vec<u8> = Vec::new();
    let mut uncompressed = 0u64;
    let mut compressed = 0u64;

    for doc in iter {
        let doc = doc?;
        buffer.extend_from_slice(&doc);

        if buffer.len() > FLUSH_THRESHOLD {
            flush(&mut encoder, &mut buffer, &mut uncompressed, &mut compressed)?;
        }
    }

    if !buffer.is_empty() {
        flush(&mut encoder, &mut buffer, &mut uncompressed, &mut compressed)?;
    }

    Ok(uncompressed as f64 / compressed as f64)
}

fn flush(
    encoder: &mut snap::raw::Encoder,
    buffer: &mut Vec<u8>,
    uncompressed: &mut u64,
    compressed: &mut u64,
) -> Result<()> {
    let encoded = encoder
        .compress_vec(buffer)
        .map_err(OplogError::Compression)?;

    debug!(
        raw = buffer.len(),
        encoded = encoded.len(),
        "Flushed replication log batch"
    );

    *uncompressed += buffer.len() as u64;
    *compressed += encoded.len() as u64;
    buffer.clear();
    Ok(())
}

/// Sample the replication log through the instance probe
///
/// Combines the time-window throughput estimate with the compression
/// ratio of documents inside the trailing `window`.
pub fn sample_oplog(probe: &dyn InstanceProbe, window: Duration) -> Result<OplogStats> {
    let (start_ts, end_ts) = probe.replication_log_time_bounds()?;
    let size = probe.replication_log_capped_size()?;

    let info = OplogInfo {
        start_ts,
        end_ts,
        size,
    };
    let gb_per_day = info.gb_per_day()?;

    let iter = probe.replication_log_iterator(window)?;
    let compression_ratio = compression_ratio(iter)?;

    info!(
        gb_per_day,
        compression_ratio,
        window_secs = window.as_secs(),
        "Sampled replication log"
    );

    Ok(OplogStats {
        start_ts,
        end_ts,
        size,
        gb_per_day,
        compression_ratio,
        compressed_gb_per_day: gb_per_day / compression_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SizerError;
    use crate::probe::StaticProbe;

    fn ts(seconds: u64) -> u64 {
        seconds << 32
    }

    #[test]
    fn test_one_gib_per_day() {
        let info = OplogInfo {
            start_ts: ts(0),
            end_ts: ts(86_400),
            size: 1 << 30,
        };
        assert_eq!(info.gb_per_day().unwrap(), 1.0);
    }

    #[test]
    fn test_zero_window_clamps_to_one_second() {
        let info = OplogInfo {
            start_ts: ts(500),
            end_ts: ts(500),
            size: 1 << 30,
        };
        assert_eq!(info.gb_per_day().unwrap(), 86_400.0);
    }

    #[test]
    fn test_start_after_end_is_invariant_violation() {
        let info = OplogInfo {
            start_ts: ts(1000),
            end_ts: ts(999),
            size: 1 << 30,
        };
        let err = info.gb_per_day().unwrap_err();
        assert!(matches!(
            err,
            SizerError::Oplog(OplogError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn test_lower_timestamp_bits_are_ignored() {
        // Counters in the low 32 bits must not affect the window.
        let info = OplogInfo {
            start_ts: ts(0) | 0xffff_ffff,
            end_ts: ts(86_400) | 0x0000_0001,
            size: 1 << 30,
        };
        assert_eq!(info.gb_per_day().unwrap(), 1.0);
    }

    #[test]
    fn test_compression_ratio_empty_stream_is_nan() {
        let iter: ReplicationLogIter = Box::new(std::iter::empty());
        assert!(compression_ratio(iter).unwrap().is_nan());
    }

    #[test]
    fn test_compression_ratio_repetitive_docs() {
        let docs: Vec<crate::error::Result<Vec<u8>>> =
            (0..100).map(|_| Ok(vec![b'o'; 10_000])).collect();
        let iter: ReplicationLogIter = Box::new(docs.into_iter());

        let ratio = compression_ratio(iter).unwrap();
        assert!(ratio > 2.0, "repetitive stream should compress well: {ratio}");
    }

    #[test]
    fn test_compression_ratio_flushes_across_threshold() {
        // Three batches over the threshold plus a residual tail.
        let doc = vec![b'z'; 4 * 1024 * 1024];
        let docs: Vec<crate::error::Result<Vec<u8>>> =
            (0..9).map(|_| Ok(doc.clone())).collect();
        let iter: ReplicationLogIter = Box::new(docs.into_iter());

        let ratio = compression_ratio(iter).unwrap();
        assert!(ratio.is_finite());
        assert!(ratio > 1.0);
    }

    #[test]
    fn test_compression_ratio_surfaces_iterator_error() {
        let docs: Vec<crate::error::Result<Vec<u8>>> = vec![
            Ok(vec![1, 2, 3]),
            Err(OplogError::Iterator("cursor died".into()).into()),
        ];
        let iter: ReplicationLogIter = Box::new(docs.into_iter());
        assert!(compression_ratio(iter).is_err());
    }

    #[test]
    fn test_sample_oplog_via_probe() {
        let probe = StaticProbe {
            oplog_bounds: Some((ts(0), ts(86_400))),
            oplog_size: 1 << 30,
            oplog_docs: (0..10).map(|_| vec![b'd'; 1000]).collect(),
            ..StaticProbe::default()
        };

        let stats = sample_oplog(&probe, Duration::from_secs(3600)).unwrap();
        assert_eq!(stats.gb_per_day, 1.0);
        assert!(stats.compression_ratio > 1.0);
        assert!(stats.compressed_gb_per_day < stats.gb_per_day);
    }

    #[test]
    fn test_sample_oplog_missing_collection() {
        let probe = StaticProbe::for_dir("/data/db");
        let err = sample_oplog(&probe, Duration::from_secs(3600)).unwrap_err();
        assert!(matches!(err, SizerError::Oplog(OplogError::NotFound)));
    }
}
