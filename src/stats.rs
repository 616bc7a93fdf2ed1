//! Per-block-size statistics
//!
//! One [`BlockStats`] accumulates for each configured block size over an
//! iteration. The raw counters feed two derived figures: the zlib
//! compression ratio and the fraction of blocks already seen on the
//! previous pass.

use std::collections::BTreeMap;

/// Result map: block size in bytes to its statistics
pub type AllBlockSizeStats = BTreeMap<usize, BlockStats>;

/// Accumulated totals and derived rates for one block size
///
/// Counters are mutated only by the aggregator; the derived rates are
/// computed once when the record stream ends. On an empty dataset both
/// rates are NaN, never a silent zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockStats {
    /// Sum of sub-block lengths, in bytes
    pub uncompressed_total: u64,

    /// Sum of zlib-compressed sub-block lengths, in bytes
    pub compressed_total: u64,

    /// Number of blocks hashed
    pub total_hashes: u64,

    /// Number of blocks present in the previous iteration's filter
    pub total_dupe_count: u64,

    /// `total_dupe_count / total_hashes`
    pub dedup_rate: f64,

    /// `uncompressed_total / compressed_total`
    pub data_compression_ratio: f64,
}

impl BlockStats {
    /// Compute the derived rates from the accumulated counters
    ///
    /// Zero denominators produce NaN through IEEE division.
    pub(crate) fn finalize(&mut self) {
        self.data_compression_ratio = self.uncompressed_total as f64 / self.compressed_total as f64;
        self.dedup_rate = self.total_dupe_count as f64 / self.total_hashes as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_rates() {
        let mut stats = BlockStats {
            uncompressed_total: 1000,
            compressed_total: 250,
            total_hashes: 10,
            total_dupe_count: 4,
            ..Default::default()
        };
        stats.finalize();
        assert_eq!(stats.data_compression_ratio, 4.0);
        assert_eq!(stats.dedup_rate, 0.4);
    }

    #[test]
    fn test_finalize_empty_dataset_is_nan() {
        let mut stats = BlockStats::default();
        stats.finalize();
        assert!(stats.data_compression_ratio.is_nan());
        assert!(stats.dedup_rate.is_nan());
    }
}
