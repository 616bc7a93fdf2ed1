//! Bloom filter over the previous iteration's hash log
//!
//! The dedup rate compares this iteration's digests against the previous
//! iteration's without holding the full digest set in memory. A filter is
//! rebuilt at iteration start from the prior hash log, sized for the log's
//! record count and a caller-chosen false-positive rate, and discarded at
//! iteration end. Zero false negatives; the false-positive rate is the
//! only approximation in the dedup numbers.
//!
//! Membership uses double hashing: bit_i(x) = h1(x) + i * h2(x) mod m,
//! with h1 and h2 two independently seeded FNV-1a style hashes.

use crate::error::{HashLogError, Result};
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::hashlog;

/// Filter sizing for expected cardinality `n` and false-positive rate `p`
///
/// Returns `(m, k)`: bit count and hash count. Uses the closed form with
/// `c = 0.6185`, from `0.5 ^ ((m/n) ln 2) ~= 0.6185 ^ (m/n)`:
///
/// ```text
/// m = ceil(log(p) / log(c) * n)
/// k = floor(m/n * ln 2)
/// ```
///
/// Degenerate inputs (`n = 0`, `p` outside (0, 1)) yield `(1, 0)`, a
/// filter that rejects every membership query.
pub fn bloom_params(n: u64, p: f64) -> (u64, u32) {
    if n == 0 || p <= 0.0 || p >= 1.0 {
        return (1, 0);
    }
    const C: f64 = 0.6185;
    let nf = n as f64;

    let mf = p.ln() / C.ln() * nf;
    let m = mf.ceil() as u64;

    // k is derived from the unrounded bit count.
    let k = (mf / nf * std::f64::consts::LN_2).floor() as u32;

    (m.max(1), k)
}

/// Memory-bounded probabilistic set of hex digests
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u8>,
    m: u64,
    k: u32,
}

impl BloomFilter {
    /// Filter with `m` bits and `k` hash functions
    pub fn new(m: u64, k: u32) -> Self {
        let m = m.max(1);
        let words = m.div_ceil(8) as usize;
        Self {
            bits: vec![0u8; words],
            m,
            k,
        }
    }

    /// Filter that rejects all queries
    ///
    /// Used on iteration 0 and whenever the prior log is absent, so the
    /// dedup rate for that block size reads 0.
    pub fn degenerate() -> Self {
        Self::new(1, 0)
    }

    /// `(m, k)` this filter was built with
    pub fn params(&self) -> (u64, u32) {
        (self.m, self.k)
    }

    /// Insert a key. No-op on a degenerate filter.
    pub fn insert(&mut self, key: &[u8]) {
        let (h1, h2) = hash_pair(key);
        for i in 0..self.k {
            let bit = bit_index(h1, h2, i, self.m);
            self.bits[(bit / 8) as usize] |= 1 << (bit % 8);
        }
    }

    /// Whether `key` might be in the set
    ///
    /// `false` is definite; `true` may be a false positive. A degenerate
    /// filter answers `false` for every key.
    pub fn contains(&self, key: &[u8]) -> bool {
        if self.k == 0 {
            return false;
        }
        let (h1, h2) = hash_pair(key);
        (0..self.k).all(|i| {
            let bit = bit_index(h1, h2, i, self.m);
            self.bits[(bit / 8) as usize] & (1 << (bit % 8)) != 0
        })
    }
}

fn bit_index(h1: u64, h2: u64, i: u32, m: u64) -> u64 {
    h1.wrapping_add((i as u64).wrapping_mul(h2)) % m
}

/// Two independently seeded FNV-1a hashes of `key`
fn hash_pair(key: &[u8]) -> (u64, u64) {
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut h1: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in key {
        h1 ^= b as u64;
        h1 = h1.wrapping_mul(FNV_PRIME);
    }

    let mut h2: u64 = 0x6c62_272e_07bb_0142;
    for &b in key {
        h2 ^= b as u64;
        h2 = h2.wrapping_mul(FNV_PRIME);
    }

    (h1, h2)
}

/// Load the previous iteration's hash log into a filter
///
/// Absent log (iteration 0, or a block size's first appearance) yields
/// the degenerate filter. The record count comes from the file size; a
/// partial trailing record is a hard error, not a truncation.
pub fn load_previous(path: &Path, false_positive_rate: f64) -> Result<BloomFilter> {
    if !path.exists() {
        return Ok(BloomFilter::degenerate());
    }

    let n = hashlog::count_records(path)?;
    let (m, k) = bloom_params(n, false_positive_rate);
    let mut filter = BloomFilter::new(m, k);

    let file = std::fs::File::open(path).map_err(|source| HashLogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    for line in reader.lines() {
        let line = line.map_err(|source| HashLogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        filter.insert(line.as_bytes());
    }

    Ok(filter)
}
