//! Instance probe - the seam to a live database instance
//!
//! All database interaction is modeled as the [`InstanceProbe`] capability
//! set. The real driver-backed implementation lives with the caller; this
//! crate consumes the trait and ships [`StaticProbe`], a fixture-backed
//! implementation for tests and offline runs.

use crate::error::{OplogError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Storage engine reported by the probed instance
///
/// Determines which files in the data directory are relevant for backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEngine {
    /// mmap-style engine (one file family per database)
    MmapV1,
    /// WiredTiger-style engine (one table file per collection)
    WiredTiger,
}

/// Prefix on the statistics URI of a WiredTiger table
const STATISTICS_TABLE_PREFIX: &str = "statistics:table:";

/// Lazy sequence of serialized replication log documents
///
/// Implementations own the inter-document timeout; a timed-out pull ends
/// the sequence rather than erroring.
pub type ReplicationLogIter = Box<dyn Iterator<Item = Result<Vec<u8>>> + Send>;

/// Capability set describing one probed database instance
///
/// Failures are propagated verbatim; the library adds no retry policy.
pub trait InstanceProbe {
    /// Absolute path of the instance's data directory
    fn data_dir(&self) -> Result<PathBuf>;

    /// Regular expressions (matched against file names only) for files
    /// that are not part of a backup
    fn exclude_patterns(&self) -> Result<Vec<String>>;

    /// Earliest and latest replication log timestamps
    ///
    /// Timestamps are 64-bit composites whose upper 32 bits are epoch
    /// seconds.
    fn replication_log_time_bounds(&self) -> Result<(u64, u64)>;

    /// Configured maximum size of the capped replication log, in bytes
    fn replication_log_capped_size(&self) -> Result<u64>;

    /// Iterator over serialized documents with timestamps inside the
    /// trailing `window`
    fn replication_log_iterator(&self, window: Duration) -> Result<ReplicationLogIter>;
}

/// File-name exclusion patterns for a storage engine
///
/// For WiredTiger, `oplog_table_uri` is the replication log table's
/// statistics URI; its base name is excluded so the oplog is not hashed
/// twice. When the URI is unavailable pass `None` and nothing extra is
/// excluded.
pub fn exclude_patterns_for(engine: StorageEngine, oplog_table_uri: Option<&str>) -> Vec<String> {
    match engine {
        StorageEngine::MmapV1 => vec![
            "mongod.lock".into(),
            "local.*".into(),
            "mongodb.log".into(),
            "journal".into(),
        ],
        StorageEngine::WiredTiger => {
            let oplog_file = oplog_table_uri
                .map(|uri| uri.strip_prefix(STATISTICS_TABLE_PREFIX).unwrap_or(uri))
                .unwrap_or("");
            vec![
                "mongod.lock".into(),
                "WiredTiger.basecfg".into(),
                "mongodb.log".into(),
                "journal".into(),
                oplog_file.into(),
            ]
        }
    }
}

/// Fixture-backed probe for tests and offline estimation runs
///
/// Replication log documents are held in memory and replayed through the
/// iterator regardless of the requested window.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    /// Data directory reported by [`InstanceProbe::data_dir`]
    pub data_dir: PathBuf,

    /// Exclusion patterns reported verbatim
    pub exclude_patterns: Vec<String>,

    /// (earliest, latest) composite timestamps; `None` means the
    /// replication log collection is absent
    pub oplog_bounds: Option<(u64, u64)>,

    /// Capped size in bytes
    pub oplog_size: u64,

    /// Serialized documents replayed by the iterator
    pub oplog_docs: Vec<Vec<u8>>,
}

impl StaticProbe {
    /// Probe over a plain directory with no exclusions and no oplog
    pub fn for_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}

impl InstanceProbe for StaticProbe {
    fn data_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir.clone())
    }

    fn exclude_patterns(&self) -> Result<Vec<String>> {
        Ok(self.exclude_patterns.clone())
    }

    fn replication_log_time_bounds(&self) -> Result<(u64, u64)> {
        self.oplog_bounds.ok_or(OplogError::NotFound.into())
    }

    fn replication_log_capped_size(&self) -> Result<u64> {
        if self.oplog_bounds.is_none() {
            return Err(OplogError::NotFound.into());
        }
        Ok(self.oplog_size)
    }

    fn replication_log_iterator(&self, _window: Duration) -> Result<ReplicationLogIter> {
        if self.oplog_bounds.is_none() {
            return Err(OplogError::NotFound.into());
        }
        let docs = self.oplog_docs.clone();
        Ok(Box::new(docs.into_iter().map(Ok)))
    }
}
