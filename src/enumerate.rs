//! File enumeration for the data directory
//!
//! Produces the list of backup-relevant files: everything under the data
//! directory, minus names matching a storage-engine-specific exclusion
//! list, recursing exactly one level into subdirectories. Symlinks are
//! never followed.

use crate::error::ConfigError;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Compile exclusion patterns into regexes
///
/// Empty patterns are dropped: the probe hands one through when the
/// replication log table name cannot be resolved, and it must match
/// nothing rather than everything.
pub fn compile_exclude_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Whether a file name matches any exclusion pattern
fn is_excluded(name: &str, exclude: &[Regex]) -> bool {
    exclude.iter().any(|re| re.is_match(name))
}

/// List the backup-relevant files under `dir`
///
/// Exclusion patterns are matched against the file name only, never the
/// full path, and apply to directories as well as files. When
/// `recurse_one_level` is set, non-directory children of immediate
/// subdirectories are included; deeper levels are never visited.
/// Ordering follows the directory listing and is not stable across calls.
pub fn list_backup_files(
    dir: &Path,
    exclude: &[Regex],
    recurse_one_level: bool,
) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if is_excluded(&name, exclude) {
            continue;
        }

        // file_type() reports the symlink itself, so symlinked
        // directories are listed as plain entries and never traversed.
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if recurse_one_level {
                let sub_files = list_backup_files(&entry.path(), exclude, false)?;
                files.extend(sub_files);
            }
        } else {
            files.push(entry.path());
        }
    }

    Ok(files)
}

/// Sum of the sizes of the given files, in bytes
///
/// Files that disappear between enumeration and stat are skipped with a
/// warning rather than failing the whole summary.
pub fn total_file_size(files: &[PathBuf]) -> u64 {
    let mut total = 0u64;
    for path in files {
        match std::fs::metadata(path) {
            Ok(meta) => total += meta.len(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat file for size summary");
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path, len: usize) {
        fs::write(path, vec![b'x'; len]).unwrap();
    }

    #[test]
    fn test_lists_files_and_applies_exclusions() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("collection-1.wt"), 10);
        touch(&dir.path().join("index-1.wt"), 10);
        touch(&dir.path().join("mongod.lock"), 1);
        touch(&dir.path().join("mongodb.log"), 100);

        let exclude =
            compile_exclude_patterns(&["mongod.lock".into(), "mongodb.log".into()]).unwrap();
        let mut files = list_backup_files(dir.path(), &exclude, true).unwrap();
        files.sort();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["collection-1.wt", "index-1.wt"]);
    }

    #[test]
    fn test_recurses_exactly_one_level() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("top.wt"), 4);

        let sub = dir.path().join("diagnostic.data");
        fs::create_dir(&sub).unwrap();
        touch(&sub.join("metrics.1"), 4);

        let deep = sub.join("deeper");
        fs::create_dir(&deep).unwrap();
        touch(&deep.join("ignored.wt"), 4);

        let files = list_backup_files(dir.path(), &[], true).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&"top.wt".to_string()));
        assert!(names.contains(&"metrics.1".to_string()));
        assert!(!names.contains(&"ignored.wt".to_string()));
    }

    #[test]
    fn test_excluded_directory_is_not_entered() {
        let dir = tempdir().unwrap();
        let journal = dir.path().join("journal");
        fs::create_dir(&journal).unwrap();
        touch(&journal.join("WiredTigerLog.0000000001"), 8);

        let exclude = compile_exclude_patterns(&["journal".into()]).unwrap();
        let files = list_backup_files(dir.path(), &exclude, true).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_exclusion_matches_name_not_path() {
        // The data dir path contains "journal" but the files inside must
        // still be listed; only the name is tested.
        let dir = tempdir().unwrap();
        let data = dir.path().join("journal-host");
        fs::create_dir(&data).unwrap();
        touch(&data.join("collection-1.wt"), 4);

        let exclude = compile_exclude_patterns(&["^journal$".into()]).unwrap();
        let files = list_backup_files(&data, &exclude, true).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_empty_pattern_matches_nothing() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.wt"), 4);

        let exclude = compile_exclude_patterns(&["".into()]).unwrap();
        assert!(exclude.is_empty());
        let files = list_backup_files(dir.path(), &exclude, true).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = compile_exclude_patterns(&["[unclosed".into()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExcludePattern { .. }));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(list_backup_files(&missing, &[], true).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_is_not_followed() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        touch(&target.join("inside.wt"), 4);

        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        std::os::unix::fs::symlink(&target, data.join("link")).unwrap();

        let files = list_backup_files(&data, &[], true).unwrap();
        // The symlink is listed as a plain entry; nothing under it is.
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(!names.contains(&"inside.wt".to_string()));
    }

    #[test]
    fn test_total_file_size() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a"), 100);
        touch(&dir.path().join("b"), 28);

        let files = list_backup_files(dir.path(), &[], true).unwrap();
        assert_eq!(total_file_size(&files), 128);
    }
}
