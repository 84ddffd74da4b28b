//! Directory snapshots

use crate::error::{SyncError, SyncResult};
use crate::identifier::ModelId;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, trace, warn};

/// A regular file seen during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub path: PathBuf,
}

impl DirectoryEntry {
    pub fn id(&self) -> Option<ModelId> {
        ModelId::from_path(&self.path)
    }
}

/// Regular files present in the model directory at one point in time,
/// ordered by file name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub entries: Vec<DirectoryEntry>,
    /// Entries that could not be inspected
    pub skipped: usize,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter()
    }

    /// Identifiers present, each with the first path that produced it
    pub fn identifiers(&self) -> BTreeMap<ModelId, PathBuf> {
        let mut ids = BTreeMap::new();
        for entry in &self.entries {
            if let Some(id) = entry.id() {
                ids.entry(id).or_insert_with(|| entry.path.clone());
            }
        }
        ids
    }
}

/// Lists the regular files directly inside a directory
#[derive(Debug, Clone)]
pub struct Scanner {
    dir: PathBuf,
}

impl Scanner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Take a snapshot. Failing to list the directory fails the scan;
    /// failing to stat one entry only skips that entry.
    pub async fn scan(&self) -> SyncResult<Snapshot> {
        let mut reader = fs::read_dir(&self.dir).await.map_err(|e| SyncError::directory_read(&self.dir, e))?;

        let mut snapshot = Snapshot::default();

        while let Some(entry) = reader.next_entry().await.map_err(|e| SyncError::directory_read(&self.dir, e))? {
            let path = entry.path();

            // Follows symlinks, so links to files count and links to directories do not
            match fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => {
                    if entry.file_name().to_str().is_none() {
                        debug!("Skipping {:?}: file name is not valid UTF-8", path);
                    }
                    snapshot.entries.push(DirectoryEntry { path });
                }
                Ok(_) => trace!("Ignoring non-file entry {:?}", path),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("Entry {:?} vanished during scan", path);
                    snapshot.skipped += 1;
                }
                Err(e) => {
                    warn!("{}", SyncError::entry_access(&path, e));
                    snapshot.skipped += 1;
                }
            }
        }

        snapshot.entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

        debug!("Scanned {:?}: {} files, {} skipped", self.dir, snapshot.len(), snapshot.skipped);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(snapshot: &Snapshot) -> Vec<String> {
        snapshot
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_scan_lists_regular_files_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("b.xml"), "").unwrap();
        std::fs::write(temp_dir.path().join("a.pmml"), "").unwrap();
        std::fs::write(temp_dir.path().join(".hidden"), "").unwrap();
        std::fs::create_dir(temp_dir.path().join("archive")).unwrap();
        std::fs::write(temp_dir.path().join("archive").join("old.pmml"), "").unwrap();

        let snapshot = Scanner::new(temp_dir.path()).scan().await.unwrap();

        assert_eq!(names(&snapshot), vec![".hidden", "a.pmml", "b.xml"]);
        assert_eq!(snapshot.skipped, 0);
    }

    #[tokio::test]
    async fn test_identifiers_skip_empty_and_collapse_prefixes() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["x.json", "x.pmml", ".hidden", "y"] {
            std::fs::write(temp_dir.path().join(name), "").unwrap();
        }

        let snapshot = Scanner::new(temp_dir.path()).scan().await.unwrap();
        let ids = snapshot.identifiers();

        let keys: Vec<&str> = ids.keys().map(|id| id.as_str()).collect();
        assert_eq!(keys, vec!["x", "y"]);
        assert_eq!(ids[&ModelId::new("x").unwrap()], temp_dir.path().join("x.json"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_cycle_level() {
        let temp_dir = TempDir::new().unwrap();
        let err = Scanner::new(temp_dir.path().join("nope")).scan().await.unwrap_err();
        assert!(err.is_cycle_level());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_follow_their_target() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("real.pmml"), "").unwrap();
        std::os::unix::fs::symlink(outside.path().join("real.pmml"), temp_dir.path().join("linked.pmml")).unwrap();
        std::os::unix::fs::symlink(outside.path(), temp_dir.path().join("linked_dir")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("missing"), temp_dir.path().join("dangling.pmml")).unwrap();

        let snapshot = Scanner::new(temp_dir.path()).scan().await.unwrap();

        assert_eq!(names(&snapshot), vec!["linked.pmml"]);
        assert_eq!(snapshot.skipped, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_loop_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.pmml"), "").unwrap();
        std::os::unix::fs::symlink("loop.pmml", temp_dir.path().join("loop.pmml")).unwrap();

        let snapshot = Scanner::new(temp_dir.path()).scan().await.unwrap();

        assert_eq!(names(&snapshot), vec!["a.pmml"]);
        assert_eq!(snapshot.skipped, 1);
    }

    // Other unix filesystems may refuse non UTF-8 names
    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_name_has_no_identifier() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(OsStr::from_bytes(b"m\xffdel.pmml")), "").unwrap();
        std::fs::write(temp_dir.path().join("iris.pmml"), "").unwrap();

        let snapshot = Scanner::new(temp_dir.path()).scan().await.unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.iter().filter(|e| e.id().is_none()).count(), 1);
        assert_eq!(
            crate::monitor::diff::initial_changes(&snapshot),
            vec![crate::monitor::FileChange::created(temp_dir.path().join("iris.pmml"))]
        );
    }
}
