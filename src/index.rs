//! Run-scoped duplicate index
//!
//! Maps content fingerprints to already-placed destination paths and owns
//! the name-reservation protocol: a destination filename must be claimed
//! here before the physical operation starts, so two workers can never
//! race for the same final name through filesystem existence checks.
//!
//! Each destination directory gets its own lock and is lazily seeded from
//! the files already on disk the first time any worker targets it. Workers
//! aimed at different directories never serialize; fingerprinting and
//! metadata reads happen outside all locks.

use crate::error::Result;
use crate::fingerprint::{Fingerprint, fingerprint_file};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};

/// Outcome of a name-claim attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The name is now reserved for the caller
    Claimed,
    /// The name is held by different content; retry with a suffix
    NameTaken,
    /// Identical content is already placed at the given path
    DuplicateContent(PathBuf),
}

#[derive(Default)]
struct DirState {
    seeded: bool,
    /// Filenames present on disk at seeding time plus names claimed
    /// during this run
    claimed: HashSet<String>,
}

/// Shared duplicate index for one run
#[derive(Default)]
pub struct DuplicateIndex {
    dirs: Mutex<HashMap<PathBuf, Arc<Mutex<DirState>>>>,
    by_content: Mutex<HashMap<Fingerprint, PathBuf>>,
}

impl DuplicateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destination already holding this content, if any.
    pub fn lookup(&self, fingerprint: Fingerprint) -> Option<PathBuf> {
        self.by_content.lock().unwrap().get(&fingerprint).cloned()
    }

    /// Seed the index from the files already present in `directory`.
    ///
    /// Memoized per directory for the lifetime of the run, so pre-existing
    /// output content participates in dedup without a full-tree prescan.
    /// With `dedup` disabled only the existing names are recorded.
    pub fn ensure_seeded(&self, directory: &Path, dedup: bool) -> Result<()> {
        let shard = self.shard(directory);
        let mut state = shard.lock().unwrap();
        if state.seeded {
            return Ok(());
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Directory does not exist yet, nothing to seed
                state.seeded = true;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut seeded_files = 0usize;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            state.claimed.insert(name.to_string());

            if dedup {
                match fingerprint_file(&path) {
                    Ok(fp) => {
                        self.by_content
                            .lock()
                            .unwrap()
                            .entry(fp)
                            .or_insert_with(|| path.clone());
                        seeded_files += 1;
                    }
                    Err(e) => {
                        // The name still blocks collisions even if the
                        // content cannot participate in dedup.
                        warn!(?path, error = %e, "Could not fingerprint existing file while seeding");
                    }
                }
            }
        }

        debug!(?directory, seeded_files, "Seeded duplicate index for directory");
        state.seeded = true;
        Ok(())
    }

    /// Atomically reserve `filename` inside `directory`.
    ///
    /// When a fingerprint is supplied it is re-checked under the same
    /// exclusion, catching content placed by a concurrent worker after the
    /// caller's initial lookup. A successful claim registers the
    /// fingerprint immediately, before any physical operation runs.
    pub fn claim(
        &self,
        directory: &Path,
        filename: &str,
        fingerprint: Option<Fingerprint>,
    ) -> ClaimOutcome {
        let shard = self.shard(directory);
        let mut state = shard.lock().unwrap();
        debug_assert!(state.seeded, "claim on unseeded directory");

        if let Some(fp) = fingerprint {
            let mut by_content = self.by_content.lock().unwrap();
            if let Some(existing) = by_content.get(&fp) {
                return ClaimOutcome::DuplicateContent(existing.clone());
            }
            if state.claimed.contains(filename) {
                return ClaimOutcome::NameTaken;
            }
            state.claimed.insert(filename.to_string());
            by_content.insert(fp, directory.join(filename));
        } else {
            if state.claimed.contains(filename) {
                return ClaimOutcome::NameTaken;
            }
            state.claimed.insert(filename.to_string());
        }

        trace!(?directory, filename, "Claimed destination name");
        ClaimOutcome::Claimed
    }

    fn shard(&self, directory: &Path) -> Arc<Mutex<DirState>> {
        let mut dirs = self.dirs.lock().unwrap();
        dirs.entry(directory.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(DirState::default())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint_bytes;
    use tempfile::tempdir;

    #[test]
    fn test_seeding_picks_up_existing_content_and_names() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("20240101-000000.jpg"), b"existing").unwrap();

        let index = DuplicateIndex::new();
        index.ensure_seeded(dir.path(), true).unwrap();

        let fp = fingerprint_bytes(b"existing");
        assert_eq!(
            index.lookup(fp),
            Some(dir.path().join("20240101-000000.jpg"))
        );
        assert_eq!(
            index.claim(dir.path(), "20240101-000000.jpg", None),
            ClaimOutcome::NameTaken
        );
    }

    #[test]
    fn test_seeding_nonexistent_directory_is_empty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("2031/01/01");

        let index = DuplicateIndex::new();
        index.ensure_seeded(&missing, true).unwrap();
        assert_eq!(index.claim(&missing, "a.jpg", None), ClaimOutcome::Claimed);
    }

    #[test]
    fn test_seeding_is_memoized() {
        let dir = tempdir().unwrap();
        let index = DuplicateIndex::new();
        index.ensure_seeded(dir.path(), true).unwrap();

        // A file appearing after seeding is not observed; the run-scoped
        // view stays stable.
        std::fs::write(dir.path().join("late.jpg"), b"late").unwrap();
        index.ensure_seeded(dir.path(), true).unwrap();
        assert_eq!(index.claim(dir.path(), "late.jpg", None), ClaimOutcome::Claimed);
    }

    #[test]
    fn test_seeding_without_dedup_records_names_only() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"same bytes").unwrap();

        let index = DuplicateIndex::new();
        index.ensure_seeded(dir.path(), false).unwrap();

        assert_eq!(index.lookup(fingerprint_bytes(b"same bytes")), None);
        assert_eq!(index.claim(dir.path(), "a.jpg", None), ClaimOutcome::NameTaken);
    }

    #[test]
    fn test_claim_detects_concurrent_duplicate_content() {
        let dir = tempdir().unwrap();
        let index = DuplicateIndex::new();
        index.ensure_seeded(dir.path(), true).unwrap();

        let fp = fingerprint_bytes(b"payload");
        assert_eq!(
            index.claim(dir.path(), "a.jpg", Some(fp)),
            ClaimOutcome::Claimed
        );
        // Same content under a different name: caught at claim time.
        assert_eq!(
            index.claim(dir.path(), "b.jpg", Some(fp)),
            ClaimOutcome::DuplicateContent(dir.path().join("a.jpg"))
        );
    }

    #[test]
    fn test_claim_same_name_different_content() {
        let dir = tempdir().unwrap();
        let index = DuplicateIndex::new();
        index.ensure_seeded(dir.path(), true).unwrap();

        let fp1 = fingerprint_bytes(b"one");
        let fp2 = fingerprint_bytes(b"two");
        assert_eq!(index.claim(dir.path(), "a.jpg", Some(fp1)), ClaimOutcome::Claimed);
        assert_eq!(index.claim(dir.path(), "a.jpg", Some(fp2)), ClaimOutcome::NameTaken);
        assert_eq!(index.claim(dir.path(), "a-1.jpg", Some(fp2)), ClaimOutcome::Claimed);
    }
}
