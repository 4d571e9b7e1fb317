//! Physical file operations
//!
//! Consumes a [`PlacementDecision`] and performs the configured operation.
//! Copies (and cross-device moves) go through a temporary name in the
//! destination directory followed by a rename, so a crash never leaves a
//! half-written file visible under its final name.

use crate::config::FileOperation;
use crate::engine::{PlacementAction, PlacementDecision};
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, trace};

const COPY_BUF_SIZE: usize = 256 * 1024;

/// Collaborator that executes placement decisions.
pub trait FileMover: Send + Sync {
    /// Perform the physical action named by `decision.action`.
    /// `SkipDuplicate` decisions perform no filesystem mutation.
    fn apply(&self, decision: &PlacementDecision) -> Result<()>;
}

/// Local-filesystem [`FileMover`].
pub struct LocalFileMover {
    operation: FileOperation,
    sidecars: bool,
}

impl LocalFileMover {
    pub fn new(operation: FileOperation, sidecars: bool) -> Self {
        Self { operation, sidecars }
    }

    fn transfer(&self, source: &Path, dest: &Path) -> Result<()> {
        match self.operation {
            FileOperation::Copy => {
                copy_via_temp(source, dest)?;
            }
            FileOperation::Move => {
                // Rename first (cheap on the same filesystem), fall back to
                // copy-then-delete across devices.
                if fs::rename(source, dest).is_err() {
                    copy_via_temp(source, dest)?;
                    fs::remove_file(source)?;
                }
            }
            FileOperation::Symlink => {
                #[cfg(unix)]
                std::os::unix::fs::symlink(source, dest).map_err(|e| {
                    Error::DestinationUnwritable {
                        path: dest.to_path_buf(),
                        message: e.to_string(),
                    }
                })?;
                #[cfg(windows)]
                std::os::windows::fs::symlink_file(source, dest).map_err(|e| {
                    Error::DestinationUnwritable {
                        path: dest.to_path_buf(),
                        message: e.to_string(),
                    }
                })?;
            }
            FileOperation::Hardlink => {
                fs::hard_link(source, dest).map_err(|e| Error::DestinationUnwritable {
                    path: dest.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
        }

        Ok(())
    }

    /// Carry `.xmp` sidecars along with their image, inheriting the final
    /// (possibly suffixed) basename.
    fn transfer_sidecars(&self, decision: &PlacementDecision) -> Result<()> {
        let source = &decision.source;

        // photo.nef.xmp -> <final name>.xmp
        let appended = source.with_file_name(format!(
            "{}.xmp",
            source.file_name().and_then(|n| n.to_str()).unwrap_or_default()
        ));
        if appended.is_file() {
            let target = decision.directory.join(format!("{}.xmp", decision.filename));
            debug!(source = ?appended, ?target, "Carrying sidecar");
            self.transfer(&appended, &target)?;
        }

        // photo.xmp -> <final stem>.xmp
        let replaced = source.with_extension("xmp");
        if replaced != appended && replaced.is_file() {
            let stem = match decision.filename.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem,
                _ => decision.filename.as_str(),
            };
            let target = decision.directory.join(format!("{}.xmp", stem));
            debug!(source = ?replaced, ?target, "Carrying sidecar");
            self.transfer(&replaced, &target)?;
        }

        Ok(())
    }
}

impl FileMover for LocalFileMover {
    fn apply(&self, decision: &PlacementDecision) -> Result<()> {
        match decision.action {
            PlacementAction::SkipDuplicate { .. } => {
                trace!(source = ?decision.source, "Skip-duplicate, nothing to do");
                return Ok(());
            }
            PlacementAction::Move | PlacementAction::RenameConflict => {}
        }

        fs::create_dir_all(&decision.directory).map_err(|e| Error::DestinationUnwritable {
            path: decision.directory.clone(),
            message: e.to_string(),
        })?;

        // Capture before the transfer; a move may unlink the source.
        let source_mtime = fs::metadata(&decision.source)
            .and_then(|m| m.modified())
            .ok();

        let dest = decision.destination();
        self.transfer(&decision.source, &dest)?;
        preserve_mtime(&dest, source_mtime, self.operation);

        if self.sidecars {
            self.transfer_sidecars(decision)?;
        }

        debug!(source = ?decision.source, ?dest, "Applied placement");
        Ok(())
    }
}

fn preserve_mtime(
    dest: &Path,
    source_mtime: Option<std::time::SystemTime>,
    operation: FileOperation,
) {
    if !matches!(operation, FileOperation::Copy | FileOperation::Move) {
        return;
    }
    // Best effort; a lost mtime is not worth failing the placement.
    if let Some(mtime) = source_mtime {
        let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
    }
}

/// Copy through a dotted temporary name in the destination directory, then
/// rename into place.
fn copy_via_temp(source: &Path, dest: &Path) -> Result<()> {
    let dir = dest.parent().ok_or_else(|| Error::DestinationUnwritable {
        path: dest.to_path_buf(),
        message: "destination has no parent directory".into(),
    })?;
    let name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::DestinationUnwritable {
            path: dest.to_path_buf(),
            message: "destination has no valid filename".into(),
        })?;
    let temp = dir.join(format!(".{}.part", name));

    let result = (|| -> Result<()> {
        let src_file = File::open(source).map_err(|e| Error::UnreadableSource {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;
        let dest_file = File::create(&temp).map_err(|e| Error::DestinationUnwritable {
            path: temp.clone(),
            message: e.to_string(),
        })?;

        let mut reader = BufReader::with_capacity(COPY_BUF_SIZE, src_file);
        let mut writer = BufWriter::with_capacity(COPY_BUF_SIZE, dest_file);
        let mut buffer = vec![0u8; COPY_BUF_SIZE];
        loop {
            let bytes_read = reader.read(&mut buffer).map_err(|e| Error::UnreadableSource {
                path: source.to_path_buf(),
                message: e.to_string(),
            })?;
            if bytes_read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| Error::DestinationUnwritable {
                    path: temp.clone(),
                    message: e.to_string(),
                })?;
        }
        writer.flush().map_err(|e| Error::DestinationUnwritable {
            path: temp.clone(),
            message: e.to_string(),
        })?;

        fs::rename(&temp, dest).map_err(|e| Error::DestinationUnwritable {
            path: dest.to_path_buf(),
            message: e.to_string(),
        })
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

/// No-op mover for dry runs: every decision is accepted, nothing happens.
#[derive(Debug, Default)]
pub struct DryRunMover;

impl FileMover for DryRunMover {
    fn apply(&self, decision: &PlacementDecision) -> Result<()> {
        trace!(source = ?decision.source, dest = ?decision.destination(), "Dry run, not applying");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn decision(source: PathBuf, directory: PathBuf, filename: &str) -> PlacementDecision {
        PlacementDecision {
            source,
            directory,
            filename: filename.to_string(),
            action: PlacementAction::Move,
        }
    }

    #[test]
    fn test_copy_creates_destination_and_keeps_source() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let source = input.path().join("a.jpg");
        fs::write(&source, b"payload").unwrap();

        let mover = LocalFileMover::new(FileOperation::Copy, false);
        let d = decision(source.clone(), output.path().join("2024/01/15"), "b.jpg");
        mover.apply(&d).unwrap();

        assert!(source.exists());
        assert_eq!(fs::read(d.destination()).unwrap(), b"payload");
        // No temp artifacts left behind
        assert!(!d.directory.join(".b.jpg.part").exists());
    }

    #[test]
    fn test_move_removes_source() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let source = input.path().join("a.jpg");
        fs::write(&source, b"payload").unwrap();

        let mover = LocalFileMover::new(FileOperation::Move, false);
        let d = decision(source.clone(), output.path().to_path_buf(), "b.jpg");
        mover.apply(&d).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read(d.destination()).unwrap(), b"payload");
    }

    #[test]
    fn test_hardlink_shares_content() {
        let input = tempdir().unwrap();
        let source = input.path().join("a.jpg");
        fs::write(&source, b"payload").unwrap();

        let mover = LocalFileMover::new(FileOperation::Hardlink, false);
        // Same tempdir so the link stays on one filesystem
        let d = decision(source.clone(), input.path().join("out"), "b.jpg");
        mover.apply(&d).unwrap();

        assert!(source.exists());
        assert_eq!(fs::read(d.destination()).unwrap(), b"payload");
    }

    #[test]
    fn test_skip_duplicate_touches_nothing() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let source = input.path().join("a.jpg");
        fs::write(&source, b"payload").unwrap();

        let mover = LocalFileMover::new(FileOperation::Move, false);
        let d = PlacementDecision {
            source: source.clone(),
            directory: output.path().join("2024"),
            filename: "b.jpg".into(),
            action: PlacementAction::SkipDuplicate {
                existing: output.path().join("2024/b.jpg"),
            },
        };
        mover.apply(&d).unwrap();

        assert!(source.exists());
        assert!(!d.directory.exists());
    }

    #[test]
    fn test_sidecar_inherits_final_name() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let source = input.path().join("photo.nef");
        fs::write(&source, b"raw bytes").unwrap();
        fs::write(input.path().join("photo.xmp"), b"<xmp/>").unwrap();

        let mover = LocalFileMover::new(FileOperation::Copy, true);
        let d = decision(
            source,
            output.path().to_path_buf(),
            "20240115-143000-1.nef",
        );
        mover.apply(&d).unwrap();

        assert_eq!(
            fs::read(output.path().join("20240115-143000-1.xmp")).unwrap(),
            b"<xmp/>"
        );
    }

    #[test]
    fn test_appended_sidecar_name() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let source = input.path().join("photo.nef");
        fs::write(&source, b"raw bytes").unwrap();
        fs::write(input.path().join("photo.nef.xmp"), b"<xmp/>").unwrap();

        let mover = LocalFileMover::new(FileOperation::Copy, true);
        let d = decision(source, output.path().to_path_buf(), "20240115-143000.nef");
        mover.apply(&d).unwrap();

        assert!(output.path().join("20240115-143000.nef.xmp").exists());
    }

    #[test]
    fn test_unwritable_destination_error() {
        let input = tempdir().unwrap();
        let source = input.path().join("a.jpg");
        fs::write(&source, b"payload").unwrap();
        // A regular file where the directory should go
        let blocker = input.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let mover = LocalFileMover::new(FileOperation::Copy, false);
        let d = decision(source, blocker.join("nested"), "b.jpg");
        let err = mover.apply(&d).unwrap_err();
        assert!(matches!(err, Error::DestinationUnwritable { .. }));
    }
}
