//! Run orchestration
//!
//! Collects input files, drives the placement engine across a rayon worker
//! pool, and hands each decision to the file mover. One bad file records a
//! failure and the run continues; run-fatal errors (and any failure in
//! strict mode) abort after the parallel pass.

use crate::config::{Config, IGNORED_BASENAMES};
use crate::engine::{PlacementAction, PlacementDecision, PlacementEngine};
use crate::error::{Error, Result};
use crate::index::DuplicateIndex;
use crate::metadata::{ExifMetadataReader, MetadataReader};
use crate::mover::{DryRunMover, FileMover, LocalFileMover};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{Level, debug, error, info, span, warn};
use walkdir::WalkDir;

/// Outcome of processing a single input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Placed under its composed name
    Placed,
    /// Identical content already in the output tree
    SkippedDuplicate,
    /// Placed under a suffixed name after a collision
    RenamedConflict,
    /// Processing failed
    Failed,
}

/// Per-file result of a run
#[derive(Debug, Clone)]
pub struct FileReport {
    pub source: PathBuf,
    /// Final destination, or the already-placed path for duplicates
    pub destination: Option<PathBuf>,
    pub status: FileStatus,
    pub error: Option<String>,
}

/// Run statistics, updated concurrently by the workers
#[derive(Debug, Default)]
pub struct RunStats {
    pub total_files: AtomicUsize,
    pub placed: AtomicUsize,
    pub duplicates: AtomicUsize,
    pub conflicts: AtomicUsize,
    pub failed: AtomicUsize,
}

impl RunStats {
    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Placed: {}, Duplicates: {}, Renamed: {}, Failed: {}",
            self.total_files.load(Ordering::Relaxed),
            self.placed.load(Ordering::Relaxed),
            self.duplicates.load(Ordering::Relaxed),
            self.conflicts.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

/// Top-level runner for one invocation
pub struct Runner {
    config: Arc<Config>,
    engine: PlacementEngine,
    mover: Box<dyn FileMover>,
    stats: Arc<RunStats>,
}

impl Runner {
    /// Build a runner with the default collaborators: EXIF metadata
    /// reading and local filesystem moves (or a no-op mover in dry runs).
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        if config.threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .build_global()
                .ok(); // Ignore if already initialized
        }

        let reader: Arc<dyn MetadataReader> = Arc::new(ExifMetadataReader);
        Self::with_collaborators(config, reader)
    }

    /// Build a runner with a custom metadata reader.
    pub fn with_collaborators(config: Config, reader: Arc<dyn MetadataReader>) -> Result<Self> {
        let mover: Box<dyn FileMover> = if config.dry_run {
            Box::new(DryRunMover)
        } else {
            Box::new(LocalFileMover::new(config.operation, config.sidecars))
        };

        let config = Arc::new(config);
        let engine = PlacementEngine::new(
            config.clone(),
            Arc::new(DuplicateIndex::new()),
            reader,
        );

        Ok(Self {
            config,
            engine,
            mover,
            stats: Arc::new(RunStats::default()),
        })
    }

    /// Run the full pipeline over the configured input directories.
    pub fn run(&self) -> Result<Vec<FileReport>> {
        let _span = span!(Level::INFO, "run").entered();

        info!("Scanning input directories...");
        let files = self.collect_files()?;
        info!(count = files.len(), "Found media files");

        if files.is_empty() {
            info!("No files to process");
            return Ok(Vec::new());
        }

        self.stats.total_files.store(files.len(), Ordering::Relaxed);

        if !self.config.dry_run {
            fs::create_dir_all(&self.config.output_dir).map_err(|e| {
                Error::DestinationUnwritable {
                    path: self.config.output_dir.clone(),
                    message: e.to_string(),
                }
            })?;
        }

        // First run-fatal error, if any; the parallel pass still runs to
        // completion and files already moved stay moved.
        let fatal: std::sync::Mutex<Option<Error>> = std::sync::Mutex::new(None);

        let reports: Vec<FileReport> = files
            .par_iter()
            .map(|path| self.process_single(path, &fatal))
            .collect();

        if let Some(e) = fatal.into_inner().unwrap() {
            return Err(e);
        }

        info!("{}", self.stats.summary());
        Ok(reports)
    }

    /// Shared run statistics
    pub fn stats(&self) -> Arc<RunStats> {
        self.stats.clone()
    }

    fn process_single(
        &self,
        path: &Path,
        fatal: &std::sync::Mutex<Option<Error>>,
    ) -> FileReport {
        let _span = span!(Level::DEBUG, "process_file", ?path).entered();

        let decision = match self.engine.place(path) {
            Ok(decision) => decision,
            Err(e) => {
                error!(?path, error = %e, "Failed to decide placement");
                return self.record_failure(path, None, e, fatal);
            }
        };

        if let Err(e) = self.mover.apply(&decision) {
            error!(?path, dest = ?decision.destination(), error = %e, "Failed to apply placement");
            return self.record_failure(path, Some(decision.destination()), e, fatal);
        }

        report_for(&decision, &self.stats, self.config.dry_run)
    }

    fn record_failure(
        &self,
        path: &Path,
        destination: Option<PathBuf>,
        e: Error,
        fatal: &std::sync::Mutex<Option<Error>>,
    ) -> FileReport {
        self.stats.failed.fetch_add(1, Ordering::Relaxed);
        let message = e.to_string();
        if self.config.strict || e.is_run_fatal() {
            let mut slot = fatal.lock().unwrap();
            if slot.is_none() {
                *slot = Some(e);
            }
        }
        FileReport {
            source: path.to_path_buf(),
            destination,
            status: FileStatus::Failed,
            error: Some(message),
        }
    }

    /// Collect all media files from the input directories, sorted for a
    /// deterministic processing order.
    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input_dir in &self.config.input_dirs {
            if !input_dir.exists() {
                warn!(?input_dir, "Input directory does not exist, skipping");
                continue;
            }

            for entry in WalkDir::new(input_dir)
                .follow_links(true)
                .into_iter()
                .filter_entry(|e| !self.is_excluded_dir(e.path()))
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                if let Some(name) = path.file_name().and_then(|n| n.to_str())
                    && IGNORED_BASENAMES.contains(&name)
                {
                    continue;
                }
                if let Some(ext) = path.extension().and_then(|e| e.to_str())
                    && self.config.is_supported(ext)
                {
                    files.push(path.to_path_buf());
                }
            }
        }

        files.sort();
        debug!(count = files.len(), "Collected input files");
        Ok(files)
    }

    /// Check if a path should be excluded based on exclude_dirs
    fn is_excluded_dir(&self, path: &Path) -> bool {
        for exclude in &self.config.exclude_dirs {
            if exclude.is_absolute() {
                if path.starts_with(exclude) {
                    debug!(?path, ?exclude, "Excluding directory (absolute path match)");
                    return true;
                }
            } else if let Some(exclude_name) = exclude.file_name() {
                for component in path.components() {
                    if let std::path::Component::Normal(name) = component
                        && name == exclude_name
                    {
                        debug!(?path, ?exclude, "Excluding directory (folder name match)");
                        return true;
                    }
                }
            }
        }

        false
    }
}

fn report_for(decision: &PlacementDecision, stats: &RunStats, dry_run: bool) -> FileReport {
    match &decision.action {
        PlacementAction::Move => {
            stats.placed.fetch_add(1, Ordering::Relaxed);
            info!(
                source = ?decision.source,
                dest = ?decision.destination(),
                dry_run,
                "Placed file"
            );
            FileReport {
                source: decision.source.clone(),
                destination: Some(decision.destination()),
                status: FileStatus::Placed,
                error: None,
            }
        }
        PlacementAction::RenameConflict => {
            stats.conflicts.fetch_add(1, Ordering::Relaxed);
            info!(
                source = ?decision.source,
                dest = ?decision.destination(),
                dry_run,
                "Placed file under suffixed name"
            );
            FileReport {
                source: decision.source.clone(),
                destination: Some(decision.destination()),
                status: FileStatus::RenamedConflict,
                error: None,
            }
        }
        PlacementAction::SkipDuplicate { existing } => {
            stats.duplicates.fetch_add(1, Ordering::Relaxed);
            info!(source = ?decision.source, ?existing, "Skipped duplicate");
            FileReport {
                source: decision.source.clone(),
                destination: Some(existing.clone()),
                status: FileStatus::SkippedDuplicate,
                error: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_config(input: &Path, output: &Path) -> Config {
        Config {
            input_dirs: vec![input.to_path_buf()],
            output_dir: output.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_end_to_end_copy_with_filename_dates() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(input.path().join("20240115_143000.jpg"), b"photo one").unwrap();
        fs::write(input.path().join("20240116_080000.jpg"), b"photo two").unwrap();
        fs::write(input.path().join("notes.txt"), b"not media").unwrap();

        let runner = Runner::new(test_config(input.path(), output.path())).unwrap();
        let reports = runner.run().unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.status == FileStatus::Placed));
        assert!(
            output
                .path()
                .join("2024/01/15/20240115-143000.jpg")
                .is_file()
        );
        assert!(
            output
                .path()
                .join("2024/01/16/20240116-080000.jpg")
                .is_file()
        );
    }

    #[test]
    fn test_duplicate_content_placed_once() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        // Same bytes, same composed name, different source names
        fs::write(input.path().join("20240115_143000.jpg"), b"same").unwrap();
        fs::write(input.path().join("IMG_20240115_143000.jpg"), b"same").unwrap();

        let runner = Runner::new(test_config(input.path(), output.path())).unwrap();
        let reports = runner.run().unwrap();

        let placed = reports
            .iter()
            .filter(|r| r.status == FileStatus::Placed)
            .count();
        let duplicates = reports
            .iter()
            .filter(|r| r.status == FileStatus::SkippedDuplicate)
            .count();
        assert_eq!(placed, 1);
        assert_eq!(duplicates, 1);

        let day_dir = output.path().join("2024/01/15");
        let count = fs::read_dir(day_dir).unwrap().count();
        assert_eq!(count, 1, "exactly one physical file for that content");
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(input.path().join("20240115_143000.jpg"), b"photo").unwrap();

        let first = Runner::new(test_config(input.path(), output.path())).unwrap();
        first.run().unwrap();

        // Fresh runner, fresh index: dedup must come from reseeding.
        let second = Runner::new(test_config(input.path(), output.path())).unwrap();
        let reports = second.run().unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, FileStatus::SkippedDuplicate);
        let count = fs::read_dir(output.path().join("2024/01/15")).unwrap().count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_name_collision_keeps_both_files() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let sub = input.path().join("sub");
        fs::create_dir(&sub).unwrap();
        // Same composed name, different content
        fs::write(input.path().join("20240115_143000.jpg"), b"one").unwrap();
        fs::write(sub.join("20240115_143000.jpg"), b"two").unwrap();

        let runner = Runner::new(test_config(input.path(), output.path())).unwrap();
        let reports = runner.run().unwrap();

        assert_eq!(reports.len(), 2);
        let day_dir = output.path().join("2024/01/15");
        let mut names: Vec<String> = fs::read_dir(day_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["20240115-143000-1.jpg", "20240115-143000.jpg"]);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(input.path().join("20240115_143000.jpg"), b"photo").unwrap();

        let mut config = test_config(input.path(), output.path());
        config.dry_run = true;
        let runner = Runner::new(config).unwrap();
        let reports = runner.run().unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, FileStatus::Placed);
        assert!(!output.path().join("2024").exists());
    }

    #[test]
    fn test_excluded_dirs_are_skipped() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let hidden = input.path().join(".thumbnails");
        fs::create_dir(&hidden).unwrap();
        fs::write(hidden.join("20240115_143000.jpg"), b"thumb").unwrap();
        fs::write(input.path().join("20240116_080000.jpg"), b"real").unwrap();

        let mut config = test_config(input.path(), output.path());
        config.exclude_dirs = vec![PathBuf::from(".thumbnails")];
        let runner = Runner::new(config).unwrap();
        let reports = runner.run().unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].source.file_name().unwrap(),
            "20240116_080000.jpg"
        );
    }
}
