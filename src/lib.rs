//! shuttersort - organize photos and videos into a date-keyed tree
//!
//! This library determines each media file's capture timestamp (EXIF tags,
//! filename patterns, file modification time, in that order), composes a
//! normalized destination path, deduplicates by content hash against the
//! output tree, and resolves name collisions deterministically. Files are
//! never lost or silently overwritten: every destination name is claimed
//! in a shared run-scoped index before the physical copy or move starts.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod layout;
pub mod metadata;
pub mod mover;
pub mod runner;
pub mod time;

pub use cli::Cli;
pub use config::{Config, DirSegment, FileOperation, FilenamePattern, UnknownDatePolicy};
pub use engine::{PlacementAction, PlacementDecision, PlacementEngine};
pub use error::{Error, Result};
pub use fingerprint::{Fingerprint, fingerprint_file};
pub use index::{ClaimOutcome, DuplicateIndex};
pub use metadata::{ExifMetadataReader, MetadataReader, RawMetadata};
pub use mover::{DryRunMover, FileMover, LocalFileMover};
pub use runner::{FileReport, FileStatus, RunStats, Runner};
pub use time::{ResolvedTimestamp, TimeSource};
