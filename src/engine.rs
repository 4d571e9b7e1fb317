//! Placement engine
//!
//! Per-file orchestration: resolve the capture timestamp, compose the
//! destination, seed and consult the duplicate index, and claim a final
//! filename. The engine only decides; the physical operation is performed
//! by the [`FileMover`](crate::mover::FileMover) from the emitted
//! [`PlacementDecision`]. Claims are registered before any move starts, so
//! a decision can never be invalidated by a concurrent worker.

use crate::config::{Config, UnknownDatePolicy};
use crate::error::{Error, Result};
use crate::fingerprint::{Fingerprint, fingerprint_file};
use crate::index::{ClaimOutcome, DuplicateIndex};
use crate::layout;
use crate::metadata::MetadataReader;
use crate::time;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Suffix retry cap. Hitting it means something other than ordinary
/// collisions is going on and the run aborts.
pub const MAX_SUFFIX_RETRIES: u32 = 256;

/// What the file mover should do for one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementAction {
    /// Place under the composed name
    Move,
    /// Identical content already placed at `existing`; do nothing
    SkipDuplicate { existing: PathBuf },
    /// Place under a suffixed name after a collision with different content
    RenameConflict,
}

/// Decision for one input file, consumed exactly once by the file mover.
#[derive(Debug, Clone)]
pub struct PlacementDecision {
    pub source: PathBuf,
    /// Absolute destination directory
    pub directory: PathBuf,
    /// Final base filename inside `directory`
    pub filename: String,
    pub action: PlacementAction,
}

impl PlacementDecision {
    pub fn destination(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Classification and placement engine, shared across workers.
pub struct PlacementEngine {
    config: Arc<Config>,
    index: Arc<DuplicateIndex>,
    reader: Arc<dyn MetadataReader>,
}

impl PlacementEngine {
    pub fn new(
        config: Arc<Config>,
        index: Arc<DuplicateIndex>,
        reader: Arc<dyn MetadataReader>,
    ) -> Self {
        Self { config, index, reader }
    }

    /// Decide the placement for one input file.
    pub fn place(&self, path: &Path) -> Result<PlacementDecision> {
        let original_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::UnreadableSource {
                path: path.to_path_buf(),
                message: "source has no valid UTF-8 filename".into(),
            })?;

        // Metadata read and timestamp resolution
        let raw = self.reader.read(path)?;
        let (rel_dir, base_name) = match time::resolve(path, &raw, &self.config) {
            Ok(resolved) => layout::compose(
                &resolved.timestamp,
                resolved.subseconds.as_deref(),
                &self.config.dir_layout,
                self.config.original_filenames,
                original_name,
            ),
            Err(err @ Error::UnresolvedDate { .. }) => match self.config.unknown_date {
                UnknownDatePolicy::Sentinel => {
                    warn!(?path, "No resolvable date, placing under sentinel directory");
                    layout::compose_unknown(&self.config.sentinel_dir, original_name)
                }
                UnknownDatePolicy::Fail => return Err(err),
            },
            Err(err) => return Err(err),
        };
        let directory = self.config.output_dir.join(rel_dir);

        // Seed before fingerprinting so pre-existing output content is
        // visible to the lookup below.
        self.index.ensure_seeded(&directory, self.config.deduplicate)?;

        let fingerprint: Option<Fingerprint> = if self.config.deduplicate {
            Some(fingerprint_file(path)?)
        } else {
            None
        };

        if let Some(fp) = fingerprint
            && let Some(existing) = self.index.lookup(fp)
        {
            debug!(?path, ?existing, "Content already placed, skipping duplicate");
            return Ok(PlacementDecision {
                source: path.to_path_buf(),
                directory,
                filename: base_name,
                action: PlacementAction::SkipDuplicate { existing },
            });
        }

        // Claim, then act: reserve the final name (and fingerprint) before
        // any physical operation. Losing a race re-derives a suffix.
        let mut candidate = base_name.clone();
        for attempt in 0..=MAX_SUFFIX_RETRIES {
            match self.index.claim(&directory, &candidate, fingerprint) {
                ClaimOutcome::Claimed => {
                    let action = if attempt == 0 {
                        PlacementAction::Move
                    } else {
                        debug!(?path, filename = %candidate, "Resolved name collision with suffix");
                        PlacementAction::RenameConflict
                    };
                    return Ok(PlacementDecision {
                        source: path.to_path_buf(),
                        directory,
                        filename: candidate,
                        action,
                    });
                }
                ClaimOutcome::DuplicateContent(existing) => {
                    // Second dedup check: identical content registered by a
                    // concurrent worker between lookup and claim.
                    debug!(?path, ?existing, "Duplicate content detected at claim time");
                    return Ok(PlacementDecision {
                        source: path.to_path_buf(),
                        directory,
                        filename: base_name,
                        action: PlacementAction::SkipDuplicate { existing },
                    });
                }
                ClaimOutcome::NameTaken => {
                    candidate = layout::suffixed_name(&base_name, attempt + 1);
                }
            }
        }

        Err(Error::CollisionRetryExhausted {
            path: directory.join(base_name),
            attempts: MAX_SUFFIX_RETRIES,
        })
    }
}
