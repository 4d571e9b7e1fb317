//! Timestamp resolution
//!
//! Determines the canonical capture date+time of a media file from a
//! strict fallback chain, first success wins:
//! 1. Configured metadata tags, in order
//! 2. Configured filename date patterns, in order
//! 3. File system modification time
//!
//! Tiers 1 and 2 reject unparseable or out-of-range values silently and
//! fall through; tier 3 only fails when the mtime itself cannot be read,
//! which is the sole way resolution produces [`Error::UnresolvedDate`].
//! Timezone is not normalized: values are naive wall-clock readings taken
//! as-is from their source.

pub mod filename;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::metadata::RawMetadata;
use chrono::NaiveDateTime;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Which fallback tier produced the timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSource {
    /// A metadata tag, by name
    Tag(String),
    /// A filename date pattern
    FilenamePattern,
    /// File system modification time
    FileModified,
}

/// Fully populated resolution result
#[derive(Debug, Clone)]
pub struct ResolvedTimestamp {
    /// The resolved capture timestamp
    pub timestamp: NaiveDateTime,
    /// Source tier that produced it
    pub source: TimeSource,
    /// Sub-second digits, when the source tag carried a companion
    /// sub-second tag (used only for filename composition)
    pub subseconds: Option<String>,
}

/// Resolve the capture timestamp for `path`.
pub fn resolve(path: &Path, raw: &RawMetadata, config: &Config) -> Result<ResolvedTimestamp> {
    // Tier 1: configured metadata tags, in priority order
    for tag in &config.date_tags {
        let Some(value) = raw.get(tag) else { continue };
        match parse_datetime_value(value) {
            Some(timestamp) => {
                debug!(?path, tag, "Resolved timestamp from metadata tag");
                return Ok(ResolvedTimestamp {
                    timestamp,
                    subseconds: subseconds_for_tag(raw, tag),
                    source: TimeSource::Tag(tag.clone()),
                });
            }
            None => {
                debug!(?path, tag, value, "Tag value not parseable, falling through");
            }
        }
    }

    // Tier 2: filename date patterns
    if let Some(name) = path.file_name().and_then(|f| f.to_str())
        && let Some(timestamp) = filename::parse_filename_time(name, &config.filename_patterns)
    {
        debug!(?path, "Resolved timestamp from filename pattern");
        return Ok(ResolvedTimestamp {
            timestamp,
            source: TimeSource::FilenamePattern,
            subseconds: None,
        });
    }

    // Tier 3: file system modification time. Terminal: only an unreadable
    // mtime makes resolution fail.
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| Error::UnresolvedDate {
            path: path.to_path_buf(),
            message: format!("modification time unavailable: {}", e),
        })?;
    let datetime: chrono::DateTime<chrono::Local> = modified.into();

    warn!(?path, "Using file system modification time as fallback");

    Ok(ResolvedTimestamp {
        timestamp: datetime.naive_local(),
        source: TimeSource::FileModified,
        subseconds: None,
    })
}

/// Companion sub-second tag for a date tag: `DateTimeOriginal` pairs with
/// `SubSecTimeOriginal`, `DateTime` with `SubSecTime`, and so on.
fn subseconds_for_tag(raw: &RawMetadata, tag: &str) -> Option<String> {
    let suffix = tag.strip_prefix("Date")?;
    let value = raw.get(&format!("SubSec{}", suffix))?.trim();
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        Some(value.to_string())
    } else {
        None
    }
}

/// Parse a metadata datetime string.
///
/// EXIF's "YYYY:MM:DD HH:MM:SS" first, then common variants. Out-of-range
/// components (month 13, day 32, invalid leap day) are rejected by chrono
/// and yield `None`.
fn parse_datetime_value(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"');

    let formats = [
        "%Y:%m:%d %H:%M:%S",
        "%Y:%m:%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];

    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    None
}
