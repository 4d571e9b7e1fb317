//! Raw metadata extraction
//!
//! The placement engine never talks to a metadata library directly; it goes
//! through the [`MetadataReader`] trait and receives plain tag-name/value
//! pairs. The default implementation reads EXIF via kamadak-exif. Files
//! that simply carry no EXIF block yield an empty [`RawMetadata`], which is
//! valid input and triggers the fallback tiers downstream.

use crate::error::{Error, Result};
use exif::{In, Reader};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

/// Tag-name to value mapping for one input file.
///
/// Values are kept as the display strings of the underlying metadata
/// library; parsing into dates happens in the timestamp resolver.
#[derive(Debug, Clone, Default)]
pub struct RawMetadata {
    tags: BTreeMap<String, String>,
}

impl RawMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(tag.into(), value.into());
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }
}

/// External collaborator that yields raw tag key/value pairs for a file.
pub trait MetadataReader: Send + Sync {
    /// Read metadata for `path`.
    ///
    /// Fails with [`Error::UnreadableSource`] when the file itself cannot
    /// be read. A readable file without usable metadata returns an empty
    /// [`RawMetadata`].
    fn read(&self, path: &Path) -> Result<RawMetadata>;
}

/// EXIF-backed [`MetadataReader`] for images (JPEG, HEIF, TIFF, RAW).
#[derive(Debug, Default)]
pub struct ExifMetadataReader;

impl MetadataReader for ExifMetadataReader {
    fn read(&self, path: &Path) -> Result<RawMetadata> {
        let file = File::open(path).map_err(|e| Error::UnreadableSource {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut reader = BufReader::new(file);

        let mut raw = RawMetadata::new();
        match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => {
                for field in exif.fields() {
                    if field.ifd_num != In::PRIMARY {
                        continue;
                    }
                    let tag = field.tag.to_string();
                    // Numeric-only tags keep their display form; the
                    // resolver only parses the ones it is configured for.
                    let value = field.display_value().to_string();
                    raw.insert(tag, value);
                }
                trace!(?path, tags = raw.len(), "Read EXIF metadata");
            }
            Err(exif::Error::Io(e)) => {
                return Err(Error::UnreadableSource {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                // No EXIF block or a container we cannot parse (videos,
                // plain PNGs). Empty metadata is valid input.
                trace!(?path, error = %e, "No EXIF metadata, returning empty set");
            }
        }

        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_raw_metadata_lookup() {
        let mut raw = RawMetadata::new();
        raw.insert("DateTimeOriginal", "2024-01-15 14:30:00");
        assert_eq!(raw.get("DateTimeOriginal"), Some("2024-01-15 14:30:00"));
        assert_eq!(raw.get("DateTime"), None);
        assert!(!raw.is_empty());
    }

    #[test]
    fn test_exif_reader_empty_for_non_image() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not an image at all").unwrap();
        file.flush().unwrap();

        let raw = ExifMetadataReader.read(file.path()).unwrap();
        assert!(raw.is_empty());
    }

    #[test]
    fn test_exif_reader_missing_file() {
        let err = ExifMetadataReader
            .read(Path::new("/nonexistent/never/here.jpg"))
            .unwrap_err();
        assert!(matches!(err, Error::UnreadableSource { .. }));
    }
}
