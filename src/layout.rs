//! Destination path composition
//!
//! Pure functions from (timestamp, layout, original name) to a relative
//! destination directory and base filename. No filesystem access, so
//! repeated runs compose identical paths for identical inputs.

use crate::config::DirSegment;
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::path::PathBuf;

/// Compose the relative destination directory and base filename for a
/// dated file.
///
/// The directory follows `segments` outermost-first. The filename is
/// date-derived (`YYYYMMDD-HHMMSS`, plus sub-second digits when present)
/// unless `original_filenames` is set; the extension is always taken from
/// `original_name` and lower-cased.
pub fn compose(
    timestamp: &NaiveDateTime,
    subseconds: Option<&str>,
    segments: &[DirSegment],
    original_filenames: bool,
    original_name: &str,
) -> (PathBuf, String) {
    let mut dir = PathBuf::new();
    for segment in segments {
        match segment {
            DirSegment::Year => dir.push(format!("{:04}", timestamp.year())),
            DirSegment::Month => dir.push(format!("{:02}", timestamp.month())),
            DirSegment::Day => dir.push(format!("{:02}", timestamp.day())),
            DirSegment::YearMonth => {
                dir.push(format!("{:04}-{:02}", timestamp.year(), timestamp.month()))
            }
        }
    }

    let filename = if original_filenames {
        original_name.to_string()
    } else {
        let mut name = format!(
            "{:04}{:02}{:02}-{:02}{:02}{:02}",
            timestamp.year(),
            timestamp.month(),
            timestamp.day(),
            timestamp.hour(),
            timestamp.minute(),
            timestamp.second(),
        );
        if let Some(subsec) = subseconds {
            name.push_str(subsec);
        }
        if let Some(ext) = extension_of(original_name) {
            name.push('.');
            name.push_str(&ext.to_lowercase());
        }
        name
    };

    (dir, filename)
}

/// Compose the destination for a file whose date could not be resolved:
/// the sentinel directory, original basename unchanged.
pub fn compose_unknown(sentinel_dir: &str, original_name: &str) -> (PathBuf, String) {
    (PathBuf::from(sentinel_dir), original_name.to_string())
}

/// Insert a numeric collision suffix before the extension:
/// `20240115-143000.jpg` -> `20240115-143000-1.jpg`.
pub fn suffixed_name(base: &str, suffix: u32) -> String {
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, suffix, ext),
        _ => format!("{}-{}", base, suffix),
    }
}

fn extension_of(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(14, 30, 5)
            .unwrap()
    }

    #[test]
    fn test_default_layout() {
        let (dir, name) = compose(
            &ts(),
            None,
            &[DirSegment::Year, DirSegment::Month, DirSegment::Day],
            false,
            "IMG_0001.JPG",
        );
        assert_eq!(dir, PathBuf::from("2024/01/15"));
        assert_eq!(name, "20240115-143005.jpg");
    }

    #[test]
    fn test_year_month_combined_layout() {
        let (dir, _) = compose(&ts(), None, &[DirSegment::YearMonth], false, "a.jpg");
        assert_eq!(dir, PathBuf::from("2024-01"));
    }

    #[test]
    fn test_subseconds_in_filename() {
        let (_, name) = compose(
            &ts(),
            Some("042"),
            &[DirSegment::Year],
            false,
            "IMG_0001.jpg",
        );
        assert_eq!(name, "20240115-143005042.jpg");
    }

    #[test]
    fn test_original_filenames_kept_verbatim() {
        let (_, name) = compose(&ts(), None, &[DirSegment::Year], true, "IMG_0001.JPG");
        assert_eq!(name, "IMG_0001.JPG");
    }

    #[test]
    fn test_no_extension() {
        let (_, name) = compose(&ts(), None, &[], false, "noext");
        assert_eq!(name, "20240115-143005");
    }

    #[test]
    fn test_compose_is_pure() {
        let a = compose(&ts(), Some("9"), &[DirSegment::Year, DirSegment::Month], false, "x.NEF");
        let b = compose(&ts(), Some("9"), &[DirSegment::Year, DirSegment::Month], false, "x.NEF");
        assert_eq!(a, b);
    }

    #[test]
    fn test_compose_unknown() {
        let (dir, name) = compose_unknown("unknown", "mystery.bin");
        assert_eq!(dir, PathBuf::from("unknown"));
        assert_eq!(name, "mystery.bin");
    }

    #[test]
    fn test_suffixed_name() {
        assert_eq!(suffixed_name("20240115-143005.jpg", 1), "20240115-143005-1.jpg");
        assert_eq!(suffixed_name("IMG_0001.jpg", 3), "IMG_0001-3.jpg");
        assert_eq!(suffixed_name("noext", 2), "noext-2");
        assert_eq!(suffixed_name(".hidden", 1), ".hidden-1");
    }
}
