//! Filename timestamp parsing (tier 2)
//!
//! Each [`FilenamePattern`] maps to one compiled regex; the resolver tries
//! the configured patterns in order and the first valid match wins.

use crate::config::FilenamePattern;
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

static PATTERN_COMPACT: OnceLock<Regex> = OnceLock::new();
static PATTERN_CAMERA: OnceLock<Regex> = OnceLock::new();
static PATTERN_SCREENSHOT: OnceLock<Regex> = OnceLock::new();
static PATTERN_SEPARATED: OnceLock<Regex> = OnceLock::new();
static PATTERN_WHATSAPP: OnceLock<Regex> = OnceLock::new();
static PATTERN_UNIX: OnceLock<Regex> = OnceLock::new();
static PATTERN_DATE_ONLY: OnceLock<Regex> = OnceLock::new();

fn pattern_regex(pattern: FilenamePattern) -> &'static Regex {
    match pattern {
        FilenamePattern::Compact => PATTERN_COMPACT.get_or_init(|| {
            // YYYYMMDD_HHmmss or YYYYMMDD-HHmmss
            Regex::new(r"(\d{4})(\d{2})(\d{2})[_\-](\d{2})(\d{2})(\d{2})").unwrap()
        }),
        FilenamePattern::CameraPrefix => PATTERN_CAMERA.get_or_init(|| {
            // IMG_YYYYMMDD_HHmmss and similar camera naming
            Regex::new(
                r"(?:IMG|VID|DSC|DCIM|MOV|MVI|DJI|GOPR|GP)[-_]?(\d{4})(\d{2})(\d{2})[-_]?(\d{2})(\d{2})(\d{2})",
            )
            .unwrap()
        }),
        FilenamePattern::Screenshot => PATTERN_SCREENSHOT.get_or_init(|| {
            Regex::new(
                r"(?:Screenshot|Screen Shot|Capture)[-_\s]*(\d{4})[-_]?(\d{2})[-_]?(\d{2})[-_\s]*(?:at[-_\s]*)?(\d{1,2})[-_\.]?(\d{2})[-_\.]?(\d{2})",
            )
            .unwrap()
        }),
        FilenamePattern::Separated => PATTERN_SEPARATED.get_or_init(|| {
            // YYYY-MM-DD_HH-mm-ss and similar with separators
            Regex::new(r"(\d{4})[-_](\d{2})[-_](\d{2})[-_\s](\d{2})[-_](\d{2})[-_](\d{2})").unwrap()
        }),
        FilenamePattern::Whatsapp => PATTERN_WHATSAPP.get_or_init(|| {
            // IMG-YYYYMMDD-WAxxxx, date only
            Regex::new(r"(?:IMG|VID)[-_](\d{4})(\d{2})(\d{2})[-_]WA").unwrap()
        }),
        FilenamePattern::UnixEpoch => PATTERN_UNIX.get_or_init(|| {
            // 10-digit seconds or 13-digit milliseconds
            Regex::new(r"(\d{10}|\d{13})").unwrap()
        }),
        FilenamePattern::DateOnly => PATTERN_DATE_ONLY.get_or_init(|| {
            Regex::new(r"(\d{4})(\d{2})(\d{2})").unwrap()
        }),
    }
}

/// Parse a timestamp out of `filename` using the given patterns, in order.
pub fn parse_filename_time(
    filename: &str,
    patterns: &[FilenamePattern],
) -> Option<NaiveDateTime> {
    // Strip the extension so trailing digits in it cannot confuse matches
    let name = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };

    for &pattern in patterns {
        if let Some(dt) = try_pattern(name, pattern) {
            trace!(filename, ?pattern, "Matched filename date pattern");
            return Some(dt);
        }
    }

    None
}

fn try_pattern(name: &str, pattern: FilenamePattern) -> Option<NaiveDateTime> {
    let caps = pattern_regex(pattern).captures(name)?;

    match pattern {
        FilenamePattern::UnixEpoch => {
            let timestamp_str = caps.get(1)?.as_str();
            let mut timestamp: i64 = timestamp_str.parse().ok()?;
            if timestamp_str.len() == 13 {
                timestamp /= 1000;
            }
            // Plausibility window 1990..2100
            if !(631152000..=4102444800).contains(&timestamp) {
                return None;
            }
            chrono::DateTime::from_timestamp(timestamp, 0).map(|dt| dt.naive_utc())
        }
        FilenamePattern::Whatsapp | FilenamePattern::DateOnly => build_datetime(
            caps.get(1)?.as_str(),
            caps.get(2)?.as_str(),
            caps.get(3)?.as_str(),
            "00",
            "00",
            "00",
        ),
        _ => build_datetime(
            caps.get(1)?.as_str(),
            caps.get(2)?.as_str(),
            caps.get(3)?.as_str(),
            caps.get(4)?.as_str(),
            caps.get(5)?.as_str(),
            caps.get(6)?.as_str(),
        ),
    }
}

fn build_datetime(
    year: &str,
    month: &str,
    day: &str,
    hour: &str,
    minute: &str,
    second: &str,
) -> Option<NaiveDateTime> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    let second: u32 = second.parse().ok()?;

    // Years outside this window are almost certainly not capture dates
    if !(1990..=2100).contains(&year) {
        return None;
    }
    if hour > 23 || minute > 59 || second > 59 {
        return None;
    }

    chrono::NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}
