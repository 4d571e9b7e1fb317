//! Configuration types for shuttersort

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One directory segment of the destination layout, derived from the
/// resolved timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DirSegment {
    /// YYYY
    Year,
    /// MM
    Month,
    /// DD
    Day,
    /// YYYY-MM (combined, single level)
    YearMonth,
}

/// Named filename date patterns for the tier-2 fallback, tried in the
/// configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FilenamePattern {
    /// YYYYMMDD_HHmmss or YYYYMMDD-HHmmss
    Compact,
    /// IMG_YYYYMMDD_HHmmss and similar camera prefixes
    CameraPrefix,
    /// Screenshot_YYYY-MM-DD-HH-mm-ss and platform variants
    Screenshot,
    /// YYYY-MM-DD_HH-mm-ss with separators
    Separated,
    /// IMG-YYYYMMDD-WAxxxx (date only)
    Whatsapp,
    /// 10- or 13-digit Unix epoch
    UnixEpoch,
    /// Bare YYYYMMDD (date only)
    DateOnly,
}

/// What to do with a file whose date cannot be resolved at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnknownDatePolicy {
    /// Place the file under the sentinel directory
    #[default]
    Sentinel,
    /// Record the file as failed
    Fail,
}

/// Physical file operation performed for each placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    /// Copy files to destination
    #[default]
    Copy,
    /// Move files to destination
    Move,
    /// Create symbolic links (Unix-like systems only)
    Symlink,
    /// Create hard links
    Hardlink,
}

/// Configuration for a shuttersort run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Input directories to scan for media files
    pub input_dirs: Vec<PathBuf>,

    /// Output root for the organized tree
    pub output_dir: PathBuf,

    /// Directories to exclude from scanning (absolute paths or folder names)
    #[serde(default)]
    pub exclude_dirs: Vec<PathBuf>,

    /// Metadata tag names tried in order for tier-1 date resolution
    pub date_tags: Vec<String>,

    /// Filename date patterns tried in order for tier-2 resolution
    pub filename_patterns: Vec<FilenamePattern>,

    /// Destination directory layout, outermost segment first
    pub dir_layout: Vec<DirSegment>,

    /// Keep original basenames instead of date-derived names
    #[serde(default)]
    pub original_filenames: bool,

    /// Policy for files with no resolvable date
    #[serde(default)]
    pub unknown_date: UnknownDatePolicy,

    /// Sentinel directory name for unknown-date files
    pub sentinel_dir: String,

    /// Physical operation to perform
    pub operation: FileOperation,

    /// Enable content deduplication
    pub deduplicate: bool,

    /// Carry .xmp sidecar files along with their image
    #[serde(default = "default_true")]
    pub sidecars: bool,

    /// Treat any per-file failure as run-fatal
    #[serde(default)]
    pub strict: bool,

    /// Number of worker threads (0 = auto)
    pub threads: usize,

    /// Dry run mode: decide everything, touch nothing
    pub dry_run: bool,

    /// Verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Supported image extensions
    pub image_extensions: Vec<String>,

    /// Supported video extensions
    pub video_extensions: Vec<String>,

    /// Supported RAW extensions
    pub raw_extensions: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Basenames never treated as media input
pub const IGNORED_BASENAMES: &[&str] = &[".DS_Store", "Thumbs.db"];

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dirs: vec![],
            output_dir: PathBuf::from("output"),
            exclude_dirs: vec![],
            date_tags: vec![
                "DateTimeOriginal".into(),
                "DateTimeDigitized".into(),
                "DateTime".into(),
            ],
            filename_patterns: vec![
                FilenamePattern::Compact,
                FilenamePattern::CameraPrefix,
                FilenamePattern::Screenshot,
                FilenamePattern::Separated,
                FilenamePattern::Whatsapp,
                FilenamePattern::UnixEpoch,
                FilenamePattern::DateOnly,
            ],
            dir_layout: vec![DirSegment::Year, DirSegment::Month, DirSegment::Day],
            original_filenames: false,
            unknown_date: UnknownDatePolicy::default(),
            sentinel_dir: "unknown".into(),
            operation: FileOperation::default(),
            deduplicate: true,
            sidecars: true,
            strict: false,
            threads: 0, // Auto-detect
            dry_run: false,
            verbose: false,
            image_extensions: vec![
                "jpg".into(), "jpeg".into(), "png".into(), "gif".into(),
                "bmp".into(), "webp".into(), "heic".into(), "heif".into(),
                "avif".into(), "tiff".into(), "tif".into(),
            ],
            video_extensions: vec![
                "mp4".into(), "mov".into(), "avi".into(), "mkv".into(),
                "wmv".into(), "flv".into(), "m4v".into(), "3gp".into(),
            ],
            raw_extensions: vec![
                "raw".into(), "arw".into(), "cr2".into(), "cr3".into(),
                "nef".into(), "orf".into(), "rw2".into(), "dng".into(),
                "raf".into(), "srw".into(), "pef".into(),
            ],
        }
    }
}

impl Config {
    /// Check if a file extension is a supported image format
    pub fn is_image(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.image_extensions.iter().any(|e| e == &ext_lower)
            || self.raw_extensions.iter().any(|e| e == &ext_lower)
    }

    /// Check if a file extension is a supported video format
    pub fn is_video(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.video_extensions.iter().any(|e| e == &ext_lower)
    }

    /// Check if a file extension is a supported RAW format
    pub fn is_raw(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.raw_extensions.iter().any(|e| e == &ext_lower)
    }

    /// Check if a file extension is supported at all
    pub fn is_supported(&self, ext: &str) -> bool {
        self.is_image(ext) || self.is_video(ext)
    }

    /// Validate settings that cannot be expressed through types
    pub fn validate(&self) -> Result<()> {
        if self.input_dirs.is_empty() {
            return Err(Error::Config("No input directories specified".into()));
        }
        if self.sentinel_dir.is_empty()
            || self.sentinel_dir.contains(std::path::MAIN_SEPARATOR)
        {
            return Err(Error::Config(format!(
                "Invalid sentinel directory name: {:?}",
                self.sentinel_dir
            )));
        }
        if self.date_tags.is_empty() && self.filename_patterns.is_empty() {
            return Err(Error::Config(
                "At least one date tag or filename pattern must be configured".into(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file '{}': {}", path.display(), e))
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;
        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# shuttersort configuration file (TOML)

# Input directories to scan for media files
input_dirs = [
    "/data/incoming",
]

# Output root for the organized tree
output_dir = "/data/library"

# Directories to exclude from scanning
# Can be absolute paths or folder names (matches any folder with that name)
exclude_dirs = [
    ".sync",
    ".thumbnails",
    "@eaDir",
]

# Metadata tags tried in order for date resolution (first parseable wins)
date_tags = ["DateTimeOriginal", "DateTimeDigitized", "DateTime"]

# Filename date patterns tried in order when no tag yields a date
filename_patterns = [
    "compact", "camera-prefix", "screenshot",
    "separated", "whatsapp", "unix-epoch", "date-only",
]

# Destination layout, outermost segment first:
# "year", "month", "day", "year-month"
dir_layout = ["year", "month", "day"]

# Keep original basenames instead of date-derived names
original_filenames = false

# Files with no resolvable date: "sentinel" or "fail"
unknown_date = "sentinel"
sentinel_dir = "unknown"

# File operation: "copy", "move", "symlink", or "hardlink"
operation = "copy"

# Skip files whose content is already placed in the output tree
deduplicate = true

# Carry .xmp sidecars along with their image
sidecars = true

# Treat any per-file failure as run-fatal
strict = false

# Worker threads (0 = auto-detect)
threads = 0

# Show what would be done without doing it
dry_run = false

# Supported file extensions (customize as needed)
image_extensions = ["jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "heif", "avif", "tiff", "tif"]
video_extensions = ["mp4", "mov", "avi", "mkv", "wmv", "flv", "m4v", "3gp"]
raw_extensions = ["raw", "arw", "cr2", "cr3", "nef", "orf", "rw2", "dng", "raf", "srw", "pef"]
"#
        .to_string()
    }
}
