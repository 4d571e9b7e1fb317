//! CLI argument parsing with clap

use crate::config::{
    Config, DirSegment, FileOperation, FilenamePattern, UnknownDatePolicy,
};
use clap::Parser;
use std::path::PathBuf;

/// shuttersort - organize photos and videos into a date-keyed tree
///
/// Determines each file's capture date from metadata tags, filename
/// patterns, or the file modification time, places it under a normalized
/// directory layout, and skips content that is already in the output tree.
#[derive(Parser, Debug)]
#[command(name = "shuttersort")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Input directories to scan for media files
    #[arg(short, long, num_args = 1..)]
    pub input: Option<Vec<PathBuf>>,

    /// Output root for the organized tree
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Metadata tags tried in order for date resolution
    #[arg(long, num_args = 1..)]
    pub date_tag: Option<Vec<String>>,

    /// Filename date patterns tried in order
    #[arg(long, num_args = 1.., value_enum)]
    pub pattern: Option<Vec<FilenamePattern>>,

    /// Destination directory layout, outermost segment first
    #[arg(short = 'l', long, num_args = 1.., value_enum)]
    pub layout: Option<Vec<DirSegment>>,

    /// Keep original basenames instead of date-derived names
    #[arg(long)]
    pub original_filenames: bool,

    /// What to do with files that have no resolvable date
    #[arg(long, value_enum)]
    pub unknown_date: Option<UnknownDatePolicy>,

    /// Sentinel directory name for unknown-date files
    #[arg(long)]
    pub sentinel_dir: Option<String>,

    /// File operation mode
    #[arg(short = 'O', long, value_enum)]
    pub operation: Option<FileOperation>,

    /// Disable content deduplication
    #[arg(long)]
    pub no_deduplicate: bool,

    /// Do not carry .xmp sidecars along
    #[arg(long)]
    pub no_sidecars: bool,

    /// Treat any per-file failure as run-fatal
    #[arg(long)]
    pub strict: bool,

    /// Number of worker threads (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Dry run mode - show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub sample_config: bool,
}

impl Cli {
    /// Merge CLI arguments over a config. CLI arguments take precedence.
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref inputs) = self.input {
            config.input_dirs = inputs.clone();
        }
        if let Some(ref output) = self.output {
            config.output_dir = output.clone();
        }
        if let Some(ref tags) = self.date_tag {
            config.date_tags = tags.clone();
        }
        if let Some(ref patterns) = self.pattern {
            config.filename_patterns = patterns.clone();
        }
        if let Some(ref layout) = self.layout {
            config.dir_layout = layout.clone();
        }
        if self.original_filenames {
            config.original_filenames = true;
        }
        if let Some(policy) = self.unknown_date {
            config.unknown_date = policy;
        }
        if let Some(ref sentinel) = self.sentinel_dir {
            config.sentinel_dir = sentinel.clone();
        }
        if let Some(operation) = self.operation {
            config.operation = operation;
        }
        if self.no_deduplicate {
            config.deduplicate = false;
        }
        if self.no_sidecars {
            config.sidecars = false;
        }
        if self.strict {
            config.strict = true;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Build a Config from CLI arguments alone.
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
