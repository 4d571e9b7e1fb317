//! Error types for shuttersort

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shuttersort operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for shuttersort
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No fallback tier produced a timestamp. Only possible when even the
    /// filesystem modification time cannot be read.
    #[error("Could not resolve a capture date for {path}: {message}")]
    UnresolvedDate { path: PathBuf, message: String },

    /// A collaborator could not read the input file at all.
    #[error("Cannot read source file {path}: {message}")]
    UnreadableSource { path: PathBuf, message: String },

    /// The destination directory or file cannot be created or written.
    #[error("Cannot write destination {path}: {message}")]
    DestinationUnwritable { path: PathBuf, message: String },

    /// The bounded suffix-retry cap was hit while resolving a name
    /// collision. Fatal: this indicates a configuration or filesystem
    /// anomaly, not a normal collision.
    #[error("Exhausted {attempts} rename attempts for {path}")]
    CollisionRetryExhausted { path: PathBuf, attempts: u32 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error must abort the whole run rather than just the
    /// file it occurred on.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Error::CollisionRetryExhausted { .. } | Error::Config(_)
        )
    }
}
