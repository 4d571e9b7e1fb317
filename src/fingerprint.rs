//! Content fingerprinting for deduplication
//!
//! Streams the whole file through xxHash3 in fixed-size chunks, so memory
//! use is constant regardless of file size. Two files with equal
//! fingerprints are treated as identical content; the residual collision
//! risk of the 64-bit hash is accepted and never surfaced as an error.

use crate::error::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::trace;
use xxhash_rust::xxh3::Xxh3;

/// Read chunk size (64 KiB)
const CHUNK_SIZE: usize = 64 * 1024;

/// Content hash of a file's bytes, used as a proxy for byte equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Compute the content fingerprint of a file.
///
/// Read-only; deterministic for identical bytes.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint> {
    let mut file = File::open(path).map_err(|e| Error::UnreadableSource {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| Error::UnreadableSource {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hash = Fingerprint(hasher.digest());
    trace!(?path, %hash, "Computed content fingerprint");
    Ok(hash)
}

/// Fingerprint an in-memory buffer. Test helper and seeding shortcut for
/// callers that already hold the bytes.
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    Fingerprint(xxhash_rust::xxh3::xxh3_64(bytes))
}
