//! Streaming content fingerprints.
//!
//! # Overview
//!
//! A [`Fingerprint`] is a cheap pre-filter: files with different
//! fingerprints are certainly different, files with equal fingerprints
//! still go through byte comparison before being called duplicates.
//!
//! The algorithm is picked by file size:
//! - XXH3-128 for files up to the strong-hash threshold (default 20 MiB)
//! - BLAKE3 above it, where a collision costs a long comparison
//!
//! All members of a size bucket share one size and therefore one
//! algorithm, so fingerprints are only ever compared like with like.
//!
//! # Example
//!
//! ```no_run
//! use dupewalk::scanner::{BufferPool, Fingerprinter};
//! use std::path::Path;
//!
//! let fingerprinter = Fingerprinter::new(BufferPool::default());
//! let fp = fingerprinter.fingerprint(Path::new("photo.jpg")).unwrap();
//! println!("{}", fp);
//! ```

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use twox_hash::XxHash3_128;

use super::pool::BufferPool;
use super::FingerprintError;
use crate::signal::CancelToken;

/// Files larger than this use BLAKE3 (20 MiB).
pub const DEFAULT_STRONG_HASH_THRESHOLD: u64 = 20 * 1024 * 1024;

/// Hex-encoded content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(hex: String) -> Self {
        Self(hex)
    }
}

impl From<&str> for Fingerprint {
    fn from(hex: &str) -> Self {
        Self(hex.to_string())
    }
}

/// Digest algorithm chosen for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// 128-bit XXH3, non-cryptographic
    Xxh3_128,
    /// 256-bit BLAKE3
    Blake3,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xxh3_128 => write!(f, "xxh3-128"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

enum Digest {
    Xxh3(XxHash3_128),
    Blake3(Box<blake3::Hasher>),
}

impl Digest {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Xxh3_128 => Self::Xxh3(XxHash3_128::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            Self::Xxh3(h) => h.write(chunk),
            Self::Blake3(h) => {
                h.update(chunk);
            }
        }
    }

    fn finish(self) -> Fingerprint {
        match self {
            Self::Xxh3(h) => Fingerprint(format!("{:032x}", h.finish_128())),
            Self::Blake3(h) => Fingerprint(h.finalize().to_hex().to_string()),
        }
    }
}

/// Computes file fingerprints through pooled buffers.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    buffers: BufferPool,
    strong_threshold: Option<u64>,
}

impl Fingerprinter {
    /// Create a fingerprinter with the default 20 MiB strong-hash threshold.
    #[must_use]
    pub fn new(buffers: BufferPool) -> Self {
        Self {
            buffers,
            strong_threshold: Some(DEFAULT_STRONG_HASH_THRESHOLD),
        }
    }

    /// Set the size above which BLAKE3 is used. `None` means XXH3 always.
    #[must_use]
    pub fn with_strong_threshold(mut self, threshold: Option<u64>) -> Self {
        self.strong_threshold = threshold;
        self
    }

    /// The buffer pool shared with other readers.
    #[must_use]
    pub fn buffers(&self) -> &BufferPool {
        &self.buffers
    }

    /// Algorithm used for a file of `size` bytes.
    #[must_use]
    pub fn algorithm_for(&self, size: u64) -> HashAlgorithm {
        match self.strong_threshold {
            Some(threshold) if size > threshold => HashAlgorithm::Blake3,
            _ => HashAlgorithm::Xxh3_128,
        }
    }

    /// Fingerprint the full content of `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`FingerprintError`] naming `path` if it cannot be opened
    /// or read. No partial digest is produced.
    pub fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        self.fingerprint_cancellable(path, &CancelToken::new())
    }

    /// Like [`fingerprint`](Self::fingerprint), but checks `cancel` between
    /// chunks and gives up with [`FingerprintError::Cancelled`] once it fires.
    pub fn fingerprint_cancellable(
        &self,
        path: &Path,
        cancel: &CancelToken,
    ) -> Result<Fingerprint, FingerprintError> {
        let mut buffer = self.buffers.acquire();
        if cancel.is_cancelled() {
            return Err(FingerprintError::Cancelled(path.to_path_buf()));
        }

        let mut file = File::open(path).map_err(|e| FingerprintError::from_io(path, e))?;
        let size = file
            .metadata()
            .map_err(|e| FingerprintError::from_io(path, e))?
            .len();
        let algorithm = self.algorithm_for(size);
        log::trace!("Fingerprinting {} with {}", path.display(), algorithm);

        let mut digest = Digest::new(algorithm);

        loop {
            if cancel.is_cancelled() {
                return Err(FingerprintError::Cancelled(path.to_path_buf()));
            }
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(FingerprintError::from_io(path, e)),
            };
            digest.update(&buffer[..n]);
        }

        Ok(digest.finish())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(BufferPool::default())
    }
}
