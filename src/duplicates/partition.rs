//! Byte-exact verification of fingerprint matches.
//!
//! # Overview
//!
//! Equal fingerprints only suggest equal content. The [`Partitioner`] turns
//! a [`CandidateSet`] into verified [`DuplicateGroup`]s by partition
//! refinement: each file is compared against the first member of every
//! cluster formed so far, joins the first cluster it matches, or starts a
//! new one. Clusters with fewer than two members are dropped.
//!
//! Comparison streams both files through pooled buffers in matched chunks
//! and stops at the first differing chunk. An I/O failure is a
//! [`CompareError`], never "equal" or "not equal".
//!
//! # Example
//!
//! ```no_run
//! use dupewalk::duplicates::Partitioner;
//! use dupewalk::scanner::BufferPool;
//! use std::path::Path;
//!
//! let partitioner = Partitioner::new(BufferPool::default());
//! let same = partitioner.files_equal(Path::new("a.bin"), Path::new("b.bin")).unwrap();
//! println!("identical: {}", same);
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use super::groups::{CandidateSet, DuplicateGroup};
use crate::scanner::BufferPool;
use crate::signal::CancelToken;

/// Failure while verifying content equality.
#[derive(thiserror::Error, Debug)]
pub enum CompareError {
    /// A file could not be opened.
    #[error("Failed to open {path}: {source}")]
    Open {
        /// File that failed to open
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A read failed partway through.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that failed to read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled during verification.
    #[error("Comparison cancelled")]
    Cancelled,
}

impl CompareError {
    /// The file the error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Open { path, .. } | Self::Read { path, .. } => Some(path),
            Self::Cancelled => None,
        }
    }
}

/// Fill `buf` from `file`, stopping early only at end of file.
fn read_full(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn open(path: &Path) -> Result<File, CompareError> {
    File::open(path).map_err(|source| CompareError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Verifies candidate sets byte by byte.
#[derive(Debug, Clone, Default)]
pub struct Partitioner {
    buffers: BufferPool,
}

impl Partitioner {
    /// Create a partitioner drawing buffers from `buffers`.
    #[must_use]
    pub fn new(buffers: BufferPool) -> Self {
        Self { buffers }
    }

    /// Whether `a` and `b` have identical content.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError`] if either file cannot be opened or read.
    pub fn files_equal(&self, a: &Path, b: &Path) -> Result<bool, CompareError> {
        let mut fa = open(a)?;
        let mut fb = open(b)?;
        let mut buf_a = self.buffers.acquire();
        let mut buf_b = self.buffers.acquire();

        loop {
            let na = read_full(&mut fa, &mut buf_a).map_err(|source| CompareError::Read {
                path: a.to_path_buf(),
                source,
            })?;
            let nb = read_full(&mut fb, &mut buf_b).map_err(|source| CompareError::Read {
                path: b.to_path_buf(),
                source,
            })?;

            if na != nb || buf_a[..na] != buf_b[..nb] {
                return Ok(false);
            }
            if na < buf_a.len() {
                return Ok(true);
            }
        }
    }

    /// Split `paths` into clusters of identical content.
    ///
    /// Only clusters of two or more are returned. Member order within a
    /// cluster follows input order.
    ///
    /// # Errors
    ///
    /// The first [`CompareError`] fails the whole call.
    pub fn partition_paths(&self, paths: &[PathBuf]) -> Result<Vec<Vec<PathBuf>>, CompareError> {
        self.partition_paths_cancellable(paths, &CancelToken::new())
    }

    /// Like [`partition_paths`](Self::partition_paths), checking `cancel`
    /// before each comparison.
    pub fn partition_paths_cancellable(
        &self,
        paths: &[PathBuf],
        cancel: &CancelToken,
    ) -> Result<Vec<Vec<PathBuf>>, CompareError> {
        let mut clusters: Vec<Vec<PathBuf>> = Vec::new();

        'candidates: for path in paths {
            for cluster in &mut clusters {
                if cancel.is_cancelled() {
                    return Err(CompareError::Cancelled);
                }
                if self.files_equal(&cluster[0], path)? {
                    cluster.push(path.clone());
                    continue 'candidates;
                }
            }
            clusters.push(vec![path.clone()]);
        }

        clusters.retain(|c| c.len() >= 2);
        Ok(clusters)
    }

    /// Verify a candidate set, producing zero or more duplicate groups.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError`] if any comparison fails; the set yields no
    /// groups in that case.
    pub fn partition(&self, set: &CandidateSet) -> Result<Vec<DuplicateGroup>, CompareError> {
        self.partition_cancellable(set, &CancelToken::new())
    }

    /// Cancellable form of [`partition`](Self::partition).
    pub fn partition_cancellable(
        &self,
        set: &CandidateSet,
        cancel: &CancelToken,
    ) -> Result<Vec<DuplicateGroup>, CompareError> {
        let clusters = self.partition_paths_cancellable(&set.paths, cancel)?;
        if clusters.len() > 1 {
            log::debug!(
                "Fingerprint {} split into {} groups",
                set.fingerprint,
                clusters.len()
            );
        }
        Ok(clusters
            .into_iter()
            .map(|files| DuplicateGroup::new(set.size, set.fingerprint.clone(), files))
            .collect())
    }
}
