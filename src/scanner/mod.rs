//! Scanner module for directory traversal and content fingerprinting.
//!
//! This module provides functionality for:
//! - Sequential, sorted directory walking using walkdir
//! - Name and regex based pruning of ignored entries
//! - Bucketing regular files by exact byte size
//! - Tiered content fingerprinting (XXH3-128, BLAKE3 for large files)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and size bucketing
//! - [`hasher`]: Streaming content fingerprints
//! - [`pool`]: Reusable scratch buffers shared by hashing and comparison
//!
//! # Example
//!
//! ```no_run
//! use dupewalk::scanner::{scan, ScanConfig};
//! use std::path::Path;
//!
//! let config = ScanConfig::new(["node_modules", ".git"], Some(r"\.tmp$")).unwrap();
//! let buckets = scan(Path::new("."), &config).unwrap();
//! for bucket in buckets.into_candidates() {
//!     println!("{} bytes: {} files", bucket.size, bucket.paths.len());
//! }
//! ```

pub mod hasher;
pub mod pool;
pub mod walker;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use regex::Regex;

// Re-export main types
pub use hasher::{Fingerprint, Fingerprinter, HashAlgorithm, DEFAULT_STRONG_HASH_THRESHOLD};
pub use pool::{BufferPool, Pool, Pooled, DEFAULT_BUFFER_SIZE};
pub use walker::{scan, Walker};

/// A regular file discovered during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileEntry {
    /// Create a new FileEntry.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }
}

/// Ignore rules applied while walking.
///
/// An entry is ignored when its base name is listed in `ignore_names` or
/// its full path matches `ignore_regex`. Ignored directories are pruned,
/// so nothing beneath them is visited.
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Exact base names to skip (e.g. `.git`, `node_modules`)
    pub ignore_names: HashSet<String>,
    /// Pattern matched against the full path of every entry
    pub ignore_regex: Option<Regex>,
}

impl ScanConfig {
    /// Build a configuration, compiling the ignore pattern.
    ///
    /// Blank names are dropped, so `--ignore-names ""` ignores nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidPattern`] if `ignore_regex` does not compile.
    pub fn new<I, S>(ignore_names: I, ignore_regex: Option<&str>) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ignore_names = ignore_names
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| !name.trim().is_empty())
            .collect();

        let ignore_regex = match ignore_regex {
            Some(pattern) if !pattern.is_empty() => {
                Some(Regex::new(pattern).map_err(|e| ScanError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?)
            }
            _ => None,
        };

        Ok(Self {
            ignore_names,
            ignore_regex,
        })
    }

    /// Whether `path` is excluded by the ignore rules.
    #[must_use]
    pub fn is_ignored(&self, path: &Path) -> bool {
        let name_hit = path
            .file_name()
            .is_some_and(|n| self.ignore_names.contains(n.to_string_lossy().as_ref()));
        if name_hit {
            return true;
        }

        self.ignore_regex
            .as_ref()
            .is_some_and(|re| re.is_match(&path.to_string_lossy()))
    }
}

/// Files of one exact size, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeBucket {
    /// Shared size of every member
    pub size: u64,
    /// Member paths
    pub paths: Vec<PathBuf>,
}

impl SizeBucket {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the bucket has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Result of a scan: every regular file grouped by exact size.
#[derive(Debug, Clone, Default)]
pub struct SizeBuckets {
    buckets: HashMap<u64, Vec<PathBuf>>,
    total_files: usize,
    total_bytes: u64,
}

impl SizeBuckets {
    /// Create an empty bucket map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the bucket for its size.
    pub fn insert(&mut self, entry: FileEntry) {
        self.total_files += 1;
        self.total_bytes = self.total_bytes.saturating_add(entry.size);
        self.buckets.entry(entry.size).or_default().push(entry.path);
    }

    /// Members of the bucket for `size`, if any file had that size.
    #[must_use]
    pub fn get(&self, size: u64) -> Option<&[PathBuf]> {
        self.buckets.get(&size).map(Vec::as_slice)
    }

    /// Number of distinct sizes seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no files were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of files bucketed.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Sum of all file sizes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Number of buckets that hold at least two files.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.buckets.values().filter(|p| p.len() >= 2).count()
    }

    /// Consume the map, keeping only buckets with two or more members.
    ///
    /// Buckets are ordered largest size first.
    #[must_use]
    pub fn into_candidates(self) -> Vec<SizeBucket> {
        let mut candidates: Vec<SizeBucket> = self
            .buckets
            .into_iter()
            .filter(|(_, paths)| paths.len() >= 2)
            .map(|(size, paths)| SizeBucket { size, paths })
            .collect();
        candidates.sort_unstable_by(|a, b| b.size.cmp(&a.size));
        candidates
    }
}

/// Errors that can occur during directory scanning.
///
/// Every variant is fatal: a scan either completes or yields no buckets.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The ignore pattern failed to compile.
    #[error("Invalid ignore pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern as given
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// Shutdown was requested mid-walk.
    #[error("Scan interrupted")]
    Interrupted,

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while fingerprinting a single file.
#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The owning bucket was cancelled before the read finished.
    #[error("Fingerprinting cancelled: {0}")]
    Cancelled(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl FingerprintError {
    /// Classify an I/O error raised for `path`.
    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// The file the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Cancelled(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
