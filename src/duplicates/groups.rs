//! Candidate sets and verified duplicate groups.
//!
//! # Overview
//!
//! Detection narrows files in stages:
//!
//! 1. [`SizeBucket`](crate::scanner::SizeBucket): same exact size
//! 2. [`CandidateSet`]: same size and same fingerprint
//! 3. [`DuplicateGroup`]: verified byte-identical
//!
//! Only a `DuplicateGroup` is ever reported as a duplicate. Fingerprints can
//! collide, so a candidate set may split into several groups or none.
//!
//! # Example
//!
//! ```
//! use dupewalk::duplicates::DuplicateGroup;
//! use std::path::PathBuf;
//!
//! let group = DuplicateGroup::new(
//!     1024,
//!     "00ff".into(),
//!     vec![PathBuf::from("/a.txt"), PathBuf::from("/b.txt"), PathBuf::from("/c.txt")],
//! );
//! assert_eq!(group.len(), 3);
//! assert_eq!(group.wasted_space(), 2048);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scanner::Fingerprint;

/// Files within one size bucket that share a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    /// Shared fingerprint
    pub fingerprint: Fingerprint,
    /// Shared size in bytes
    pub size: u64,
    /// Members in bucket order
    pub paths: Vec<PathBuf>,
}

impl CandidateSet {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Two or more files verified to have identical content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// File size in bytes, shared by every member
    pub size: u64,
    /// Content fingerprint, shared by every member
    pub fingerprint: Fingerprint,
    /// Member paths in discovery order
    pub files: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Create a group.
    #[must_use]
    pub fn new(size: u64, fingerprint: Fingerprint, files: Vec<PathBuf>) -> Self {
        Self {
            size,
            fingerprint,
            files,
        }
    }

    /// Number of files in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// A group stays meaningful only while it holds two or more files.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.files.len() >= 2
    }

    /// Whether `path` is a member.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f == path)
    }

    /// Bytes reclaimable by keeping a single copy.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size
            .saturating_mul((self.files.len() as u64).saturating_sub(1))
    }

    /// Remove `path` from the group, returning whether it was a member.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f != path);
        self.files.len() != before
    }
}

impl fmt::Display for DuplicateGroup {
    /// Renders as `[/a/x, /a/y]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, path) in self.files.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", path.display())?;
        }
        write!(f, "]")
    }
}
