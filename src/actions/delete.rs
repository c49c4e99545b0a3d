//! Confirmed file deletion.
//!
//! # Overview
//!
//! Deletion is the only operation that changes the filesystem. Files are
//! removed permanently by default, or moved to the system trash when
//! [`DeleteConfig::trash`] is used. A batch attempts every file
//! independently: one failure never stops the rest, and nothing is rolled
//! back.
//!
//! # Example
//!
//! ```no_run
//! use dupewalk::actions::delete::{delete_batch, DeleteConfig};
//! use std::path::PathBuf;
//!
//! let paths = vec![PathBuf::from("/tmp/copy1.txt"), PathBuf::from("/tmp/copy2.txt")];
//! let result = delete_batch(&paths, &DeleteConfig::trash());
//! println!("{}", result.summary());
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path no longer refers to a regular file.
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// File that could not be trashed
        path: PathBuf,
        /// Message from the trash backend
        message: String,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File being deleted
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// The path this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::NotAFile(p)
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// Result of a successful deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the deleted file in bytes.
    pub size: u64,
    /// Whether deletion was permanent (true) or to trash (false).
    pub permanent: bool,
}

/// Outcome of a batch deletion.
#[derive(Debug, Clone, Default)]
pub struct BatchDeleteResult {
    /// Successfully deleted files.
    pub successes: Vec<DeleteResult>,
    /// Failed deletions with their error messages.
    pub failures: Vec<(PathBuf, String)>,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl BatchDeleteResult {
    /// Number of successful deletions.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed deletions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if all deletions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Paths that were actually removed.
    pub fn deleted_paths(&self) -> impl Iterator<Item = &Path> {
        self.successes.iter().map(|r| r.path.as_path())
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let freed = bytesize::ByteSize::b(self.bytes_freed);
        if self.all_succeeded() {
            format!("Deleted {} file(s), freed {}", self.success_count(), freed)
        } else {
            format!(
                "Deleted {} file(s), {} failed, freed {}",
                self.success_count(),
                self.failure_count(),
                freed
            )
        }
    }
}

/// Configuration for deletion operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteConfig {
    /// Move files to the system trash instead of removing them.
    pub use_trash: bool,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self::permanent()
    }
}

impl DeleteConfig {
    /// Remove files permanently.
    #[must_use]
    pub fn permanent() -> Self {
        Self { use_trash: false }
    }

    /// Move files to the system trash.
    #[must_use]
    pub fn trash() -> Self {
        Self { use_trash: true }
    }
}

/// Size of `path`, failing unless it is still a regular file.
fn regular_file_size(path: &Path) -> Result<u64, DeleteError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(DeleteError::NotAFile(path.to_path_buf()));
    }
    Ok(metadata.len())
}

/// Move a single file to the system trash.
///
/// # Errors
///
/// `NotFound`, `PermissionDenied` or `NotAFile` if the path cannot be
/// stat'ed as a regular file; `TrashFailed` if the trash backend refuses.
pub fn delete_to_trash(path: &Path) -> Result<DeleteResult, DeleteError> {
    let size = regular_file_size(path)?;

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        DeleteError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        permanent: false,
    })
}

/// Permanently remove a single file. This cannot be undone.
///
/// # Errors
///
/// Returns a [`DeleteError`] describing why the file could not be removed.
pub fn permanent_delete(path: &Path) -> Result<DeleteResult, DeleteError> {
    let size = regular_file_size(path)?;
    fs::remove_file(path).map_err(|e| DeleteError::from_io(path, e))?;

    log::info!("Deleted: {} ({} bytes)", path.display(), size);
    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        permanent: true,
    })
}

/// Delete one file according to `config`.
///
/// # Errors
///
/// See [`delete_to_trash`] and [`permanent_delete`].
pub fn delete_file(path: &Path, config: &DeleteConfig) -> Result<DeleteResult, DeleteError> {
    if config.use_trash {
        delete_to_trash(path)
    } else {
        permanent_delete(path)
    }
}

/// Delete every path, attempting each one independently.
#[must_use]
pub fn delete_batch(paths: &[PathBuf], config: &DeleteConfig) -> BatchDeleteResult {
    let mut result = BatchDeleteResult::default();

    for path in paths {
        match delete_file(path, config) {
            Ok(deleted) => {
                result.bytes_freed += deleted.size;
                result.successes.push(deleted);
            }
            Err(e) => {
                log::warn!("Failed to delete {}: {}", path.display(), e);
                result.failures.push((path.clone(), e.to_string()));
            }
        }
    }

    log::info!("{}", result.summary());
    result
}

/// Whether `selected` leaves at least one member of `group` untouched.
#[must_use]
pub fn preserves_copy(group: &[PathBuf], selected: &HashSet<PathBuf>) -> bool {
    group.iter().any(|p| !selected.contains(p))
}
