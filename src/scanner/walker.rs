//! Directory walker built on walkdir.
//!
//! # Overview
//!
//! [`Walker`] visits a tree sequentially, entries within each directory
//! sorted by file name, and yields every regular file that survives the
//! ignore rules in [`ScanConfig`]. [`scan`] drives a walker to completion and
//! buckets the files by size.
//!
//! # Behavior
//!
//! - Ignored directories are pruned, never descended
//! - Symbolic links are never followed, bucketed or reported
//! - Sockets, FIFOs and devices are skipped
//! - Zero-length files are kept; they form a bucket like any other size
//! - Any traversal error aborts the scan
//!
//! # Example
//!
//! ```no_run
//! use dupewalk::scanner::{ScanConfig, Walker};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), ScanConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::{FileEntry, ScanConfig, ScanError, SizeBuckets};

/// Sequential directory walker.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Ignore rules
    config: ScanConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: ScanConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag. Once set to `true` the walk yields
    /// [`ScanError::Interrupted`] and stops.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Validate the root and make it absolute.
    fn resolve_root(&self) -> Result<PathBuf, ScanError> {
        let metadata = std::fs::metadata(&self.root)
            .map_err(|e| Self::map_io_error(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        std::path::absolute(&self.root).map_err(|e| Self::map_io_error(&self.root, e))
    }

    /// Walk the tree, yielding regular files.
    ///
    /// The iterator yields at most one error; callers that want the
    /// all-or-nothing behavior should use [`Walker::scan`].
    pub fn walk(&self) -> Box<dyn Iterator<Item = Result<FileEntry, ScanError>> + '_> {
        let root = match self.resolve_root() {
            Ok(root) => root,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };

        let config = &self.config;
        let entries = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                let ignored = config.is_ignored(entry.path());
                if ignored {
                    log::trace!("Ignoring: {}", entry.path().display());
                }
                !ignored
            });

        let mut failed = false;
        Box::new(entries.filter_map(move |entry_result| {
            if failed {
                return None;
            }
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                failed = true;
                return Some(Err(ScanError::Interrupted));
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    failed = true;
                    return Some(Err(Self::map_walk_error(&root, e)));
                }
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                log::trace!("Skipping symlink: {}", entry.path().display());
                return None;
            }
            if !file_type.is_file() {
                return None;
            }

            match entry.metadata() {
                Ok(metadata) => Some(Ok(FileEntry::new(entry.into_path(), metadata.len()))),
                Err(e) => {
                    failed = true;
                    Some(Err(Self::map_walk_error(&root, e)))
                }
            }
        }))
    }

    /// Walk the whole tree and bucket files by size.
    ///
    /// # Errors
    ///
    /// The first traversal error aborts the scan; no partial buckets are
    /// returned.
    pub fn scan(&self) -> Result<SizeBuckets, ScanError> {
        let mut buckets = SizeBuckets::new();
        for entry in self.walk() {
            buckets.insert(entry?);
        }
        log::debug!(
            "Scanned {} files in {} size buckets under {}",
            buckets.total_files(),
            buckets.len(),
            self.root.display()
        );
        Ok(buckets)
    }

    fn map_io_error(path: &Path, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            ErrorKind::NotFound => {
                log::debug!("Path not found: {}", path.display());
                ScanError::NotFound(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                }
            }
        }
    }

    fn map_walk_error(root: &Path, error: walkdir::Error) -> ScanError {
        let path = error.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
        match error.into_io_error() {
            Some(io) => Self::map_io_error(&path, io),
            None => {
                log::warn!("Walker error for {}", path.display());
                ScanError::Io {
                    path,
                    source: std::io::Error::other("filesystem loop detected"),
                }
            }
        }
    }
}

/// Scan `root` with `config`, returning files bucketed by size.
///
/// # Errors
///
/// Returns [`ScanError`] if the root is invalid or any directory cannot be
/// read.
pub fn scan(root: &Path, config: &ScanConfig) -> Result<SizeBuckets, ScanError> {
    Walker::new(root, config.clone()).scan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    /// Create a test directory with some files.
    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();

        let mut f = File::create(dir.path().join("file1.txt")).unwrap();
        writeln!(f, "Hello, world!").unwrap();

        let mut f = File::create(dir.path().join("file2.txt")).unwrap();
        writeln!(f, "Another file").unwrap();

        let subdir = dir.path().join("subdir");
        fs::create_dir(&subdir).unwrap();
        let mut f = File::create(subdir.join("nested.txt")).unwrap();
        writeln!(f, "Nested file content").unwrap();

        dir
    }

    fn walk_paths(walker: &Walker) -> Vec<PathBuf> {
        walker
            .walk()
            .filter_map(Result::ok)
            .map(|f| f.path)
            .collect()
    }

    #[test]
    fn test_walker_finds_files() {
        let dir = create_test_dir();
        let walker = Walker::new(dir.path(), ScanConfig::default());

        let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
        assert_eq!(files.len(), 3);
        for file in &files {
            assert!(file.size > 0);
            assert!(file.path.is_absolute());
        }
    }

    #[test]
    fn test_walker_sorted_order() {
        let dir = create_test_dir();
        let walker = Walker::new(dir.path(), ScanConfig::default());
        let names: Vec<String> = walk_paths(&walker)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["file1.txt", "file2.txt", "nested.txt"]);
    }

    #[test]
    fn test_walker_keeps_empty_files() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("empty")).unwrap();

        let walker = Walker::new(dir.path(), ScanConfig::default());
        let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 0);
    }

    #[test]
    fn test_walker_prunes_ignored_directory() {
        let dir = create_test_dir();
        let config = ScanConfig::new(["subdir"], None).unwrap();
        let walker = Walker::new(dir.path(), config);

        let paths = walk_paths(&walker);
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| !p.to_string_lossy().contains("subdir")));
    }

    #[test]
    fn test_walker_ignore_regex() {
        let dir = create_test_dir();
        let config = ScanConfig::new(Vec::<String>::new(), Some(r"file\d\.txt$")).unwrap();
        let walker = Walker::new(dir.path(), config);

        let paths = walk_paths(&walker);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("subdir/nested.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_walker_skips_symlinks() {
        let dir = create_test_dir();
        std::os::unix::fs::symlink(
            dir.path().join("file1.txt"),
            dir.path().join("link_to_file1"),
        )
        .unwrap();
        std::os::unix::fs::symlink(dir.path().join("subdir"), dir.path().join("link_dir")).unwrap();

        let walker = Walker::new(dir.path(), ScanConfig::default());
        let paths = walk_paths(&walker);
        assert_eq!(paths.len(), 3);
        assert!(paths.iter().all(|p| !p.to_string_lossy().contains("link")));
    }

    #[test]
    fn test_walker_shutdown_flag() {
        let dir = create_test_dir();
        let flag = Arc::new(AtomicBool::new(true));
        let walker = Walker::new(dir.path(), ScanConfig::default()).with_shutdown_flag(flag);

        let result = walker.scan();
        assert!(matches!(result, Err(ScanError::Interrupted)));
    }

    #[test]
    fn test_walker_handles_nonexistent_path() {
        let walker = Walker::new(Path::new("/nonexistent/path/12345"), ScanConfig::default());
        let result = walker.scan();
        assert!(matches!(result, Err(ScanError::NotFound(_))));
    }

    #[test]
    fn test_walker_rejects_file_root() {
        let dir = create_test_dir();
        let result = scan(&dir.path().join("file1.txt"), &ScanConfig::default());
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn test_scan_buckets_by_size() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), b"same").unwrap();
        fs::write(dir.path().join("b"), b"diff").unwrap();
        fs::write(dir.path().join("c"), b"longer").unwrap();

        let buckets = scan(dir.path(), &ScanConfig::default()).unwrap();
        assert_eq!(buckets.total_files(), 3);
        assert_eq!(buckets.get(4).map(<[PathBuf]>::len), Some(2));
        assert_eq!(buckets.get(6).map(<[PathBuf]>::len), Some(1));
        assert_eq!(buckets.candidate_count(), 1);
    }
}
