use dupewalk::duplicates::{DuplicateFinder, FinderConfig};
use dupewalk::scanner::{scan, ScanConfig, ScanError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_ignored_directory_is_pruned() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
    fs::write(dir.path().join(".git/objects/blob"), b"same").unwrap();
    fs::write(dir.path().join("tracked"), b"same").unwrap();

    let config = ScanConfig::new([".git"], None).unwrap();
    let buckets = scan(dir.path(), &config).unwrap();
    assert_eq!(buckets.total_files(), 1);
    assert_eq!(buckets.candidate_count(), 0);
}

#[test]
fn test_regex_matches_full_path() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("build/out")).unwrap();
    fs::write(dir.path().join("build/out/a.o"), b"obj").unwrap();
    fs::write(dir.path().join("a.c"), b"obj").unwrap();

    let config = ScanConfig::new(Vec::<String>::new(), Some("/build/")).unwrap();
    let buckets = scan(dir.path(), &config).unwrap();
    assert_eq!(buckets.total_files(), 1);
}

#[test]
fn test_invalid_regex_is_rejected() {
    let err = ScanConfig::new(Vec::<String>::new(), Some("(unclosed")).unwrap_err();
    assert!(matches!(err, ScanError::InvalidPattern { .. }));
}

#[test]
fn test_unicode_and_spaces_in_names() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("résumé final.txt"), b"same bytes").unwrap();
    fs::write(dir.path().join("日本語 copy.txt"), b"same bytes").unwrap();

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_bucket_paths_are_absolute() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("one"), b"twin").unwrap();
    fs::write(dir.path().join("two"), b"twin").unwrap();

    let buckets = scan(dir.path(), &ScanConfig::default()).unwrap();
    for bucket in buckets.into_candidates() {
        assert!(bucket.paths.iter().all(|p| p.is_absolute()));
    }
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_reported() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("target.txt");
    fs::write(&target, b"linked content").unwrap();
    std::os::unix::fs::symlink(&target, dir.path().join("link.txt")).unwrap();

    let (groups, summary) = DuplicateFinder::new(FinderConfig::default())
        .find_duplicates(dir.path())
        .unwrap();
    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 1);
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_not_descended() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("real")).unwrap();
    fs::write(dir.path().join("real/file"), b"data").unwrap();
    std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

    let buckets = scan(dir.path(), &ScanConfig::default()).unwrap();
    assert_eq!(buckets.total_files(), 1);
}

#[cfg(unix)]
#[test]
fn test_hard_links_are_reported_as_duplicates() {
    let dir = TempDir::new().unwrap();
    let original = dir.path().join("original");
    fs::write(&original, b"shared inode").unwrap();
    fs::hard_link(&original, dir.path().join("hardlink")).unwrap();

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(groups.len(), 1);
}
