use dupewalk::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use dupewalk::scanner::ScanError;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_vanished_file_skips_only_its_bucket() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a1.txt"), b"short").unwrap();
    fs::write(dir.path().join("a2.txt"), b"short").unwrap();
    fs::write(dir.path().join("b1.txt"), b"a much longer body").unwrap();
    fs::write(dir.path().join("b2.txt"), b"a much longer body").unwrap();

    let finder = DuplicateFinder::with_defaults();
    let buckets = finder.scan(dir.path()).unwrap();
    assert_eq!(buckets.candidate_count(), 2);

    // Gone between the walk and fingerprinting.
    fs::remove_file(dir.path().join("a2.txt")).unwrap();

    let mut stream = finder.spawn(buckets).unwrap();
    let groups: Vec<_> = stream.by_ref().collect();
    let summary = stream.finish();

    assert_eq!(groups.len(), 1);
    assert!(groups[0].files.iter().all(|p| p
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with('b')));
    assert_eq!(summary.buckets_total, 2);
    assert_eq!(summary.buckets_failed, 1);
    assert_eq!(summary.buckets_processed, 1);
    assert!(summary.had_errors());
    assert!(!summary.interrupted);
}

#[test]
fn test_every_bucket_failing_still_completes() {
    let dir = TempDir::new().unwrap();
    for name in ["x1", "x2", "y1", "y2"] {
        let body = if name.starts_with('x') { "xx" } else { "yyy" };
        fs::write(dir.path().join(name), body).unwrap();
    }

    let finder = DuplicateFinder::with_defaults();
    let buckets = finder.scan(dir.path()).unwrap();
    for name in ["x1", "y1"] {
        fs::remove_file(dir.path().join(name)).unwrap();
    }

    let mut stream = finder.spawn(buckets).unwrap();
    assert!(stream.next().is_none());
    let summary = stream.finish();
    assert_eq!(summary.buckets_failed, 2);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    let err = DuplicateFinder::with_defaults()
        .find_duplicates(&missing)
        .unwrap_err();
    assert!(matches!(err, FinderError::Scan(ScanError::NotFound(_))));
}

#[test]
fn test_file_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("plain.txt");
    fs::write(&file, b"data").unwrap();

    let err = DuplicateFinder::with_defaults().start(&file).unwrap_err();
    assert!(matches!(err, FinderError::Scan(ScanError::NotADirectory(_))));
}

#[test]
fn test_shutdown_before_walk_interrupts() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a"), b"1").unwrap();
    fs::write(dir.path().join("b"), b"1").unwrap();

    let flag = Arc::new(AtomicBool::new(true));
    let finder = DuplicateFinder::new(FinderConfig::default().with_shutdown_flag(flag));
    let err = finder.find_duplicates(dir.path()).unwrap_err();
    assert!(matches!(err, FinderError::Interrupted));
}

#[test]
fn test_shutdown_after_walk_cancels_buckets() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a"), b"1").unwrap();
    fs::write(dir.path().join("b"), b"1").unwrap();

    let flag = Arc::new(AtomicBool::new(false));
    let finder = DuplicateFinder::new(FinderConfig::default().with_shutdown_flag(Arc::clone(&flag)));
    let buckets = finder.scan(dir.path()).unwrap();
    flag.store(true, Ordering::SeqCst);

    let mut stream = finder.spawn(buckets).unwrap();
    assert!(stream.next().is_none());
    let summary = stream.finish();
    assert!(summary.interrupted);
    assert_eq!(summary.buckets_processed, 0);
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_is_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), b"twin").unwrap();
    fs::write(dir.path().join("b.txt"), b"twin").unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("inner.txt"), b"twin").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users (root) can still read the directory.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let finder = DuplicateFinder::with_defaults();
    let scanned = finder.scan(dir.path());
    let walked = dupewalk::scanner::scan(dir.path(), &dupewalk::scanner::ScanConfig::default());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    match scanned {
        Err(FinderError::Scan(ScanError::PermissionDenied(path))) => assert!(path.ends_with("locked")),
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(buckets) => panic!("expected failure, got {} files", buckets.total_files()),
    }
    assert!(matches!(walked, Err(ScanError::PermissionDenied(_))));
}
