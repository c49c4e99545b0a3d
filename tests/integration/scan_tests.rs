use dupewalk::duplicates::{CompareError, DuplicateFinder, DuplicateGroup, FinderConfig, Partitioner};
use dupewalk::scanner::ScanConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn file_names(group: &DuplicateGroup) -> Vec<String> {
    let mut names: Vec<String> = group
        .files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn sorted_groups(groups: &[DuplicateGroup]) -> Vec<Vec<String>> {
    let mut all: Vec<Vec<String>> = groups.iter().map(file_names).collect();
    all.sort();
    all
}

#[test]
fn test_same_size_bucket_splits_into_two_groups() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "text1.txt", b"hello text1");
    write(dir.path(), "text2.txt", b"hello text1");
    write(dir.path(), "text3.txt", b"hello text3");
    write(dir.path(), "text4.txt", b"hello text3");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(
        sorted_groups(&groups),
        vec![
            vec!["text1.txt".to_string(), "text2.txt".to_string()],
            vec!["text3.txt".to_string(), "text4.txt".to_string()],
        ]
    );
    assert_eq!(summary.total_files, 4);
    assert_eq!(summary.buckets_total, 1);
    assert_eq!(summary.duplicate_groups, 2);
    assert_eq!(summary.duplicate_files, 2);
    assert_eq!(summary.reclaimable_space, 22);
    assert!(!summary.had_errors());
}

#[test]
fn test_empty_files_are_grouped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "f3.txt", b"");
    write(dir.path(), "f4.txt", b"");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 0);
    assert_eq!(file_names(&groups[0]), vec!["f3.txt", "f4.txt"]);
    assert_eq!(summary.reclaimable_space, 0);
}

#[test]
fn test_same_length_different_bytes_not_grouped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "f5.txt", b"HELLO FILE!");
    write(dir.path(), "f6.txt", b"hello file!");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.buckets_total, 1);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_compare_with_missing_path_is_error() {
    let dir = TempDir::new().unwrap();
    let present = write(dir.path(), "present.txt", b"content");
    let missing = dir.path().join("missing.txt");

    let err = Partitioner::default()
        .files_equal(&present, &missing)
        .unwrap_err();
    assert!(matches!(err, CompareError::Open { .. }));
    assert_eq!(err.path(), Some(missing.as_path()));
}

#[test]
fn test_nested_directories_and_unique_sizes() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/one.bin", b"duplicate payload");
    write(dir.path(), "b/c/two.bin", b"duplicate payload");
    write(dir.path(), "unique.bin", b"no partner here at all");
    write(dir.path(), "short", b"x");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(file_names(&groups[0]), vec!["one.bin", "two.bin"]);
    assert_eq!(summary.total_files, 4);
    assert_eq!(summary.buckets_total, 1);
}

#[test]
fn test_rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    for i in 0..5 {
        write(dir.path(), &format!("copy{i}.dat"), b"abcdefgh");
    }
    write(dir.path(), "other1.dat", b"12345678");
    write(dir.path(), "other2.dat", b"12345678");

    let finder = DuplicateFinder::with_defaults();
    let (first, _) = finder.find_duplicates(dir.path()).unwrap();
    let (second, _) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(sorted_groups(&first), sorted_groups(&second));
    assert_eq!(first.len(), 2);
}

#[test]
fn test_worker_and_bucket_limits_do_not_change_result() {
    let dir = TempDir::new().unwrap();
    for size in 1..8usize {
        let content = vec![b'a' + size as u8; size * 10];
        write(dir.path(), &format!("x{size}"), &content);
        write(dir.path(), &format!("y{size}"), &content);
    }

    let narrow = DuplicateFinder::new(FinderConfig::default().with_workers(1).with_max_buckets(1));
    let wide = DuplicateFinder::new(FinderConfig::default().with_workers(8).with_max_buckets(8));

    let (a, _) = narrow.find_duplicates(dir.path()).unwrap();
    let (b, _) = wide.find_duplicates(dir.path()).unwrap();
    assert_eq!(a.len(), 7);
    assert_eq!(sorted_groups(&a), sorted_groups(&b));
}

#[test]
fn test_uniform_hashing_matches_tiered() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "big1", &vec![7u8; 64 * 1024]);
    write(dir.path(), "big2", &vec![7u8; 64 * 1024]);
    write(dir.path(), "big3", &vec![8u8; 64 * 1024]);

    // A tiny threshold forces the strong hash for every file.
    let tiered = DuplicateFinder::new(FinderConfig::default().with_strong_hash_threshold(Some(1)));
    let uniform = DuplicateFinder::new(FinderConfig::default().with_strong_hash_threshold(None));

    let (a, _) = tiered.find_duplicates(dir.path()).unwrap();
    let (b, _) = uniform.find_duplicates(dir.path()).unwrap();
    assert_eq!(sorted_groups(&a), vec![vec!["big1", "big2"]]);
    assert_eq!(sorted_groups(&a), sorted_groups(&b));
    assert_ne!(a[0].fingerprint, b[0].fingerprint);
}

#[test]
fn test_scan_config_ignores_are_applied() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "keep1.txt", b"same");
    write(dir.path(), "keep2.txt", b"same");
    write(dir.path(), "node_modules/dep.txt", b"same");
    write(dir.path(), "scratch.tmp", b"same");

    let scan_config = ScanConfig::new(["node_modules"], Some(r"\.tmp$")).unwrap();
    let finder = DuplicateFinder::new(FinderConfig::default().with_scan_config(scan_config));
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(sorted_groups(&groups), vec![vec!["keep1.txt", "keep2.txt"]]);
}
