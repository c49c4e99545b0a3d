use dupewalk::duplicates::{DuplicateFinder, FinderConfig};
use dupewalk::output::{write_stream, JsonLinesOutput, TextOutput};
use dupewalk::progress::{ProgressCounters, PHASE_FINGERPRINTING};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn populate(dir: &TempDir, groups: usize) {
    for g in 0..groups {
        let body = vec![b'a' + g as u8; 100 + g];
        fs::write(dir.path().join(format!("g{g}_a")), &body).unwrap();
        fs::write(dir.path().join(format!("g{g}_b")), &body).unwrap();
    }
}

#[test]
fn test_stream_yields_every_group_then_summary() {
    let dir = TempDir::new().unwrap();
    populate(&dir, 5);

    let mut stream = DuplicateFinder::with_defaults().start(dir.path()).unwrap();
    let mut seen = 0;
    for group in stream.by_ref() {
        assert!(group.is_duplicate());
        seen += 1;
    }
    let summary = stream.finish();

    assert_eq!(seen, 5);
    assert_eq!(summary.duplicate_groups, 5);
    assert_eq!(summary.buckets_processed, 5);
    assert!(!summary.interrupted);
}

#[test]
fn test_dropping_stream_early_is_clean() {
    let dir = TempDir::new().unwrap();
    populate(&dir, 10);

    let finder = DuplicateFinder::new(FinderConfig::default().with_max_buckets(1));
    let mut stream = finder.start(dir.path()).unwrap();
    assert!(stream.next().is_some());
    drop(stream);

    // The finder is still usable afterwards.
    let (groups, _) = finder.find_duplicates(dir.path()).unwrap();
    assert_eq!(groups.len(), 10);
}

#[test]
fn test_cancel_marks_summary_interrupted() {
    let dir = TempDir::new().unwrap();
    populate(&dir, 20);

    let finder = DuplicateFinder::new(FinderConfig::default().with_max_buckets(1));
    let buckets = finder.scan(dir.path()).unwrap();
    let stream = finder.spawn(buckets).unwrap();
    stream.cancel();
    let summary = stream.finish();

    assert!(summary.interrupted || summary.buckets_processed == 20);
}

#[test]
fn test_progress_counters_reach_the_end() {
    let dir = TempDir::new().unwrap();
    populate(&dir, 3);

    let counters = Arc::new(ProgressCounters::new());
    let finder =
        DuplicateFinder::new(FinderConfig::default().with_progress_callback(counters.clone()));
    let (groups, _) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(groups.len(), 3);
    assert!(counters.is_finished());
    let snapshot = counters.snapshot();
    assert_eq!(snapshot.phase, PHASE_FINGERPRINTING);
    assert_eq!(snapshot.total, 6);
    assert_eq!(snapshot.bytes, 2 * (100 + 101 + 102));
}

#[test]
fn test_text_output_lists_each_group() {
    let dir = TempDir::new().unwrap();
    populate(&dir, 2);

    let stream = DuplicateFinder::with_defaults().start(dir.path()).unwrap();
    let mut output = TextOutput::new(Vec::new(), false);
    let summary = write_stream(&mut output, stream).unwrap();
    let text = String::from_utf8(output.into_inner()).unwrap();

    assert_eq!(summary.duplicate_groups, 2);
    assert_eq!(text.matches("Equal files: ").count(), 2);
    assert!(text.contains("g0_a"));
    assert!(text.contains("g1_b"));
}

#[test]
fn test_json_lines_output_ends_with_summary() {
    let dir = TempDir::new().unwrap();
    populate(&dir, 3);

    let stream = DuplicateFinder::with_defaults().start(dir.path()).unwrap();
    let mut output = JsonLinesOutput::new(Vec::new());
    write_stream(&mut output, stream).unwrap();
    let text = String::from_utf8(output.into_inner()).unwrap();

    let records: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 4);
    for record in &records[..3] {
        assert_eq!(record["files"].as_array().unwrap().len(), 2);
        assert!(record["fingerprint"].is_string());
    }
    let summary = &records[3]["summary"];
    assert_eq!(summary["duplicate_groups"], 3);
    assert_eq!(summary["exit_code"], 0);
}
