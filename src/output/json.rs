//! JSON Lines output.
//!
//! Each verified group is written as one compact object as soon as it
//! arrives, followed by a final summary record:
//!
//! ```text
//! {"size":11,"fingerprint":"9c1b...","files":["/a/x","/a/y"]}
//! {"summary":{"total_files":4,"duplicate_groups":1,...}}
//! ```

use std::io::{self, Write};

use serde::Serialize;

use super::GroupWriter;
use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;

/// A single group record.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup<'a> {
    /// File size in bytes
    pub size: u64,
    /// Hex fingerprint shared by every member
    pub fingerprint: &'a str,
    /// Member paths in discovery order
    pub files: Vec<String>,
}

impl<'a> From<&'a DuplicateGroup> for JsonGroup<'a> {
    fn from(group: &'a DuplicateGroup) -> Self {
        Self {
            size: group.size,
            fingerprint: group.fingerprint.as_str(),
            files: group
                .files
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in the trailing record.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Regular files found by the scan
    pub total_files: usize,
    /// Total size of those files in bytes
    pub total_size: u64,
    /// Size buckets with two or more files
    pub buckets_total: usize,
    /// Buckets skipped after a fingerprinting failure
    pub buckets_failed: usize,
    /// Candidate sets skipped after a comparison failure
    pub candidate_sets_failed: usize,
    /// Verified duplicate groups
    pub duplicate_groups: usize,
    /// Redundant copies across all groups
    pub duplicate_files: usize,
    /// Bytes reclaimable by keeping one copy per group
    pub reclaimable_space: u64,
    /// Wall time in milliseconds
    pub scan_duration_ms: u64,
    /// Whether the run stopped early
    pub interrupted: bool,
    /// Process exit code
    pub exit_code: i32,
}

impl JsonSummary {
    #[must_use]
    pub fn new(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            buckets_total: summary.buckets_total,
            buckets_failed: summary.buckets_failed,
            candidate_sets_failed: summary.candidate_sets_failed,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            interrupted: summary.interrupted,
            exit_code: exit_code.as_i32(),
        }
    }
}

#[derive(Serialize)]
struct SummaryRecord {
    summary: JsonSummary,
}

/// JSON Lines writer.
#[derive(Debug)]
pub struct JsonLinesOutput<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesOutput<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_record<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl<W: Write> GroupWriter for JsonLinesOutput<W> {
    fn write_group(&mut self, group: &DuplicateGroup) -> io::Result<()> {
        self.write_record(&JsonGroup::from(group))
    }

    fn finish(&mut self, summary: &ScanSummary) -> io::Result<()> {
        let exit_code = if summary.interrupted {
            ExitCode::Interrupted
        } else {
            ExitCode::Success
        };
        self.write_record(&SummaryRecord {
            summary: JsonSummary::new(summary, exit_code),
        })
    }
}
