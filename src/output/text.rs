//! Plain text output: one `Equal files: [...]` line per group.

use std::io::{self, Write};

use yansi::Paint;

use super::GroupWriter;
use crate::duplicates::{DuplicateGroup, ScanSummary};

const LABEL: &str = "Equal files:";

/// Line-per-group writer.
#[derive(Debug)]
pub struct TextOutput<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> TextOutput<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> GroupWriter for TextOutput<W> {
    fn write_group(&mut self, group: &DuplicateGroup) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{} {}", LABEL.green().bold(), group)?;
        } else {
            writeln!(self.out, "{LABEL} {group}")?;
        }
        self.out.flush()
    }

    fn finish(&mut self, _summary: &ScanSummary) -> io::Result<()> {
        self.out.flush()
    }
}

/// One-line human summary for stderr.
#[must_use]
pub fn summary_line(summary: &ScanSummary) -> String {
    let mut line = format!(
        "{} duplicate group(s), {} redundant file(s), {} reclaimable ({:.1}% of {} scanned files) in {:.2?}",
        summary.duplicate_groups,
        summary.duplicate_files,
        summary.reclaimable_display(),
        summary.wasted_percentage(),
        summary.total_files,
        summary.scan_duration,
    );
    if summary.had_errors() {
        line.push_str(&format!(
            "; skipped {} bucket(s) and {} candidate set(s) after errors",
            summary.buckets_failed, summary.candidate_sets_failed
        ));
    }
    if summary.interrupted {
        line.push_str(" (interrupted)");
    }
    line
}
