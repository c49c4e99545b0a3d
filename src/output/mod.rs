//! Printers for non-interactive runs.
//!
//! Groups are written as they come off the [`GroupStream`], so output
//! starts before the whole tree has been processed.
//!
//! # Example
//!
//! ```no_run
//! use dupewalk::duplicates::DuplicateFinder;
//! use dupewalk::output::{write_stream, TextOutput};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let stream = finder.start(Path::new(".")).unwrap();
//! let mut printer = TextOutput::new(std::io::stdout(), true);
//! let summary = write_stream(&mut printer, stream).unwrap();
//! ```

pub mod json;
pub mod text;

use std::io;

use crate::duplicates::{DuplicateGroup, GroupStream, ScanSummary};

pub use json::{JsonGroup, JsonLinesOutput, JsonSummary};
pub use text::{summary_line, TextOutput};

/// Sink for verified duplicate groups.
pub trait GroupWriter {
    /// Write one group.
    fn write_group(&mut self, group: &DuplicateGroup) -> io::Result<()>;

    /// Write any trailer once the stream has closed.
    fn finish(&mut self, summary: &ScanSummary) -> io::Result<()>;
}

/// Drain `stream` into `writer` and return the run summary.
///
/// # Errors
///
/// Returns the first write error. The stream is dropped, which cancels the
/// pipeline; a closed stdout (`BrokenPipe`) is reported the same way.
pub fn write_stream<W: GroupWriter + ?Sized>(
    writer: &mut W,
    mut stream: GroupStream,
) -> io::Result<ScanSummary> {
    for group in stream.by_ref() {
        writer.write_group(&group)?;
    }
    let summary = stream.finish();
    writer.finish(&summary)?;
    Ok(summary)
}
