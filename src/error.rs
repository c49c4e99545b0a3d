//! Process exit codes and error reporting.

use serde::Serialize;

use crate::duplicates::FinderError;

/// Exit codes for dupewalk.
///
/// - 0: run completed (whether or not duplicates were found)
/// - 1: fatal error (bad root, bad config, invalid pattern)
/// - 130: interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Run completed.
    Success = 0,
    /// A fatal error stopped the run.
    GeneralError = 1,
    /// Interrupted by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code used in error messages.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DW000",
            Self::GeneralError => "DW001",
            Self::Interrupted => "DW130",
        }
    }

    /// Exit code for an error that ended the run.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<FinderError>() {
            Some(FinderError::Interrupted) => Self::Interrupted,
            _ => Self::GeneralError,
        }
    }
}

/// Error record written to stderr when JSON output is selected.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Code prefix, e.g. "DW001"
    pub code: String,
    /// Numeric exit code
    pub exit_code: i32,
    /// Human-readable message including causes
    pub message: String,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
