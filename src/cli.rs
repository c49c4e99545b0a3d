//! Command-line interface definitions for dupewalk.
//!
//! Options left unset fall back to the configuration file and environment
//! (see [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Print groups of identical files
//! dupewalk ~/Downloads
//!
//! # Skip VCS and dependency folders, JSON Lines output
//! dupewalk ~/src --ignore-names .git,node_modules --output json
//!
//! # Review and delete interactively
//! dupewalk -i ~/Pictures
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::tui::theme::ThemeChoice;

/// Find byte-identical files and optionally remove redundant copies.
///
/// Files are bucketed by size, fingerprinted (XXH3-128, BLAKE3 for large
/// files) and verified byte for byte before being reported as equal.
#[derive(Debug, Parser)]
#[command(name = "dupewalk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Base names to ignore, comma separated (e.g. .git,node_modules)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub ignore_names: Option<Vec<String>>,

    /// Regular expression matched against full paths to ignore
    #[arg(long, value_name = "REGEX")]
    pub ignore_regex: Option<String>,

    /// Fingerprinting threads per size bucket (default: 4)
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Size buckets processed concurrently (default: 4)
    #[arg(long, value_name = "N")]
    pub max_buckets: Option<usize>,

    /// Files larger than SIZE are fingerprinted with BLAKE3 (default: 20MiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub strong_hash_threshold: Option<u64>,

    /// Use XXH3-128 for every file regardless of size
    #[arg(long, conflicts_with = "strong_hash_threshold")]
    pub uniform_hash: bool,

    /// Review duplicates in an interactive terminal UI
    #[arg(short, long)]
    pub interactive: bool,

    /// Output format for non-interactive runs
    #[arg(short, long, value_enum, default_value = "text", conflicts_with = "interactive")]
    pub output: OutputFormat,

    /// Move deleted files to the system trash instead of removing them
    #[arg(long)]
    pub trash: bool,

    /// Color theme for the interactive UI
    #[arg(long, value_enum, value_name = "THEME")]
    pub theme: Option<ThemeChoice>,

    /// Configuration file (default: platform config dir)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,
}

/// Output format for non-interactive runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One `Equal files: [...]` line per group
    Text,
    /// One JSON object per group (JSON Lines)
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupewalk::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("20MiB").unwrap(), 20 * 1_048_576);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
