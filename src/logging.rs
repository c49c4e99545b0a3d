//! Logging setup on top of `log` and `env_logger`.
//!
//! The level comes from, in priority order:
//!
//! 1. `RUST_LOG`, when set
//! 2. `--quiet` (errors only) or `-v`/`-vv` (debug/trace)
//! 3. `info`, or `warn` in interactive mode
//!
//! Records go to stderr so they never mix with group output on stdout.
//! While the interactive UI owns the terminal nothing may be written to
//! it, so interactive sessions log to a file in the platform cache
//! directory instead. If that file cannot be opened, logging is off.

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use directories::ProjectDirs;
use env_logger::{Builder, Logger, Target, WriteStyle};
use log::LevelFilter;

/// File name of the interactive session log.
pub const SESSION_LOG_NAME: &str = "dupewalk.log";

/// Initialize the global logger. Later calls are ignored.
///
/// Returns the session log path when interactive records are written to a
/// file.
pub fn init_logging(verbose: u8, quiet: bool, interactive: bool) -> Option<PathBuf> {
    let (sink, path) = match interactive.then(open_session_log).flatten() {
        Some((file, path)) => (Some(Box::new(file) as Box<dyn Write + Send>), Some(path)),
        None => (None, None),
    };

    let filters = env::var("RUST_LOG").ok();
    let logger = build_logger(verbose, quiet, interactive, filters.as_deref(), sink);
    let max_level = logger.filter();

    if log::set_boxed_logger(Box::new(logger)).is_err() {
        return None;
    }
    log::set_max_level(max_level);
    log::debug!("Logging initialized at level {}", max_level);
    path
}

/// Default location of the interactive session log.
#[must_use]
pub fn session_log_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "dupewalk", "dupewalk")
        .map(|dirs| dirs.cache_dir().join(SESSION_LOG_NAME))
}

fn open_session_log() -> Option<(File, PathBuf)> {
    let path = session_log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    let file = File::create(&path).ok()?;
    Some((file, path))
}

/// Build the logger without installing it.
///
/// `sink` replaces stderr. Interactive mode without a sink is silenced.
fn build_logger(
    verbose: u8,
    quiet: bool,
    interactive: bool,
    filters: Option<&str>,
    sink: Option<Box<dyn Write + Send>>,
) -> Logger {
    let mut builder = Builder::new();

    match sink {
        Some(pipe) => {
            builder.target(Target::Pipe(pipe));
            builder.write_style(WriteStyle::Never);
        }
        None if interactive => {
            builder.filter_level(LevelFilter::Off);
            return builder.build();
        }
        None => {
            builder.target(Target::Stderr);
        }
    }

    match filters {
        Some(filters) => {
            builder.parse_filters(filters);
        }
        None => {
            builder.filter_level(determine_level(verbose, quiet, interactive));
        }
    }

    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        if verbose > 0 || interactive {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_millis(),
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        }
    });

    builder.build()
}

fn determine_level(verbose: u8, quiet: bool, interactive: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 if interactive => LevelFilter::Warn,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
