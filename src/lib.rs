//! dupewalk - find byte-identical files.
//!
//! Files under a root are bucketed by size, fingerprinted in parallel and
//! verified byte for byte before being reported as duplicates. Groups are
//! streamed to a printer or to an interactive reconciler that can delete
//! redundant copies.
//!
//! # Example
//!
//! ```no_run
//! use dupewalk::duplicates::DuplicateFinder;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, summary) = finder.find_duplicates(Path::new(".")).unwrap();
//! for group in &groups {
//!     println!("Equal files: {group}");
//! }
//! println!("{} reclaimable", summary.reclaimable_display());
//! ```

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod tui;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, FinderConfig, FinderError, ScanSummary};
use crate::error::ExitCode;
use crate::output::{summary_line, write_stream, JsonLinesOutput, TextOutput};
use crate::progress::{Progress, ProgressCounters};
use crate::signal::ShutdownHandler;
use crate::tui::{run_tui, App, Theme, TuiOptions};

/// Run dupewalk with parsed arguments.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unusable root, terminal
/// failures, or when the run was interrupted ([`FinderError::Interrupted`]).
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    if cli.no_color {
        yansi::disable();
    }
    let session_log = logging::init_logging(cli.verbose, cli.quiet, cli.interactive);

    let handler = signal::install_handler().context("Failed to install Ctrl+C handler")?;

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.merge_cli(&cli);
    config.validate()?;
    log::debug!("Effective configuration: {:?}", config);

    let finder_config = config
        .finder_config()?
        .with_shutdown_flag(handler.get_flag());

    if cli.interactive {
        run_interactive(&cli, &config, finder_config, &handler, session_log.as_deref())
    } else {
        run_batch(&cli, finder_config, &handler)
    }
}

fn run_batch(
    cli: &Cli,
    finder_config: FinderConfig,
    handler: &ShutdownHandler,
) -> anyhow::Result<ExitCode> {
    let progress = Arc::new(Progress::new(cli.quiet));
    let finder = DuplicateFinder::new(finder_config.with_progress_callback(progress));
    let stream = finder
        .start(&cli.path)
        .with_context(|| format!("Failed to scan {}", cli.path.display()))?;

    let stdout = io::stdout().lock();
    let written = match cli.output {
        OutputFormat::Text => {
            let color = !cli.no_color && io::IsTerminal::is_terminal(&io::stdout());
            write_stream(&mut TextOutput::new(stdout, color), stream)
        }
        OutputFormat::Json => write_stream(&mut JsonLinesOutput::new(stdout), stream),
    };

    let summary = match written {
        Ok(summary) => summary,
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            log::debug!("Output closed, stopping");
            return Ok(ExitCode::Success);
        }
        Err(e) => return Err(e).context("Failed to write output"),
    };

    if cli.output == OutputFormat::Text && !cli.quiet {
        eprintln!("{}", summary_line(&summary));
    }
    finish(&summary, handler)
}

fn run_interactive(
    cli: &Cli,
    config: &Config,
    finder_config: FinderConfig,
    handler: &ShutdownHandler,
    session_log: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let counters = Arc::new(ProgressCounters::new());
    let finder = DuplicateFinder::new(finder_config.with_progress_callback(counters.clone()));

    // Walk before taking over the terminal so fatal errors print normally.
    let buckets = finder
        .scan(&cli.path)
        .with_context(|| format!("Failed to scan {}", cli.path.display()))?;
    let stream = finder.spawn(buckets)?;

    let app = App::new()
        .with_theme(Theme::from_choice(config.theme))
        .with_trash(config.trash);
    let options = TuiOptions {
        delete_config: config.delete_config(),
        shutdown_flag: Some(handler.get_flag()),
    };
    let outcome = run_tui(app, stream, counters, options).context("Interactive session failed")?;

    if outcome.files_deleted > 0 && !cli.quiet {
        eprintln!(
            "Deleted {} file(s), freed {}",
            outcome.files_deleted,
            bytesize::ByteSize::b(outcome.bytes_freed)
        );
    }
    let had_errors = outcome.summary.as_ref().is_some_and(ScanSummary::had_errors);
    if had_errors && !cli.quiet {
        if let Some(path) = session_log {
            eprintln!("Skipped files are listed in {}", path.display());
        }
    }
    match outcome.summary {
        Some(ref summary) => finish(summary, handler),
        None if handler.is_shutdown_requested() => Err(FinderError::Interrupted.into()),
        None => Ok(ExitCode::Success),
    }
}

fn finish(summary: &ScanSummary, handler: &ShutdownHandler) -> anyhow::Result<ExitCode> {
    if summary.had_errors() {
        log::warn!(
            "Skipped {} bucket(s) and {} candidate set(s) after I/O errors",
            summary.buckets_failed,
            summary.candidate_sets_failed
        );
    }
    if summary.interrupted && handler.is_shutdown_requested() {
        return Err(FinderError::Interrupted.into());
    }
    Ok(ExitCode::Success)
}
