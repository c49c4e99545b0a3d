//! Interactive control loop.
//!
//! # Terminal Management
//!
//! The TUI takes over the terminal by enabling raw mode, entering the
//! alternate screen and hiding the cursor. All of this is reverted on exit,
//! including on panic.
//!
//! # Threads
//!
//! Every input reaches the loop as an [`Event`] on one channel:
//!
//! - a forwarder drains the [`GroupStream`] (`Group`, then `ScanComplete`)
//! - an input thread reads crossterm events (`Key`, `Resize`)
//! - a ticker samples [`ProgressCounters`] (`Tick`) and watches the
//!   shutdown flag (`Terminate`)
//! - each deletion batch runs on its own thread (`Deleted`)
//!
//! Only the loop touches [`App`].

use std::io::{self, Stdout};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use thiserror::Error;

use super::app::{App, Command, Event};
use super::events::spawn_input_thread;
use super::ui::render;
use crate::actions::{delete_batch, DeleteConfig};
use crate::duplicates::{GroupStream, ScanSummary};
use crate::progress::ProgressCounters;
use crate::signal::CancelToken;

/// Interval between progress samples.
pub const TICK_RATE: Duration = Duration::from_millis(100);

/// Error type for TUI operations.
#[derive(Debug, Error)]
pub enum TuiError {
    /// I/O error from terminal operations or thread creation.
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),

    /// Every event source disconnected before the user quit.
    #[error("event channel closed unexpectedly")]
    Disconnected,
}

/// Result type for TUI operations.
pub type TuiResult<T> = Result<T, TuiError>;

/// How an interactive session ended.
#[derive(Debug, Clone, Default)]
pub struct TuiOutcome {
    /// Summary, if the pipeline finished before the user quit
    pub summary: Option<ScanSummary>,
    /// Files removed during the session
    pub files_deleted: usize,
    /// Bytes freed during the session
    pub bytes_freed: u64,
}

/// Settings for one interactive session.
#[derive(Debug, Clone)]
pub struct TuiOptions {
    /// How confirmed files are removed
    pub delete_config: DeleteConfig,
    /// External shutdown flag (Ctrl+C handler)
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

/// Run the reconciler over `stream` until the user quits.
///
/// The terminal is always restored, even on error or panic.
///
/// # Errors
///
/// Returns [`TuiError::Io`] if the terminal cannot be driven.
pub fn run_tui(
    app: App,
    stream: GroupStream,
    counters: Arc<ProgressCounters>,
    options: TuiOptions,
) -> TuiResult<TuiOutcome> {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        restore_terminal();
        original_hook(info);
    }));

    let result = setup_terminal().and_then(|mut terminal| {
        let result = run_session(&mut terminal, app, stream, counters, options);
        restore_terminal();
        result
    });

    let _ = panic::take_hook();
    result
}

/// Background threads feeding one session, stopped together on exit.
struct Sources {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Sources {
    fn start(
        tx: &Sender<Event>,
        stream: GroupStream,
        counters: Arc<ProgressCounters>,
        shutdown: Option<Arc<AtomicBool>>,
    ) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(3);

        // Not joined on exit: finish() waits for the pipeline to observe
        // cancellation.
        let forward_tx = tx.clone();
        thread::Builder::new()
            .name("dupewalk-forward".to_string())
            .spawn(move || forward_groups(stream, &forward_tx))?;

        handles.push(spawn_input_thread(tx.clone(), Arc::clone(&stop))?);

        let tick_tx = tx.clone();
        let tick_stop = Arc::clone(&stop);
        handles.push(
            thread::Builder::new()
                .name("dupewalk-tick".to_string())
                .spawn(move || tick(&tick_tx, &counters, shutdown.as_deref(), &tick_stop))?,
        );

        Ok(Self { stop, handles })
    }

    fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        for handle in self.handles {
            if handle.join().is_err() {
                log::warn!("Event source thread panicked");
            }
        }
    }
}

fn forward_groups(mut stream: GroupStream, tx: &Sender<Event>) {
    for group in stream.by_ref() {
        if tx.send(Event::Group(group)).is_err() {
            // Dropping the stream cancels the pipeline.
            return;
        }
    }
    let summary = stream.finish();
    let _ = tx.send(Event::ScanComplete(summary));
}

fn tick(
    tx: &Sender<Event>,
    counters: &ProgressCounters,
    shutdown: Option<&AtomicBool>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::SeqCst) {
        if shutdown.is_some_and(|f| f.load(Ordering::SeqCst)) {
            log::info!("Shutdown signal received, leaving interactive mode");
            let _ = tx.send(Event::Terminate);
            return;
        }
        if tx.send(Event::Tick(counters.snapshot())).is_err() {
            return;
        }
        thread::sleep(TICK_RATE);
    }
}

fn run_session<B: Backend>(
    terminal: &mut Terminal<B>,
    app: App,
    stream: GroupStream,
    counters: Arc<ProgressCounters>,
    options: TuiOptions,
) -> TuiResult<TuiOutcome> {
    let (tx, rx) = mpsc::channel();
    let cancel = stream.cancel_token();
    let sources = Sources::start(&tx, stream, counters, options.shutdown_flag.clone())?;

    let result = control_loop(terminal, app, &tx, &rx, &cancel, options.delete_config);

    cancel.cancel();
    sources.stop();
    result
}

/// Drive `app` from `rx` until it quits, drawing after every event.
///
/// Deletion batches are started on their own threads and reported back
/// through `tx`. Returns once the app reaches Quitting and any running
/// batch has finished.
///
/// # Errors
///
/// Fails if drawing fails or the channel disconnects.
pub fn control_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tx: &Sender<Event>,
    rx: &Receiver<Event>,
    cancel: &CancelToken,
    delete_config: DeleteConfig,
) -> TuiResult<TuiOutcome> {
    let mut outcome = TuiOutcome::default();
    let mut deleting: Option<JoinHandle<()>> = None;

    if let Ok(size) = terminal.size() {
        app.update(Event::Resize(size.width, size.height));
    }

    while !app.should_quit() {
        terminal.draw(|frame| render(frame, &app))?;

        let event = rx.recv().map_err(|_| TuiError::Disconnected)?;
        if let Event::Deleted(ref result) = event {
            outcome.files_deleted += result.success_count();
            outcome.bytes_freed += result.bytes_freed;
            if let Some(handle) = deleting.take() {
                let _ = handle.join();
            }
        }

        match app.update(event) {
            Some(Command::DeleteFiles(paths)) => {
                let tx = tx.clone();
                log::info!("Deleting {} file(s)", paths.len());
                deleting = Some(
                    thread::Builder::new()
                        .name("dupewalk-delete".to_string())
                        .spawn(move || {
                            let result = delete_batch(&paths, &delete_config);
                            let _ = tx.send(Event::Deleted(result));
                        })?,
                );
            }
            Some(Command::Quit) => cancel.cancel(),
            None => {}
        }
    }

    // A batch in flight still runs to completion.
    if let Some(handle) = deleting {
        let _ = handle.join();
        while let Ok(event) = rx.try_recv() {
            if let Event::Deleted(result) = event {
                outcome.files_deleted += result.success_count();
                outcome.bytes_freed += result.bytes_freed;
            }
        }
    }

    outcome.summary = app.summary().cloned();
    log::info!("Interactive session ended");
    Ok(outcome)
}

fn setup_terminal() -> TuiResult<Terminal<CrosstermBackend<Stdout>>> {
    log::debug!("Setting up terminal");
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, cursor::Hide) {
        restore_terminal();
        return Err(e.into());
    }
    Terminal::new(CrosstermBackend::new(stdout)).map_err(|e| {
        restore_terminal();
        e.into()
    })
}

fn restore_terminal() {
    let _ = terminal::disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
}
