//! Progress reporting for the detection pipeline.
//!
//! Two implementations of [`ProgressCallback`] are provided:
//!
//! - [`Progress`] draws indicatif bars on stderr for plain runs
//! - [`ProgressCounters`] keeps lock-free counters that the interactive
//!   view samples on every tick through [`ProgressCounters::snapshot`]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name used while walking the tree.
pub const PHASE_SCANNING: &str = "scanning";
/// Phase name used while fingerprinting and verifying buckets.
pub const PHASE_FINGERPRINTING: &str = "fingerprinting";

/// Progress callback for the detection pipeline.
///
/// Implement this trait to receive progress updates. Calls may arrive from
/// several worker threads at once.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts. `total` is 0 when unknown.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called as items are processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Items processed so far in this phase (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the status message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    scanning: Mutex<Option<ProgressBar>>,
    fingerprinting: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter. Nothing is drawn when `quiet`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupewalk::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            scanning: Mutex::new(None),
            fingerprinting: Mutex::new(None),
            quiet,
        }
    }

    fn scanning_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn fingerprinting_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    /// The bar for the phase currently running, if any.
    fn active(&self) -> Option<ProgressBar> {
        let fingerprinting = self.fingerprinting.lock().ok().and_then(|b| b.clone());
        fingerprinting.or_else(|| self.scanning.lock().ok().and_then(|b| b.clone()))
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        match phase {
            PHASE_SCANNING => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::scanning_style());
                pb.set_message("Scanning");
                pb.enable_steady_tick(Duration::from_millis(100));
                if let Ok(mut slot) = self.scanning.lock() {
                    *slot = Some(pb);
                }
            }
            _ => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::fingerprinting_style());
                pb.set_message("Fingerprinting");
                if let Ok(mut slot) = self.fingerprinting.lock() {
                    *slot = Some(pb);
                }
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active() {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 30));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let (slot, done) = match phase {
            PHASE_SCANNING => (&self.scanning, "Scan complete"),
            _ => (&self.fingerprinting, "Fingerprinting complete"),
        };
        if let Some(pb) = slot.lock().ok().and_then(|mut b| b.take()) {
            pb.finish_with_message(done);
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active() {
            pb.set_message(message.to_string());
        }
    }
}

/// Truncate a path for display in a progress line.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}

/// Point-in-time copy of pipeline progress for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanProgress {
    /// Current phase name
    pub phase: String,
    /// Last file reported
    pub current_path: String,
    /// Items processed in the current phase
    pub current: usize,
    /// Items expected in the current phase (0 if unknown)
    pub total: usize,
    /// Bytes fingerprinted so far
    pub bytes: u64,
}

impl ScanProgress {
    /// Create an empty progress record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u16 {
        if self.total == 0 {
            0
        } else {
            ((self.current as f64 / self.total as f64) * 100.0).min(100.0) as u16
        }
    }
}

/// Thread-safe counters fed by the pipeline and sampled by the UI.
#[derive(Debug, Default)]
pub struct ProgressCounters {
    phase: Mutex<String>,
    current_path: Mutex<String>,
    current: AtomicUsize,
    total: AtomicUsize,
    bytes: AtomicU64,
    finished: AtomicBool,
}

impl ProgressCounters {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the fingerprinting phase has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Copy the current values.
    #[must_use]
    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            phase: self.phase.lock().map(|p| p.clone()).unwrap_or_default(),
            current_path: self
                .current_path
                .lock()
                .map(|p| p.clone())
                .unwrap_or_default(),
            current: self.current.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

impl ProgressCallback for ProgressCounters {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if let Ok(mut p) = self.phase.lock() {
            *p = phase.to_string();
        }
        self.current.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    fn on_progress(&self, current: usize, path: &str) {
        self.current.fetch_max(current, Ordering::Relaxed);
        if let Ok(mut p) = self.current_path.lock() {
            p.clear();
            p.push_str(path);
        }
    }

    fn on_item_completed(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn on_phase_end(&self, phase: &str) {
        if phase == PHASE_FINGERPRINTING {
            self.finished.store(true, Ordering::SeqCst);
        }
    }
}
