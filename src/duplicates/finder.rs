//! Pipeline orchestration: scan, fingerprint, verify, stream.
//!
//! # Overview
//!
//! [`DuplicateFinder`] drives the whole detection pipeline:
//!
//! 1. **Scan** - walk the tree and bucket files by size (fatal on error)
//! 2. **Fingerprint** - each bucket of 2+ files through a [`BucketProcessor`]
//! 3. **Verify** - each candidate set through the [`Partitioner`]
//! 4. **Stream** - every verified group is sent as soon as it exists
//!
//! Steps 2-4 run on a background thread. At most `max_buckets` buckets are
//! in flight at once (a dedicated rayon pool), each using up to `workers`
//! threads of a shared fingerprint pool. A failing bucket or candidate set is logged and
//! skipped; it never stops the others.
//!
//! # Example
//!
//! ```no_run
//! use dupewalk::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_workers(8));
//! let mut stream = finder.start(Path::new("/some/path")).unwrap();
//! for group in stream.by_ref() {
//!     println!("Equal files: {}", group);
//! }
//! let summary = stream.finish();
//! println!("Reclaimable: {}", summary.reclaimable_display());
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::bucket::{BucketError, BucketProcessor};
use super::groups::DuplicateGroup;
use super::partition::Partitioner;
use crate::progress::{ProgressCallback, PHASE_FINGERPRINTING, PHASE_SCANNING};
use crate::scanner::{
    BufferPool, Fingerprinter, ScanConfig, ScanError, SizeBucket, SizeBuckets, Walker,
    DEFAULT_BUFFER_SIZE, DEFAULT_STRONG_HASH_THRESHOLD,
};
use crate::signal::CancelToken;

/// Files reported to the progress callback per scan update.
const SCAN_PROGRESS_INTERVAL: usize = 64;

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Fingerprinting threads per bucket.
    pub workers: usize,
    /// Buckets processed concurrently.
    pub max_buckets: usize,
    /// Scratch buffer size for reads.
    pub buffer_size: usize,
    /// Files above this size use BLAKE3; `None` keeps XXH3 for all sizes.
    pub strong_hash_threshold: Option<u64>,
    /// Ignore rules for the walk.
    pub scan_config: ScanConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("workers", &self.workers)
            .field("max_buckets", &self.max_buckets)
            .field("buffer_size", &self.buffer_size)
            .field("strong_hash_threshold", &self.strong_hash_threshold)
            .field("scan_config", &self.scan_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_buckets: 4,
            buffer_size: DEFAULT_BUFFER_SIZE,
            strong_hash_threshold: Some(DEFAULT_STRONG_HASH_THRESHOLD),
            scan_config: ScanConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the per-bucket fingerprinting concurrency (at least 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set how many buckets may be processed at once (at least 1).
    #[must_use]
    pub fn with_max_buckets(mut self, max_buckets: usize) -> Self {
        self.max_buckets = max_buckets.max(1);
        self
    }

    /// Set the read buffer size (at least 1 byte).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Set the size above which BLAKE3 replaces XXH3.
    #[must_use]
    pub fn with_strong_hash_threshold(mut self, threshold: Option<u64>) -> Self {
        self.strong_hash_threshold = threshold;
        self
    }

    /// Set the ignore rules.
    #[must_use]
    pub fn with_scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a run.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Regular files found by the scan
    pub total_files: usize,
    /// Total size of those files in bytes
    pub total_size: u64,
    /// Size buckets holding two or more files
    pub buckets_total: usize,
    /// Buckets fully fingerprinted and verified
    pub buckets_processed: usize,
    /// Buckets skipped because a member could not be fingerprinted
    pub buckets_failed: usize,
    /// Candidate sets skipped because verification failed
    pub candidate_sets_failed: usize,
    /// Verified duplicate groups emitted
    pub duplicate_groups: usize,
    /// Files in those groups beyond the first copy
    pub duplicate_files: usize,
    /// Bytes reclaimable by keeping one copy per group
    pub reclaimable_space: u64,
    /// Wall time from start to stream closure
    pub scan_duration: Duration,
    /// Whether the run stopped early
    pub interrupted: bool,
}

impl ScanSummary {
    /// Percentage of scanned bytes held by redundant copies.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Reclaimable space as a human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Whether any bucket or candidate set was skipped.
    #[must_use]
    pub fn had_errors(&self) -> bool {
        self.buckets_failed > 0 || self.candidate_sets_failed > 0
    }
}

/// Errors that end a run before any groups are produced.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The run was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The directory walk failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The bucket thread pool could not be created.
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),

    /// The orchestrator thread could not be spawned.
    #[error("Failed to spawn pipeline thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Counters shared by bucket tasks.
#[derive(Default)]
struct PipelineStats {
    buckets_processed: AtomicUsize,
    buckets_failed: AtomicUsize,
    buckets_cancelled: AtomicUsize,
    candidate_sets_failed: AtomicUsize,
    duplicate_groups: AtomicUsize,
    duplicate_files: AtomicUsize,
    reclaimable_space: AtomicU64,
}

impl PipelineStats {
    fn record_group(&self, group: &DuplicateGroup) {
        self.duplicate_groups.fetch_add(1, Ordering::Relaxed);
        self.duplicate_files
            .fetch_add(group.len().saturating_sub(1), Ordering::Relaxed);
        self.reclaimable_space
            .fetch_add(group.wasted_space(), Ordering::Relaxed);
    }

    fn fill(&self, summary: &mut ScanSummary) {
        summary.buckets_processed = self.buckets_processed.load(Ordering::Relaxed);
        summary.buckets_failed = self.buckets_failed.load(Ordering::Relaxed);
        summary.candidate_sets_failed = self.candidate_sets_failed.load(Ordering::Relaxed);
        summary.duplicate_groups = self.duplicate_groups.load(Ordering::Relaxed);
        summary.duplicate_files = self.duplicate_files.load(Ordering::Relaxed);
        summary.reclaimable_space = self.reclaimable_space.load(Ordering::Relaxed);
        summary.interrupted = self.buckets_cancelled.load(Ordering::Relaxed) > 0;
    }
}

/// Everything a bucket task needs, shared by reference across the pool.
struct Pipeline {
    processor: BucketProcessor,
    partitioner: Partitioner,
    root: CancelToken,
    stats: PipelineStats,
}

impl Pipeline {
    fn run_bucket(&self, bucket: &SizeBucket, tx: &Sender<DuplicateGroup>) {
        if self.root.is_cancelled() {
            self.stats.buckets_cancelled.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let sets = match self.processor.process(bucket, &self.root) {
            Ok(sets) => sets,
            Err(BucketError::Cancelled) => {
                self.stats.buckets_cancelled.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(e) => {
                log::warn!(
                    "Skipping {} files of {} bytes: {}",
                    bucket.len(),
                    bucket.size,
                    e
                );
                self.stats.buckets_failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        for set in &sets {
            let groups = match self.partitioner.partition_cancellable(set, &self.root) {
                Ok(groups) => groups,
                Err(super::partition::CompareError::Cancelled) => {
                    self.stats.buckets_cancelled.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(e) => {
                    log::warn!(
                        "Skipping {} candidates with fingerprint {}: {}",
                        set.len(),
                        set.fingerprint,
                        e
                    );
                    self.stats
                        .candidate_sets_failed
                        .fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            for group in groups {
                self.stats.record_group(&group);
                if tx.send(group).is_err() {
                    log::debug!("Group consumer went away, cancelling run");
                    self.root.cancel();
                    return;
                }
            }
        }

        self.stats.buckets_processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Stream of verified duplicate groups from a running pipeline.
///
/// Iterating blocks until the next group is ready and ends once every
/// bucket has been processed or skipped. Dropping the stream cancels any
/// outstanding work.
pub struct GroupStream {
    receiver: Receiver<DuplicateGroup>,
    cancel: CancelToken,
    handle: Option<JoinHandle<ScanSummary>>,
    started: Instant,
}

impl std::fmt::Debug for GroupStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("running", &self.handle.is_some())
            .finish()
    }
}

impl GroupStream {
    /// A handle that stops the pipeline when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Ask the pipeline to stop early.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the pipeline to end and return its summary.
    ///
    /// Groups not yet read are discarded.
    #[must_use]
    pub fn finish(mut self) -> ScanSummary {
        let mut summary = match self.handle.take().map(JoinHandle::join) {
            Some(Ok(summary)) => summary,
            Some(Err(_)) => {
                log::error!("Pipeline thread panicked");
                ScanSummary {
                    interrupted: true,
                    ..ScanSummary::default()
                }
            }
            None => ScanSummary::default(),
        };
        summary.scan_duration = self.started.elapsed();
        summary
    }
}

impl Iterator for GroupStream {
    type Item = DuplicateGroup;

    fn next(&mut self) -> Option<DuplicateGroup> {
        self.receiver.recv().ok()
    }
}

impl Drop for GroupStream {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.cancel();
        }
    }
}

/// Duplicate finder that orchestrates the detection pipeline.
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
    fingerprinter: Fingerprinter,
    partitioner: Partitioner,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let buffers = BufferPool::new(config.buffer_size);
        let fingerprinter = Fingerprinter::new(buffers.clone())
            .with_strong_threshold(config.strong_hash_threshold);
        Self {
            config,
            fingerprinter,
            partitioner: Partitioner::new(buffers),
        }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Walk `root` and bucket its files by size.
    ///
    /// # Errors
    ///
    /// Any traversal failure is returned as [`FinderError::Scan`];
    /// a shutdown request as [`FinderError::Interrupted`].
    pub fn scan(&self, root: &Path) -> Result<SizeBuckets, FinderError> {
        let progress = self.config.progress_callback.as_deref();
        if let Some(cb) = progress {
            cb.on_phase_start(PHASE_SCANNING, 0);
        }

        let mut walker = Walker::new(root, self.config.scan_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        let mut buckets = SizeBuckets::new();
        for entry in walker.walk() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(ScanError::Interrupted) => return Err(FinderError::Interrupted),
                Err(e) => return Err(e.into()),
            };
            if let Some(cb) = progress {
                let count = buckets.total_files() + 1;
                if count % SCAN_PROGRESS_INTERVAL == 1 {
                    cb.on_progress(count, &entry.path.to_string_lossy());
                }
            }
            buckets.insert(entry);
        }

        if let Some(cb) = progress {
            cb.on_progress(buckets.total_files(), "");
            cb.on_phase_end(PHASE_SCANNING);
        }
        log::info!(
            "Found {} files ({} size buckets with possible duplicates)",
            buckets.total_files(),
            buckets.candidate_count()
        );
        Ok(buckets)
    }

    /// Process `buckets` on a background thread, streaming verified groups.
    ///
    /// Buckets with fewer than two members are never processed.
    ///
    /// # Errors
    ///
    /// Fails only if the worker threads cannot be created.
    pub fn spawn(&self, buckets: SizeBuckets) -> Result<GroupStream, FinderError> {
        self.spawn_at(buckets, Instant::now())
    }

    /// Scan `root`, then start streaming groups.
    ///
    /// # Errors
    ///
    /// Scan failures are fatal and returned before any processing starts.
    pub fn start(&self, root: &Path) -> Result<GroupStream, FinderError> {
        let started = Instant::now();
        let buckets = self.scan(root)?;
        self.spawn_at(buckets, started)
    }

    fn spawn_at(&self, buckets: SizeBuckets, started: Instant) -> Result<GroupStream, FinderError> {
        let root = match self.config.shutdown_flag {
            Some(ref flag) => CancelToken::from_flag(Arc::clone(flag)).child(),
            None => CancelToken::new(),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_buckets)
            .thread_name(|i| format!("dupewalk-bucket-{}", i))
            .build()
            .map_err(|e| FinderError::ThreadPool(e.to_string()))?;

        let mut processor = BucketProcessor::new(
            self.fingerprinter.clone(),
            self.config.workers,
            self.config.max_buckets,
        )
        .map_err(|e| FinderError::ThreadPool(e.to_string()))?;
        if let Some(ref cb) = self.config.progress_callback {
            processor = processor.with_progress_callback(Arc::clone(cb));
        }

        let pipeline = Pipeline {
            processor,
            partitioner: self.partitioner.clone(),
            root: root.clone(),
            stats: PipelineStats::default(),
        };
        let progress = self.config.progress_callback.clone();
        let (tx, rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("dupewalk-pipeline".to_string())
            .spawn(move || run_pipeline(buckets, &pipeline, &pool, tx, progress.as_deref()))
            .map_err(FinderError::Spawn)?;

        Ok(GroupStream {
            receiver: rx,
            cancel: root,
            handle: Some(handle),
            started,
        })
    }

    /// Find all duplicate groups under `root`, blocking until done.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if the scan fails or the run is interrupted
    /// by the shutdown flag.
    pub fn find_duplicates(
        &self,
        root: &Path,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let mut stream = self.start(root)?;
        let groups: Vec<DuplicateGroup> = stream.by_ref().collect();
        let summary = stream.finish();

        if summary.interrupted && self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }
        log::info!(
            "Found {} duplicate groups, {} reclaimable",
            summary.duplicate_groups,
            summary.reclaimable_display()
        );
        Ok((groups, summary))
    }
}

/// Orchestrator thread body. Returns once every bucket is done or skipped;
/// dropping `tx` then closes the stream.
fn run_pipeline(
    buckets: SizeBuckets,
    pipeline: &Pipeline,
    pool: &rayon::ThreadPool,
    tx: Sender<DuplicateGroup>,
    progress: Option<&dyn ProgressCallback>,
) -> ScanSummary {
    let mut summary = ScanSummary {
        total_files: buckets.total_files(),
        total_size: buckets.total_bytes(),
        ..ScanSummary::default()
    };

    let candidates = buckets.into_candidates();
    summary.buckets_total = candidates.len();
    let candidate_files: usize = candidates.iter().map(SizeBucket::len).sum();
    log::debug!(
        "Processing {} buckets ({} files)",
        candidates.len(),
        candidate_files
    );

    if let Some(cb) = progress {
        cb.on_phase_start(PHASE_FINGERPRINTING, candidate_files);
    }

    pool.scope(|s| {
        for bucket in &candidates {
            let tx = tx.clone();
            s.spawn(move |_| pipeline.run_bucket(bucket, &tx));
        }
    });
    drop(tx);

    if let Some(cb) = progress {
        cb.on_phase_end(PHASE_FINGERPRINTING);
    }

    pipeline.stats.fill(&mut summary);
    summary.interrupted |= pipeline.root.is_cancelled()
        && summary.buckets_processed + summary.buckets_failed < summary.buckets_total;
    summary
}
