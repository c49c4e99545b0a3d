//! Per-bucket fingerprinting on a shared rayon pool.
//!
//! # Overview
//!
//! A size bucket is split into at most `workers` contiguous chunks which
//! are fingerprinted in parallel on the processor's thread pool. The pool
//! is built once and reused for every bucket, sized so that
//! `concurrent_buckets` buckets can each run `workers` chunks at the same
//! time. Results are grouped by fingerprint in bucket order and singletons
//! are dropped.
//!
//! # Failure policy
//!
//! - Fail-fast inside a bucket: the first fingerprint error cancels the
//!   bucket's own token, remaining members are skipped, the whole bucket
//!   fails
//! - Isolation between buckets: each call works on a child of the caller's
//!   token, so a failed bucket never cancels its siblings
//! - Cancelling the caller's token (shutdown, consumer gone) stops the
//!   bucket with [`BucketError::Cancelled`]

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::groups::CandidateSet;
use crate::progress::ProgressCallback;
use crate::scanner::{Fingerprint, FingerprintError, Fingerprinter, SizeBucket};
use crate::signal::CancelToken;

/// Why a bucket produced no candidate sets.
#[derive(thiserror::Error, Debug)]
pub enum BucketError {
    /// A member could not be fingerprinted.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// A worker thread panicked.
    #[error("Fingerprint worker panicked in bucket of {size}-byte files")]
    WorkerPanicked {
        /// Size of the bucket's files
        size: u64,
    },

    /// The run was cancelled before the bucket finished.
    #[error("Bucket processing cancelled")]
    Cancelled,

    /// The fingerprinting pool could not be created.
    #[error("Failed to start fingerprint workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Fingerprints size buckets with bounded parallelism.
///
/// Clones share the thread pool and the progress counter.
#[derive(Clone)]
pub struct BucketProcessor {
    fingerprinter: Fingerprinter,
    workers: usize,
    pool: Arc<rayon::ThreadPool>,
    progress: Option<Arc<dyn ProgressCallback>>,
    processed: Arc<AtomicUsize>,
}

impl std::fmt::Debug for BucketProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketProcessor")
            .field("fingerprinter", &self.fingerprinter)
            .field("workers", &self.workers)
            .field("pool_threads", &self.pool.current_num_threads())
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .field("processed", &self.processed.load(Ordering::Relaxed))
            .finish()
    }
}

impl BucketProcessor {
    /// Create a processor running up to `workers` chunks per bucket, with
    /// room for `concurrent_buckets` buckets in flight.
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::ThreadPool`] if the pool cannot be built.
    pub fn new(
        fingerprinter: Fingerprinter,
        workers: usize,
        concurrent_buckets: usize,
    ) -> Result<Self, BucketError> {
        let workers = workers.max(1);
        let threads = workers.saturating_mul(concurrent_buckets.max(1));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("dupewalk-hash-{}", i))
            .build()?;
        log::debug!("Fingerprint pool started with {} threads", threads);

        Ok(Self {
            fingerprinter,
            workers,
            pool: Arc::new(pool),
            progress: None,
            processed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Report each fingerprinted file to `callback`.
    ///
    /// Clones share one counter, so `current` is cumulative across buckets.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Per-bucket worker limit.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Threads in the shared fingerprint pool.
    #[must_use]
    pub fn pool_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Files fingerprinted so far by this processor and its clones.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    /// Fingerprint every member of `bucket` and group them.
    ///
    /// # Errors
    ///
    /// See [`BucketError`]. On error no candidate sets are returned.
    pub fn process(
        &self,
        bucket: &SizeBucket,
        cancel: &CancelToken,
    ) -> Result<Vec<CandidateSet>, BucketError> {
        if bucket.len() < 2 {
            return Ok(Vec::new());
        }

        let token = cancel.child();
        let chunk_len = bucket.len().div_ceil(self.workers);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| {
                bucket
                    .paths
                    .par_chunks(chunk_len)
                    .flat_map_iter(|chunk| {
                        chunk
                            .iter()
                            .map(|path| self.fingerprint_member(path, bucket.size, &token))
                    })
                    .collect::<Vec<_>>()
            })
        }));
        let Ok(results) = outcome else {
            token.cancel();
            return Err(BucketError::WorkerPanicked { size: bucket.size });
        };

        let mut fingerprints = Vec::with_capacity(results.len());
        let mut interrupted = false;
        for result in results {
            match result {
                Ok(fp) => fingerprints.push(fp),
                Err(FingerprintError::Cancelled(_)) => interrupted = true,
                Err(e) => return Err(e.into()),
            }
        }
        if interrupted || cancel.is_cancelled() {
            return Err(BucketError::Cancelled);
        }

        Ok(group_by_fingerprint(bucket, fingerprints))
    }

    /// Fingerprint one member, cancelling the bucket on failure.
    fn fingerprint_member(
        &self,
        path: &Path,
        size: u64,
        token: &CancelToken,
    ) -> Result<Fingerprint, FingerprintError> {
        let result = self.fingerprinter.fingerprint_cancellable(path, token);
        match result {
            Ok(_) => {
                let current = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref cb) = self.progress {
                    cb.on_progress(current, &path.to_string_lossy());
                    cb.on_item_completed(size);
                }
            }
            Err(FingerprintError::Cancelled(_)) => {}
            Err(ref e) => {
                log::debug!("Cancelling bucket of {} bytes: {}", size, e);
                token.cancel();
            }
        }
        result
    }
}

/// Group members by fingerprint, keeping bucket order, dropping singletons.
fn group_by_fingerprint(bucket: &SizeBucket, fingerprints: Vec<Fingerprint>) -> Vec<CandidateSet> {
    let mut sets: Vec<CandidateSet> = Vec::new();
    let mut index: HashMap<Fingerprint, usize> = HashMap::new();

    for (path, fp) in bucket.paths.iter().zip(fingerprints) {
        match index.get(&fp) {
            Some(&i) => sets[i].paths.push(path.clone()),
            None => {
                index.insert(fp.clone(), sets.len());
                sets.push(CandidateSet {
                    fingerprint: fp,
                    size: bucket.size,
                    paths: vec![path.clone()],
                });
            }
        }
    }

    sets.retain(|set| set.len() >= 2);
    sets
}

/// Fingerprint one bucket with up to `workers` threads.
///
/// Convenience wrapper over [`BucketProcessor::process`] that builds a
/// single-use pool.
///
/// # Errors
///
/// See [`BucketError`].
pub fn process_bucket(
    bucket: &SizeBucket,
    fingerprinter: &Fingerprinter,
    workers: usize,
    cancel: &CancelToken,
) -> Result<Vec<CandidateSet>, BucketError> {
    BucketProcessor::new(fingerprinter.clone(), workers, 1)?.process(bucket, cancel)
}
