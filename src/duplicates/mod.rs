//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Bounded, fault-isolated fingerprinting of size buckets ([`bucket`])
//! - Byte-exact verification of fingerprint matches ([`partition`])
//! - Candidate sets and verified duplicate groups ([`groups`])
//! - The streaming pipeline that ties them together ([`finder`])

pub mod bucket;
pub mod finder;
pub mod groups;
pub mod partition;

pub use bucket::{process_bucket, BucketError, BucketProcessor};
pub use finder::{DuplicateFinder, FinderConfig, FinderError, GroupStream, ScanSummary};
pub use groups::{CandidateSet, DuplicateGroup};
pub use partition::{CompareError, Partitioner};
