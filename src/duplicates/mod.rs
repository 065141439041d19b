//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size bucketing
//! - Fingerprint grouping and classification
//! - Pipeline orchestration with cancellation

pub mod finder;
pub mod groups;

pub use finder::{DuplicateFinder, FinderConfig, RootProblem, ScanError, ScanSummary};
pub use groups::{
    bucket_by_size, group_bucket, BucketStats, Classification, DuplicateGroup, SizeBucket,
};
