//! Scan pipeline orchestration.
//!
//! # Overview
//!
//! [`DuplicateFinder`] runs the whole detection pipeline:
//!
//! 1. **Walk** - collect candidate files under one or more roots
//! 2. **Bucket** - group them by exact size, dropping unique sizes
//! 3. **Fingerprint** - hash every bucket member on a bounded I/O pool
//! 4. **Group** - partition each bucket by fingerprint
//!
//! # Cancellation
//!
//! A shared shutdown flag is checked before each bucket starts. Buckets
//! already in flight finish; the rest are skipped. The scan still returns
//! `Ok` with the groups found so far and [`ScanSummary::interrupted`] set.
//!
//! # Example
//!
//! ```no_run
//! use dupmerge::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(4));
//! let (groups, summary) = finder.scan(Path::new("/some/path")).unwrap();
//!
//! println!("Found {} duplicate groups", groups.len());
//! println!("Reclaimable space: {}", summary.reclaimable_display());
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;

use super::groups::{bucket_by_size, group_bucket, Classification, DuplicateGroup, SizeBucket};
use crate::cache::{ScanCache, ScanSignature};
use crate::progress::{ProgressCallback, PHASE_FINGERPRINTING, PHASE_WALKING};
use crate::scanner::{
    FileEntry, FingerprintError, Hasher, IdentityTracker, TraversalError, Walker, WalkerConfig,
};

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of I/O threads for parallel fingerprinting.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Fingerprint policy.
    pub hasher: Hasher,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("walker_config", &self.walker_config)
            .field("hasher", &self.hasher)
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
            io_threads: 4,
            walker_config: WalkerConfig::default(),
            hasher: Hasher::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of fingerprinting threads (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the fingerprint policy.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = hasher;
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

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Candidate files returned by the walk
    pub total_files: usize,
    /// Combined size of those files
    pub total_bytes: u64,
    /// Files dropped because no other file had their size
    pub eliminated_by_size: usize,
    /// Files left in size buckets of two or more
    pub candidate_files: usize,
    /// Size buckets eligible for fingerprinting
    pub buckets_total: usize,
    /// Buckets fully fingerprinted and grouped
    pub buckets_processed: usize,
    /// Buckets never started because of cancellation
    pub buckets_skipped: usize,
    /// Files successfully fingerprinted
    pub fingerprinted_files: usize,
    /// Groups whose members matched over their whole content
    pub exact_groups: usize,
    /// Groups whose members matched only over a prefix
    pub potential_groups: usize,
    /// Duplicate copies across all groups (members minus one per group)
    pub duplicate_files: usize,
    /// Bytes freed by keeping one member of every group
    pub reclaimable_bytes: u64,
    /// Wall-clock duration of the scan
    pub scan_duration: Duration,
    /// Whether cancellation cut the scan short
    pub interrupted: bool,
    /// Whether the groups came from a [`ScanCache`]
    pub from_cache: bool,
    /// Entries skipped during the walk
    pub traversal_errors: Vec<TraversalError>,
    /// Files dropped from their bucket because they could not be read
    pub fingerprint_errors: Vec<FingerprintError>,
}

impl ScanSummary {
    /// Total number of groups.
    #[must_use]
    pub fn duplicate_groups(&self) -> usize {
        self.exact_groups + self.potential_groups
    }

    /// Number of errors recovered from during the scan.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.traversal_errors.len() + self.fingerprint_errors.len()
    }

    /// Whether any entry was skipped because of an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Percentage of scanned bytes taken up by duplicate copies.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            (self.reclaimable_bytes as f64 / self.total_bytes as f64) * 100.0
        }
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_bytes).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_bytes).to_string()
    }

    fn record_groups(&mut self, groups: &[DuplicateGroup]) {
        for group in groups {
            match group.classification {
                Classification::Exact => self.exact_groups += 1,
                Classification::Potential => self.potential_groups += 1,
            }
            self.duplicate_files += group.duplicate_count();
            self.reclaimable_bytes += group.reclaimable_bytes();
        }
    }
}

/// Why a scan root was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RootProblem {
    /// Nothing exists at the path.
    #[error("path does not exist")]
    NotFound,
    /// The path exists but is not a directory.
    #[error("not a directory")]
    NotADirectory,
    /// The path could not be inspected.
    #[error("cannot be read: {0}")]
    Unreadable(String),
}

/// The only failure that aborts a scan.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// A root could not be scanned at all.
    #[error("Invalid scan root {}: {problem}", path.display())]
    InvalidRoot {
        /// Root as given by the caller
        path: PathBuf,
        /// What is wrong with it
        problem: RootProblem,
    },
}

enum BucketOutcome {
    Processed {
        groups: Vec<DuplicateGroup>,
        fingerprinted: usize,
        errors: Vec<FingerprintError>,
    },
    Skipped,
}

/// Duplicate finder that orchestrates the detection pipeline.
#[derive(Debug, Clone)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Finder configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Find all duplicate groups under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidRoot`] if the root is missing or is not a
    /// directory. Every other problem is recovered from and reported in the
    /// summary.
    pub fn scan(&self, root: &Path) -> Result<(Vec<DuplicateGroup>, ScanSummary), ScanError> {
        self.scan_paths(&[root.to_path_buf()])
    }

    /// Find duplicate groups across several roots in one pass.
    ///
    /// Files reachable from more than one root are considered once.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidRoot`] for the first root that fails
    /// validation; nothing is scanned in that case.
    pub fn scan_paths(
        &self,
        roots: &[PathBuf],
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), ScanError> {
        let start_time = Instant::now();

        let mut unique_roots: Vec<PathBuf> = Vec::with_capacity(roots.len());
        for root in roots {
            let canonical = validate_root(root)?;
            if !unique_roots.contains(&canonical) {
                unique_roots.push(canonical);
            }
        }

        log::info!("Scanning {} root(s)", unique_roots.len());
        let (files, traversal_errors) = self.walk_roots(&unique_roots);

        let (groups, mut summary) = self.scan_files(files);
        summary.traversal_errors = traversal_errors;
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} group(s), {} reclaimable in {:.2?}{}",
            groups.len(),
            summary.reclaimable_display(),
            summary.scan_duration,
            if summary.interrupted { " (interrupted)" } else { "" }
        );

        Ok((groups, summary))
    }

    /// Group an already-collected list of files.
    ///
    /// Runs the bucket, fingerprint and group steps without walking.
    #[must_use]
    pub fn scan_files(&self, files: Vec<FileEntry>) -> (Vec<DuplicateGroup>, ScanSummary) {
        let start_time = Instant::now();
        let mut summary = ScanSummary::default();

        let (buckets, stats) = bucket_by_size(files);
        summary.total_files = stats.total_files;
        summary.total_bytes = stats.total_size;
        summary.eliminated_by_size = stats.eliminated_unique + stats.empty_files;
        summary.candidate_files = stats.candidate_files;
        summary.buckets_total = buckets.len();

        let mut groups = self.fingerprint_buckets(buckets, &mut summary);
        groups.sort_by(|a, b| {
            b.reclaimable_bytes()
                .cmp(&a.reclaimable_bytes())
                .then_with(|| a.files[0].path.cmp(&b.files[0].path))
        });

        summary.record_groups(&groups);
        summary.interrupted = summary.interrupted || self.config.is_shutdown_requested();
        summary.scan_duration = start_time.elapsed();
        (groups, summary)
    }

    /// Scan `root`, reusing a cached result if the root looks unchanged.
    ///
    /// Interrupted scans are not cached.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidRoot`] as for [`scan`](Self::scan).
    pub fn scan_cached(
        &self,
        root: &Path,
        cache: &mut ScanCache,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), ScanError> {
        let canonical = validate_root(root)?;
        let signature = ScanSignature::capture(&canonical).map_err(|e| ScanError::InvalidRoot {
            path: root.to_path_buf(),
            problem: RootProblem::Unreadable(e.to_string()),
        })?;

        if let Some(groups) = cache.get(&canonical, &signature) {
            log::info!("Using cached scan for {}", canonical.display());
            let groups = groups.to_vec();
            let mut summary = ScanSummary {
                from_cache: true,
                ..ScanSummary::default()
            };
            summary.record_groups(&groups);
            return Ok((groups, summary));
        }

        let (groups, summary) = self.scan(&canonical)?;
        if !summary.interrupted {
            cache.insert(&canonical, signature, groups.clone());
        }
        Ok((groups, summary))
    }

    fn walk_roots(&self, roots: &[PathBuf]) -> (Vec<FileEntry>, Vec<TraversalError>) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_WALKING, 0);
        }

        // One identity set per scan, so a file linked from two roots is emitted once.
        let identities = Arc::new(Mutex::new(IdentityTracker::new()));
        let mut seen_paths: HashSet<PathBuf> = HashSet::new();
        let mut files = Vec::new();
        let mut errors = Vec::new();

        for root in roots {
            let mut walker = Walker::new(root, self.config.walker_config.clone())
                .with_identity_tracker(identities.clone());
            if let Some(ref flag) = self.config.shutdown_flag {
                walker = walker.with_shutdown_flag(flag.clone());
            }

            for result in walker.walk() {
                match result {
                    Ok(entry) => {
                        if !seen_paths.insert(entry.path.clone()) {
                            continue;
                        }
                        if let Some(ref callback) = self.config.progress_callback {
                            callback.on_progress(files.len() + 1, &entry.path.to_string_lossy());
                        }
                        files.push(entry);
                    }
                    Err(e) => errors.push(e),
                }
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_WALKING);
        }
        log::info!(
            "Walk complete: {} candidate file(s), {} error(s)",
            files.len(),
            errors.len()
        );

        (files, errors)
    }

    fn fingerprint_buckets(
        &self,
        buckets: Vec<SizeBucket>,
        summary: &mut ScanSummary,
    ) -> Vec<DuplicateGroup> {
        let total_members: usize = buckets.iter().map(SizeBucket::len).sum();
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_FINGERPRINTING, total_members);
        }

        let counter = AtomicUsize::new(0);
        let run = || -> Vec<BucketOutcome> {
            buckets
                .into_par_iter()
                .map(|bucket| self.process_bucket(bucket, &counter))
                .collect()
        };

        let outcomes = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads.max(1))
            .thread_name(|i| format!("dupmerge-io-{i}"))
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                log::warn!("Failed to create I/O thread pool, using global pool: {}", e);
                run()
            }
        };

        let mut groups = Vec::new();
        for outcome in outcomes {
            match outcome {
                BucketOutcome::Processed {
                    groups: bucket_groups,
                    fingerprinted,
                    errors,
                } => {
                    summary.buckets_processed += 1;
                    summary.fingerprinted_files += fingerprinted;
                    summary.fingerprint_errors.extend(errors);
                    groups.extend(bucket_groups);
                }
                BucketOutcome::Skipped => {
                    summary.buckets_skipped += 1;
                    summary.interrupted = true;
                }
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_FINGERPRINTING);
        }
        if summary.buckets_skipped > 0 {
            log::warn!(
                "Scan interrupted: {} of {} bucket(s) skipped",
                summary.buckets_skipped,
                summary.buckets_total
            );
        }

        groups
    }

    fn process_bucket(&self, bucket: SizeBucket, counter: &AtomicUsize) -> BucketOutcome {
        if self.config.is_shutdown_requested() {
            log::debug!("Skipping bucket of {} bytes: shutdown requested", bucket.size);
            return BucketOutcome::Skipped;
        }

        let size = bucket.size;
        let hasher = self.config.hasher;
        let results: Vec<Result<(FileEntry, _), FingerprintError>> = bucket
            .members
            .into_par_iter()
            .map(|entry| {
                let result = hasher.fingerprint(&entry);
                if let Some(ref callback) = self.config.progress_callback {
                    let current = counter.fetch_add(1, Ordering::Relaxed) + 1;
                    callback.on_progress(current, &entry.path.to_string_lossy());
                    callback.on_item_completed(entry.size);
                }
                result.map(|fp| (entry, fp))
            })
            .collect();

        let mut fingerprinted = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(pair) => fingerprinted.push(pair),
                Err(e) => {
                    log::warn!("Dropping file from bucket: {}", e);
                    errors.push(e);
                }
            }
        }

        let count = fingerprinted.len();
        let groups = group_bucket(size, fingerprinted);

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_bucket_complete(size, groups.len());
        }

        BucketOutcome::Processed {
            groups,
            fingerprinted: count,
            errors,
        }
    }
}

/// Check that `root` is an existing directory and return its canonical form.
fn validate_root(root: &Path) -> Result<PathBuf, ScanError> {
    let invalid = |problem| ScanError::InvalidRoot {
        path: root.to_path_buf(),
        problem,
    };

    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => invalid(RootProblem::NotFound),
        _ => invalid(RootProblem::Unreadable(e.to_string())),
    })?;
    if !metadata.is_dir() {
        return Err(invalid(RootProblem::NotADirectory));
    }

    root.canonicalize()
        .map_err(|e| invalid(RootProblem::Unreadable(e.to_string())))
}
