//! dupmerge - duplicate file detection and merge engine
//!
//! Finds files with identical content under a directory tree and removes all
//! but one copy of each, according to a survivor policy.
//!
//! Detection runs in stages so that most files are never read:
//!
//! 1. Walk the tree, collecting regular files (bounded depth, hardlinks once)
//! 2. Bucket by exact size; unique sizes cannot have duplicates
//! 3. Fingerprint bucket members with BLAKE3 on a bounded thread pool.
//!    Files of 1 MiB or more are hashed over their first 8 KiB only and
//!    their groups are classified [`Classification::Potential`].
//! 4. Group members by fingerprint
//!
//! ```no_run
//! use dupmerge::{merge, scan, MergeStrategy};
//! use std::path::Path;
//!
//! let groups = scan(Path::new("/data/photos"))?;
//! let result = merge(&groups, MergeStrategy::KeepOldest);
//! println!("{}", result.summary());
//! # Ok::<(), dupmerge::ScanError>(())
//! ```
//!
//! [`DuplicateFinder`] and [`MergeEngine`] expose the knobs the two entry
//! points leave at their defaults: thread counts, filters, cancellation,
//! progress reporting, path protection and trash-backed removal.

pub mod actions;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::path::Path;

pub use actions::{MergeEngine, MergeOutcome, MergeResult, MergeStrategy, OutcomeStatus};
pub use app::run_app;
pub use duplicates::{Classification, DuplicateFinder, DuplicateGroup, ScanError};
pub use scanner::{FileEntry, Fingerprint, FingerprintScope};

/// Find every duplicate group under `root` with default settings.
///
/// Groups are sorted by reclaimable bytes, largest first.
///
/// # Errors
///
/// Returns [`ScanError::InvalidRoot`] if `root` does not exist or is not a
/// directory. Unreadable entries below the root are skipped.
pub fn scan(root: &Path) -> Result<Vec<DuplicateGroup>, ScanError> {
    DuplicateFinder::with_defaults()
        .scan(root)
        .map(|(groups, _summary)| groups)
}

/// Keep one member of each group and permanently delete the rest.
///
/// Potential groups are verified against the survivor's full content first.
/// Per-file problems are recorded in the result, never raised.
#[must_use]
pub fn merge(groups: &[DuplicateGroup], strategy: MergeStrategy) -> MergeResult {
    MergeEngine::with_defaults().merge(groups, strategy)
}
