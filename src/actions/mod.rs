//! File actions module.
//!
//! This module provides functionality for:
//! - Survivor selection and duplicate removal ([`merge`])
//! - Removal backends: system trash or permanent ([`delete`])
//! - Path safety checks before every removal ([`safety`])
//!
//! ```no_run
//! use dupmerge::actions::{MergeEngine, MergeStrategy, PathGuard, TrashRemover};
//!
//! let engine = MergeEngine::new(Box::new(TrashRemover)).with_guard(PathGuard::default());
//! let result = engine.merge(&[], MergeStrategy::KeepNewest);
//! assert_eq!(result.deleted_count, 0);
//! ```

pub mod delete;
pub mod merge;
pub mod safety;

pub use delete::{DeleteError, FileRemover, FileSnapshot, PermanentRemover, Removal, TrashRemover};
pub use merge::{
    select_survivor, GroupFailure, MergeConfig, MergeEngine, MergeError, MergeOutcome, MergePlan,
    MergeResult, MergeStrategy, OutcomeStatus, PotentialPolicy,
};
pub use safety::{GuardViolation, PathGuard, CRITICAL_EXTENSIONS};
