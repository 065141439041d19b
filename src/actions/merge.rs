//! Survivor selection and duplicate removal.
//!
//! # Overview
//!
//! [`MergeEngine::merge`] keeps exactly one member (the survivor) of every
//! [`DuplicateGroup`] and removes the rest through a [`FileRemover`]. It never
//! aborts the batch: each target gets a [`MergeOutcome`], each group that
//! cannot be processed gets a [`GroupFailure`], and everything is collected
//! into one [`MergeResult`].
//!
//! # Safety
//!
//! For every group, before anything is removed:
//! - The survivor must still exist and, with `verify_unchanged`, still match
//!   its scan snapshot. Otherwise the group is skipped.
//! - `Potential` groups follow the [`PotentialPolicy`]. The default
//!   (`Verify`) fully hashes each target and the survivor and only removes
//!   targets whose whole content matches.
//!
//! For every target:
//! - The [`PathGuard`] must allow it.
//! - It is re-checked on disk right before removal. A vanished file is
//!   reported as `AlreadyAbsent`, a changed one as `Failed`.
//!
//! # Example
//!
//! ```no_run
//! use dupmerge::actions::{MergeEngine, MergeStrategy};
//! use dupmerge::duplicates::DuplicateFinder;
//! use std::path::Path;
//!
//! let (groups, _) = DuplicateFinder::with_defaults().scan(Path::new(".")).unwrap();
//! let result = MergeEngine::with_defaults().merge(&groups, MergeStrategy::KeepOldest);
//! println!("{}", result.summary());
//! ```

use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};

use super::delete::{DeleteError, FileRemover, FileSnapshot, PermanentRemover, Removal};
use super::safety::PathGuard;
use crate::duplicates::{Classification, DuplicateGroup};
use crate::scanner::{same_object, FileEntry, Hash, Hasher};

/// Policy choosing which member of a group survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Keep the member with the earliest creation time.
    KeepOldest,
    /// Keep the member with the latest creation time.
    KeepNewest,
    /// Keep the first member in path order.
    KeepFirst,
    /// Keep the last member in path order.
    KeepLast,
    /// Keep the member at this index.
    ManualSurvivor(usize),
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeepOldest => write!(f, "keep-oldest"),
            Self::KeepNewest => write!(f, "keep-newest"),
            Self::KeepFirst => write!(f, "keep-first"),
            Self::KeepLast => write!(f, "keep-last"),
            Self::ManualSurvivor(i) => write!(f, "manual({i})"),
        }
    }
}

/// How to treat groups matched only over a prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotentialPolicy {
    /// Leave potential groups untouched.
    Skip,
    /// Remove only targets whose full content matches the survivor.
    #[default]
    Verify,
    /// Remove targets without further checks.
    Allow,
}

/// Merge engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Treatment of potential groups
    pub potential_policy: PotentialPolicy,
    /// Refuse to act on files whose size or mtime changed since the scan
    pub verify_unchanged: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            potential_policy: PotentialPolicy::Verify,
            verify_unchanged: true,
        }
    }
}

impl MergeConfig {
    /// Set the potential-group policy.
    #[must_use]
    pub fn with_potential_policy(mut self, policy: PotentialPolicy) -> Self {
        self.potential_policy = policy;
        self
    }

    /// Enable/disable change detection against the scan snapshot.
    #[must_use]
    pub fn with_verify_unchanged(mut self, verify: bool) -> Self {
        self.verify_unchanged = verify;
        self
    }
}

/// What happened to one removal target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The file was removed.
    Deleted,
    /// The file was already gone.
    AlreadyAbsent,
    /// The file was left in place.
    Failed(String),
}

/// Result for one removal target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Target path
    pub path: PathBuf,
    /// What happened
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// Bytes freed, non-zero only for `Deleted`
    pub reclaimed_bytes: u64,
}

impl MergeOutcome {
    fn deleted(path: &Path, bytes: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            status: OutcomeStatus::Deleted,
            reclaimed_bytes: bytes,
        }
    }

    fn absent(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            status: OutcomeStatus::AlreadyAbsent,
            reclaimed_bytes: 0,
        }
    }

    fn failed(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            status: OutcomeStatus::Failed(reason.into()),
            reclaimed_bytes: 0,
        }
    }
}

/// Why a whole group was left untouched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeError {
    /// A group needs at least two members.
    #[error("group has {count} member(s), at least 2 required")]
    TooFewMembers {
        /// Members present
        count: usize,
    },

    /// A manual survivor index does not exist.
    #[error("survivor index {index} out of range for group of {len}")]
    SurvivorOutOfRange {
        /// Requested index
        index: usize,
        /// Group size
        len: usize,
    },

    /// The survivor no longer exists.
    #[error("survivor {} no longer exists", path.display())]
    SurvivorMissing {
        /// Survivor path
        path: PathBuf,
    },

    /// The survivor changed since the scan.
    #[error("survivor {} was modified since scan", path.display())]
    SurvivorModified {
        /// Survivor path
        path: PathBuf,
    },

    /// The survivor could not be inspected or read.
    #[error("survivor {} is unreadable: {reason}", path.display())]
    SurvivorUnreadable {
        /// Survivor path
        path: PathBuf,
        /// Underlying error
        reason: String,
    },

    /// Potential groups are configured to be skipped.
    #[error("potential duplicate group skipped by policy")]
    PotentialSkipped,
}

/// A group the engine did not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFailure {
    /// Index of the group in the input slice
    pub group_index: usize,
    /// Hex digest of the group
    pub digest: String,
    /// What went wrong
    pub error: MergeError,
}

/// Aggregate result of one merge call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    /// Targets removed
    pub deleted_count: usize,
    /// Bytes freed by removed targets
    pub reclaimed_bytes: u64,
    /// One outcome per target of every processed group
    pub outcomes: Vec<MergeOutcome>,
    /// Survivor of every processed group
    pub survivors: Vec<PathBuf>,
    /// Groups left untouched
    pub group_errors: Vec<GroupFailure>,
}

impl MergeResult {
    /// Targets that were already gone.
    #[must_use]
    pub fn absent_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::AlreadyAbsent)
            .count()
    }

    /// Targets left in place because of an error.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Failed(_)))
            .count()
    }

    /// Whether every group was processed and no target failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.group_errors.is_empty() && self.failed_count() == 0
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Deleted {} file(s), freed {}",
            self.deleted_count,
            ByteSize::b(self.reclaimed_bytes)
        );
        let absent = self.absent_count();
        if absent > 0 {
            text.push_str(&format!(", {absent} already absent"));
        }
        let failed = self.failed_count();
        if failed > 0 {
            text.push_str(&format!(", {failed} failed"));
        }
        if !self.group_errors.is_empty() {
            text.push_str(&format!(", {} group(s) skipped", self.group_errors.len()));
        }
        text
    }

    fn record(&mut self, outcome: MergeOutcome) {
        if outcome.status == OutcomeStatus::Deleted {
            self.deleted_count += 1;
            self.reclaimed_bytes += outcome.reclaimed_bytes;
        }
        self.outcomes.push(outcome);
    }
}

/// Survivor and targets chosen for one group, without touching the disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePlan {
    /// Index of the group in the input slice
    pub group_index: usize,
    /// Member that will be kept
    pub survivor: PathBuf,
    /// Members that will be removed
    pub targets: Vec<PathBuf>,
    /// Bytes freed if every target is removed
    pub reclaimable_bytes: u64,
    /// Group classification
    pub classification: Classification,
}

/// Pick the survivor index for a group.
///
/// Ties on creation time go to the member that comes first in path order.
///
/// # Errors
///
/// Returns [`MergeError::TooFewMembers`] for groups under two members and
/// [`MergeError::SurvivorOutOfRange`] for a bad manual index.
pub fn select_survivor(group: &DuplicateGroup, strategy: MergeStrategy) -> Result<usize, MergeError> {
    let files = &group.files;
    if files.len() < 2 {
        return Err(MergeError::TooFewMembers { count: files.len() });
    }

    let pick = |better: fn(&FileEntry, &FileEntry) -> bool| {
        files
            .iter()
            .enumerate()
            .skip(1)
            .fold(0, |best, (i, f)| if better(f, &files[best]) { i } else { best })
    };

    match strategy {
        MergeStrategy::KeepOldest => Ok(pick(|a, b| a.created < b.created)),
        MergeStrategy::KeepNewest => Ok(pick(|a, b| a.created > b.created)),
        MergeStrategy::KeepFirst => Ok(0),
        MergeStrategy::KeepLast => Ok(files.len() - 1),
        MergeStrategy::ManualSurvivor(index) if index < files.len() => Ok(index),
        MergeStrategy::ManualSurvivor(index) => Err(MergeError::SurvivorOutOfRange {
            index,
            len: files.len(),
        }),
    }
}

/// Applies a [`MergeStrategy`] to duplicate groups.
pub struct MergeEngine {
    remover: Box<dyn FileRemover>,
    guard: PathGuard,
    hasher: Hasher,
    config: MergeConfig,
}

impl std::fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeEngine")
            .field("permanent", &self.remover.is_permanent())
            .field("guard", &self.guard)
            .field("hasher", &self.hasher)
            .field("config", &self.config)
            .finish()
    }
}

impl MergeEngine {
    /// Create an engine removing files through `remover`, with the default
    /// guard and config.
    #[must_use]
    pub fn new(remover: Box<dyn FileRemover>) -> Self {
        Self {
            remover,
            guard: PathGuard::default(),
            hasher: Hasher::default(),
            config: MergeConfig::default(),
        }
    }

    /// Engine with permanent removal and default safety settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Box::new(PermanentRemover))
    }

    /// Set the path guard.
    #[must_use]
    pub fn with_guard(mut self, guard: PathGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Set the engine config.
    #[must_use]
    pub fn with_config(mut self, config: MergeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the hasher used to verify potential groups.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Engine config.
    #[must_use]
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Whether removals are unrecoverable.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.remover.is_permanent()
    }

    /// Plan one group.
    ///
    /// # Errors
    ///
    /// Returns the [`MergeError`] that [`merge`](Self::merge) would record
    /// for this group before touching the disk.
    pub fn plan_group(
        &self,
        group_index: usize,
        group: &DuplicateGroup,
        strategy: MergeStrategy,
    ) -> Result<MergePlan, MergeError> {
        let survivor = select_survivor(group, strategy)?;
        if group.classification == Classification::Potential
            && self.config.potential_policy == PotentialPolicy::Skip
        {
            return Err(MergeError::PotentialSkipped);
        }

        let targets: Vec<PathBuf> = group
            .files
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != survivor)
            .map(|(_, f)| f.path.clone())
            .collect();

        Ok(MergePlan {
            group_index,
            survivor: group.files[survivor].path.clone(),
            reclaimable_bytes: group.size * targets.len() as u64,
            targets,
            classification: group.classification,
        })
    }

    /// Plan every group without touching the disk.
    ///
    /// Groups that cannot be planned are logged and left out.
    #[must_use]
    pub fn plan(&self, groups: &[DuplicateGroup], strategy: MergeStrategy) -> Vec<MergePlan> {
        groups
            .iter()
            .enumerate()
            .filter_map(|(i, group)| match self.plan_group(i, group, strategy) {
                Ok(plan) => Some(plan),
                Err(e) => {
                    log::warn!("Group {} ({}): {}", i, group.digest_hex(), e);
                    None
                }
            })
            .collect()
    }

    /// Keep one member of every group and remove the others.
    ///
    /// Never fails as a whole; problems are recorded per target and per group.
    #[must_use]
    pub fn merge(&self, groups: &[DuplicateGroup], strategy: MergeStrategy) -> MergeResult {
        log::info!(
            "Merging {} group(s) with strategy {} ({})",
            groups.len(),
            strategy,
            if self.is_permanent() { "permanent" } else { "trash" }
        );

        let mut result = MergeResult::default();
        for (index, group) in groups.iter().enumerate() {
            if let Err(error) = self.merge_group(index, group, strategy, &mut result) {
                log::warn!("Skipping group {} ({}): {}", index, group.digest_hex(), error);
                result.group_errors.push(GroupFailure {
                    group_index: index,
                    digest: group.digest_hex(),
                    error,
                });
            }
        }

        log::info!("Merge complete: {}", result.summary());
        result
    }

    fn merge_group(
        &self,
        index: usize,
        group: &DuplicateGroup,
        strategy: MergeStrategy,
        result: &mut MergeResult,
    ) -> Result<(), MergeError> {
        let plan = self.plan_group(index, group, strategy)?;
        let survivor_entry = group
            .files
            .iter()
            .find(|f| f.path == plan.survivor)
            .ok_or_else(|| MergeError::SurvivorMissing {
                path: plan.survivor.clone(),
            })?;

        self.check_survivor(survivor_entry)?;

        let survivor_hash = match (group.classification, self.config.potential_policy) {
            (Classification::Potential, PotentialPolicy::Verify) => Some(
                self.hasher
                    .full_hash(&plan.survivor)
                    .map_err(|e| MergeError::SurvivorUnreadable {
                        path: plan.survivor.clone(),
                        reason: e.to_string(),
                    })?,
            ),
            _ => None,
        };

        log::debug!(
            "Group {}: keeping {}, {} target(s)",
            index,
            plan.survivor.display(),
            plan.targets.len()
        );
        result.survivors.push(plan.survivor.clone());

        for target in group.files.iter().filter(|f| f.path != plan.survivor) {
            let outcome = self.remove_target(target, &plan.survivor, survivor_hash.as_ref());
            if let OutcomeStatus::Failed(ref reason) = outcome.status {
                log::warn!("Not removing {}: {}", target.path.display(), reason);
            }
            result.record(outcome);
        }

        // Members listed twice under the survivor's path are never removed.
        let repeats = group.files.iter().filter(|f| f.path == plan.survivor).count();
        for _ in 1..repeats {
            result.record(MergeOutcome::failed(&plan.survivor, "same path as survivor"));
        }

        Ok(())
    }

    fn check_survivor(&self, survivor: &FileEntry) -> Result<(), MergeError> {
        let snapshot = match FileSnapshot::capture(&survivor.path) {
            Ok(snapshot) => snapshot,
            Err(DeleteError::NotFound(path)) => return Err(MergeError::SurvivorMissing { path }),
            Err(e) => {
                return Err(MergeError::SurvivorUnreadable {
                    path: survivor.path.clone(),
                    reason: e.to_string(),
                })
            }
        };

        if self.config.verify_unchanged
            && snapshot.matches(survivor.size, survivor.modified).is_err()
        {
            return Err(MergeError::SurvivorModified {
                path: survivor.path.clone(),
            });
        }
        Ok(())
    }

    fn remove_target(
        &self,
        target: &FileEntry,
        survivor: &Path,
        survivor_hash: Option<&Hash>,
    ) -> MergeOutcome {
        let path = target.path.as_path();

        if let Err(violation) = self.guard.check(path) {
            return MergeOutcome::failed(path, violation.to_string());
        }

        let snapshot = match FileSnapshot::capture(path) {
            Ok(snapshot) => snapshot,
            Err(DeleteError::NotFound(_)) => {
                log::info!("Already absent: {}", path.display());
                return MergeOutcome::absent(path);
            }
            Err(e) => return MergeOutcome::failed(path, e.to_string()),
        };

        // A link to the survivor holds no separate copy; removing either end loses the data.
        match same_object(path, survivor) {
            Ok(false) => {}
            Ok(true) => return MergeOutcome::failed(path, "same file as survivor"),
            Err(e) => return MergeOutcome::failed(path, e.to_string()),
        }

        if self.config.verify_unchanged {
            if let Err(e) = snapshot.matches(target.size, target.modified) {
                return MergeOutcome::failed(path, e.to_string());
            }
        }

        if let Some(expected) = survivor_hash {
            match self.hasher.full_hash(path) {
                Ok(actual) if actual == *expected => {}
                Ok(_) => return MergeOutcome::failed(path, "content differs from survivor"),
                Err(e) => return MergeOutcome::failed(path, e.to_string()),
            }
        }

        match self.remover.remove_if_exists(path) {
            Ok(Removal::Removed) => MergeOutcome::deleted(path, snapshot.size),
            Ok(Removal::Absent) => MergeOutcome::absent(path),
            Err(e) => MergeOutcome::failed(path, e.to_string()),
        }
    }
}
