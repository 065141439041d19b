//! Cached scan records and their validity signature.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::duplicates::DuplicateGroup;

/// Cheap fingerprint of a root directory's state.
///
/// Captures the root's modification time and its direct entry count. Changes
/// deeper in the tree that do not touch the root are not noticed, so a cached
/// result is a hint, and the merge engine still re-checks every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSignature {
    /// Modification time of the root directory
    pub root_modified: SystemTime,
    /// Number of direct entries in the root directory
    pub entry_count: usize,
}

impl ScanSignature {
    /// Read the current signature of `root`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from reading the root's metadata or listing.
    pub fn capture(root: &Path) -> std::io::Result<Self> {
        let root_modified = std::fs::metadata(root)?.modified()?;
        let entry_count = std::fs::read_dir(root)?.count();
        Ok(Self {
            root_modified,
            entry_count,
        })
    }
}

/// Groups remembered for one root.
#[derive(Debug, Clone)]
pub struct CachedScan {
    /// Signature of the root when the groups were computed
    pub signature: ScanSignature,
    /// Duplicate groups found by that scan
    pub groups: Vec<DuplicateGroup>,
    /// When the entry was stored
    pub cached_at: DateTime<Utc>,
}

impl CachedScan {
    /// Record groups for a signature, stamped now.
    #[must_use]
    pub fn new(signature: ScanSignature, groups: Vec<DuplicateGroup>) -> Self {
        Self {
            signature,
            groups,
            cached_at: Utc::now(),
        }
    }

    /// Age of the entry.
    #[must_use]
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.cached_at)
    }
}
