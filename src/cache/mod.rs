//! In-memory scan cache owned by the caller.
//!
//! A [`ScanCache`] remembers the duplicate groups found under each root so a
//! repeated scan of an unchanged tree can skip the walk and the hashing. The
//! cache is a plain value: nothing is written to disk and nothing is shared
//! between processes.
//!
//! # Cache Invalidation
//!
//! Entries are keyed by the canonical root path and validated against a
//! [`ScanSignature`]:
//! * Root directory modification time
//! * Number of direct entries in the root
//!
//! An optional maximum age expires entries regardless of the signature.

pub mod entry;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use entry::{CachedScan, ScanSignature};

use crate::duplicates::DuplicateGroup;

/// Caller-owned map from scan root to its last result.
#[derive(Debug, Clone, Default)]
pub struct ScanCache {
    entries: HashMap<PathBuf, CachedScan>,
    max_age: Option<Duration>,
}

impl ScanCache {
    /// Create an empty cache with no age limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire entries older than `max_age`.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    fn key(root: &Path) -> PathBuf {
        root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
    }

    fn is_fresh(&self, cached: &CachedScan) -> bool {
        match self.max_age {
            Some(max_age) => cached
                .age()
                .to_std()
                .map_or(true, |age| age <= max_age),
            None => true,
        }
    }

    /// Groups cached for `root`, if the signature still matches and the entry
    /// has not expired.
    #[must_use]
    pub fn get(&self, root: &Path, signature: &ScanSignature) -> Option<&[DuplicateGroup]> {
        let cached = self.entries.get(&Self::key(root))?;
        if cached.signature != *signature {
            log::debug!("Cache stale for {}: root changed", root.display());
            return None;
        }
        if !self.is_fresh(cached) {
            log::debug!("Cache expired for {}", root.display());
            return None;
        }
        Some(&cached.groups)
    }

    /// Store the groups found under `root`.
    pub fn insert(&mut self, root: &Path, signature: ScanSignature, groups: Vec<DuplicateGroup>) {
        self.entries
            .insert(Self::key(root), CachedScan::new(signature, groups));
    }

    /// Forget `root`, returning whether it was cached.
    pub fn invalidate(&mut self, root: &Path) -> bool {
        self.entries.remove(&Self::key(root)).is_some()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached roots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
