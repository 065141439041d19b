//! Size buckets and duplicate groups.
//!
//! # Overview
//!
//! Detection works in two steps on top of the walker's output:
//!
//! 1. [`bucket_by_size`] groups files by exact byte size in one pass and
//!    drops every size seen only once. Files of different sizes cannot be
//!    duplicates, so no content is read for them.
//! 2. [`group_bucket`] takes one bucket's fingerprints and partitions them by
//!    digest. Partitions with two or more members become [`DuplicateGroup`]s.
//!
//! # Example
//!
//! ```
//! use dupmerge::scanner::FileEntry;
//! use dupmerge::duplicates::bucket_by_size;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let files = vec![
//!     FileEntry::new(PathBuf::from("/a.txt"), 100, SystemTime::now()),
//!     FileEntry::new(PathBuf::from("/b.txt"), 100, SystemTime::now()),
//!     FileEntry::new(PathBuf::from("/c.txt"), 200, SystemTime::now()),
//! ];
//!
//! let (buckets, stats) = bucket_by_size(files);
//! assert_eq!(buckets.len(), 1);
//! assert_eq!(buckets[0].size, 100);
//! assert_eq!(stats.eliminated_unique, 1);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scanner::{hash_to_hex, FileEntry, Fingerprint, FingerprintScope};

/// Files sharing one exact byte size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeBucket {
    /// Size shared by every member
    pub size: u64,
    /// Files with this size
    pub members: Vec<FileEntry>,
}

impl SizeBucket {
    /// Create a bucket from its members.
    #[must_use]
    pub fn new(size: u64, members: Vec<FileEntry>) -> Self {
        Self { size, members }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the bucket has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Upper bound on what this bucket could reclaim.
    #[must_use]
    pub fn potential_savings(&self) -> u64 {
        self.size * (self.members.len() as u64).saturating_sub(1)
    }
}

/// Statistics from the size bucketing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketStats {
    /// Files fed into the pass
    pub total_files: usize,
    /// Combined size of those files
    pub total_size: u64,
    /// Distinct non-zero sizes seen
    pub unique_sizes: usize,
    /// Files left in buckets of two or more
    pub candidate_files: usize,
    /// Files dropped because their size was unique
    pub eliminated_unique: usize,
    /// Zero-byte files dropped
    pub empty_files: usize,
    /// Buckets kept
    pub buckets: usize,
}

impl BucketStats {
    /// Percentage of files eliminated by size alone.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by exact size, keeping only sizes shared by two or more files.
///
/// Zero-byte files are dropped. Buckets are returned largest size first,
/// so the most reclaimable work is scheduled early.
#[must_use]
pub fn bucket_by_size(
    files: impl IntoIterator<Item = FileEntry>,
) -> (Vec<SizeBucket>, BucketStats) {
    let mut by_size: HashMap<u64, Vec<FileEntry>> = HashMap::new();
    let mut stats = BucketStats::default();

    for file in files {
        stats.total_files += 1;
        stats.total_size += file.size;

        if file.size == 0 {
            stats.empty_files += 1;
            log::trace!("Dropping empty file: {}", file.path.display());
            continue;
        }

        by_size.entry(file.size).or_default().push(file);
    }

    stats.unique_sizes = by_size.len();

    let mut buckets: Vec<SizeBucket> = by_size
        .into_iter()
        .filter_map(|(size, members)| {
            if members.len() < 2 {
                stats.eliminated_unique += members.len();
                None
            } else {
                stats.candidate_files += members.len();
                log::trace!("Size bucket {} bytes: {} candidates", size, members.len());
                Some(SizeBucket::new(size, members))
            }
        })
        .collect();

    buckets.sort_unstable_by(|a, b| b.size.cmp(&a.size));
    stats.buckets = buckets.len();

    log::info!(
        "Size pass: {} files -> {} candidates in {} buckets ({:.1}% eliminated)",
        stats.total_files,
        stats.candidate_files,
        stats.buckets,
        stats.elimination_rate()
    );

    (buckets, stats)
}

/// Confidence that a group's members are byte-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Whole-content digests match.
    ///
    /// This is not a byte-by-byte comparison: it relies on BLAKE3 collisions
    /// being practically impossible.
    Exact,
    /// Only a leading window matched. Members may differ after it.
    Potential,
}

impl Classification {
    /// Classification implied by a fingerprint scope.
    #[must_use]
    pub fn from_scope(scope: FingerprintScope) -> Self {
        match scope {
            FingerprintScope::Full => Self::Exact,
            FingerprintScope::PartialPrefix => Self::Potential,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Potential => write!(f, "potential"),
        }
    }
}

/// Two or more files sharing a size and a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Fingerprint shared by every member
    pub fingerprint: Fingerprint,
    /// Size shared by every member
    pub size: u64,
    /// Members, ordered by path
    pub files: Vec<FileEntry>,
    /// Exact or potential match
    pub classification: Classification,
}

impl DuplicateGroup {
    /// Create a group; the classification follows the fingerprint scope.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, size: u64, files: Vec<FileEntry>) -> Self {
        Self {
            fingerprint,
            size,
            files,
            classification: Classification::from_scope(fingerprint.scope),
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether the members matched over their whole content.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.classification == Classification::Exact
    }

    /// Bytes freed by keeping one member: `size * (len - 1)`.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Digest as hexadecimal string.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hash_to_hex(&self.fingerprint.digest)
    }

    /// Get just the paths of files in this group.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// Whether `path` is a member.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }
}

/// Partition one size bucket's fingerprinted members into duplicate groups.
///
/// Members whose digest is shared by no other member are dropped. Each
/// group's members are sorted by path and the groups by their first path.
#[must_use]
pub fn group_bucket(
    size: u64,
    fingerprinted: impl IntoIterator<Item = (FileEntry, Fingerprint)>,
) -> Vec<DuplicateGroup> {
    let mut partitions: HashMap<Fingerprint, Vec<FileEntry>> = HashMap::new();
    for (entry, fingerprint) in fingerprinted {
        debug_assert_eq!(
            entry.size, size,
            "File size {} doesn't match bucket size {}",
            entry.size, size
        );
        partitions.entry(fingerprint).or_default().push(entry);
    }

    let mut groups: Vec<DuplicateGroup> = partitions
        .into_iter()
        .filter(|(_, files)| files.len() >= 2)
        .map(|(fingerprint, mut files)| {
            files.sort_by(|a, b| a.path.cmp(&b.path));
            DuplicateGroup::new(fingerprint, size, files)
        })
        .collect();

    groups.sort_by(|a, b| a.files[0].path.cmp(&b.files[0].path));

    if !groups.is_empty() {
        log::debug!("Bucket {} bytes: {} duplicate group(s)", size, groups.len());
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn entry(path: &str, size: u64) -> FileEntry {
        FileEntry::new(PathBuf::from(path), size, SystemTime::now())
    }

    fn fp(byte: u8, scope: FingerprintScope) -> Fingerprint {
        Fingerprint::new([byte; 32], scope)
    }

    #[test]
    fn test_bucket_by_size_empty() {
        let (buckets, stats) = bucket_by_size(Vec::new());
        assert!(buckets.is_empty());
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.elimination_rate(), 0.0);
    }

    #[test]
    fn test_bucket_by_size_prunes_singletons() {
        let files = vec![
            entry("/a", 100),
            entry("/b", 100),
            entry("/c", 200),
            entry("/d", 300),
            entry("/e", 300),
            entry("/f", 300),
        ];

        let (buckets, stats) = bucket_by_size(files);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].size, 300);
        assert_eq!(buckets[0].len(), 3);
        assert_eq!(buckets[1].size, 100);
        assert_eq!(stats.total_files, 6);
        assert_eq!(stats.total_size, 1300);
        assert_eq!(stats.unique_sizes, 3);
        assert_eq!(stats.candidate_files, 5);
        assert_eq!(stats.eliminated_unique, 1);
        assert_eq!(stats.buckets, 2);
    }

    #[test]
    fn test_bucket_by_size_drops_empty_files() {
        let files = vec![entry("/a", 0), entry("/b", 0), entry("/c", 0)];
        let (buckets, stats) = bucket_by_size(files);

        assert!(buckets.is_empty());
        assert_eq!(stats.empty_files, 3);
    }

    #[test]
    fn test_bucket_potential_savings() {
        let bucket = SizeBucket::new(50, vec![entry("/a", 50), entry("/b", 50), entry("/c", 50)]);
        assert_eq!(bucket.potential_savings(), 100);
        assert_eq!(SizeBucket::new(50, Vec::new()).potential_savings(), 0);
    }

    #[test]
    fn test_group_bucket_partitions_by_digest() {
        let members = vec![
            (entry("/z", 10), fp(1, FingerprintScope::Full)),
            (entry("/a", 10), fp(1, FingerprintScope::Full)),
            (entry("/m", 10), fp(2, FingerprintScope::Full)),
            (entry("/n", 10), fp(2, FingerprintScope::Full)),
            (entry("/solo", 10), fp(3, FingerprintScope::Full)),
        ];

        let groups = group_bucket(10, members);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].paths(), vec![PathBuf::from("/a"), PathBuf::from("/z")]);
        assert_eq!(groups[1].paths(), vec![PathBuf::from("/m"), PathBuf::from("/n")]);
        assert!(groups.iter().all(|g| !g.contains(Path::new("/solo"))));
    }

    #[test]
    fn test_group_bucket_no_matches() {
        let members = vec![
            (entry("/a", 10), fp(1, FingerprintScope::Full)),
            (entry("/b", 10), fp(2, FingerprintScope::Full)),
        ];
        assert!(group_bucket(10, members).is_empty());
    }

    #[test]
    fn test_scope_separates_partitions() {
        // Same digest bytes but a different scope is not the same fingerprint.
        let members = vec![
            (entry("/a", 10), fp(1, FingerprintScope::Full)),
            (entry("/b", 10), fp(1, FingerprintScope::PartialPrefix)),
        ];
        assert!(group_bucket(10, members).is_empty());
    }

    #[test]
    fn test_classification_follows_scope() {
        let exact = DuplicateGroup::new(
            fp(1, FingerprintScope::Full),
            10,
            vec![entry("/a", 10), entry("/b", 10)],
        );
        assert_eq!(exact.classification, Classification::Exact);
        assert!(exact.is_exact());

        let potential = DuplicateGroup::new(
            fp(1, FingerprintScope::PartialPrefix),
            10,
            vec![entry("/a", 10), entry("/b", 10)],
        );
        assert_eq!(potential.classification, Classification::Potential);
        assert_eq!(potential.classification.to_string(), "potential");
    }

    #[test]
    fn test_reclaimable_bytes() {
        let group = DuplicateGroup::new(
            fp(1, FingerprintScope::Full),
            100,
            vec![entry("/a", 100), entry("/b", 100), entry("/c", 100)],
        );
        assert_eq!(group.len(), 3);
        assert_eq!(group.duplicate_count(), 2);
        assert_eq!(group.reclaimable_bytes(), 200);
        assert_eq!(group.digest_hex().len(), 64);
    }

    #[test]
    fn test_group_serializes() {
        let group = DuplicateGroup::new(
            fp(7, FingerprintScope::Full),
            4,
            vec![entry("/a", 4), entry("/b", 4)],
        );
        let json = serde_json::to_string(&group).unwrap();
        assert!(json.contains("\"classification\":\"exact\""));
        let back: DuplicateGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(back, group);
    }
}
