//! Filesystem object identity tracking.
//!
//! # Overview
//!
//! Two directory entries can name the same underlying file (hardlinks, or a
//! followed symlink pointing back into the tree). They share content but are
//! NOT duplicates: deleting one reclaims no space, and deleting the "survivor"
//! of such a pair would delete the only data. The walker uses an
//! [`IdentityTracker`] so every filesystem object is emitted at most once.
//!
//! # Platform Support
//!
//! - **Unix**: (device, inode) pairs from file metadata
//! - **Other**: no identity in [`Metadata`]; the tracker treats every entry as
//!   distinct and [`same_object`] can only recognise symlinks, by comparing
//!   canonical paths. Hardlinks there are reported as separate files.
//!
//! # Example
//!
//! ```no_run
//! use dupmerge::scanner::IdentityTracker;
//!
//! let mut tracker = IdentityTracker::new();
//! let meta = std::fs::metadata("file.txt").unwrap();
//! assert!(!tracker.seen_before(&meta));
//! assert!(tracker.seen_before(&meta));
//! ```

use std::collections::HashSet;
use std::fs::Metadata;
use std::io;
use std::path::Path;

/// Remembers which filesystem objects have been emitted.
///
/// Not thread-safe; the walker owns one per walk.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    seen: HashSet<ObjectId>,
}

impl IdentityTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the object behind `metadata`, reporting whether it was already seen.
    ///
    /// Always returns `false` where the platform exposes no identity.
    pub fn seen_before(&mut self, metadata: &Metadata) -> bool {
        match ObjectId::from_metadata(metadata) {
            Some(id) => !self.seen.insert(id),
            None => false,
        }
    }

    /// Number of distinct objects recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Whether identity tracking works on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ObjectId {
    dev: u64,
    ino: u64,
}

impl ObjectId {
    #[cfg(unix)]
    fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

/// Whether two paths name the same filesystem object.
///
/// Symlinks are resolved; on Unix hardlinks are recognised as well.
///
/// # Errors
///
/// Returns the I/O error when either path cannot be resolved.
pub fn same_object(a: &Path, b: &Path) -> io::Result<bool> {
    if a.canonicalize()? == b.canonicalize()? {
        return Ok(true);
    }
    let ids = (
        ObjectId::from_metadata(&std::fs::metadata(a)?),
        ObjectId::from_metadata(&std::fs::metadata(b)?),
    );
    Ok(matches!(ids, (Some(x), Some(y)) if x == y))
}
