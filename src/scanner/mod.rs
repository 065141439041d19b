//! Scanner module for directory traversal and content fingerprinting.
//!
//! This module provides functionality for:
//! - Parallel directory walking using jwalk
//! - Content fingerprinting with BLAKE3 (full or bounded-prefix)
//! - Hardlink detection via (device, inode) identity
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and candidate discovery
//! - [`hasher`]: BLAKE3 fingerprints with a large-file prefix policy
//! - [`identity`]: Filesystem object identity tracking
//!
//! # Example
//!
//! ```no_run
//! use dupmerge::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     min_size: Some(1024),
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod identity;
pub mod walker;

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub use hasher::{
    hash_to_hex, hex_to_hash, Fingerprint, FingerprintScope, Hash, Hasher, LARGE_FILE_THRESHOLD,
    PREFIX_BYTES,
};
pub use identity::{same_object, IdentityTracker};
pub use walker::Walker;

/// Default recursion ceiling for the walker.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Names that are never scanned, compared case-insensitively.
///
/// Directories with these names are pruned together with their contents.
pub const RESERVED_NAMES: &[&str] = &[
    "system volume information",
    "$recycle.bin",
    "lost+found",
    ".trashes",
    ".spotlight-v100",
    ".fseventsd",
    "desktop.ini",
    "thumbs.db",
];

/// Snapshot of a candidate file taken at scan time.
///
/// The snapshot is not refreshed; the merge engine re-checks the file on disk
/// before acting on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Creation time, or the modification time where the platform has none
    pub created: SystemTime,
    /// Last modification time
    pub modified: SystemTime,
    /// Whether this entry was reached through a symbolic link
    pub is_symlink: bool,
}

impl FileEntry {
    /// Create a new FileEntry.
    ///
    /// The creation time defaults to `modified`; use
    /// [`with_created`](Self::with_created) to set it explicitly.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            created: modified,
            modified,
            is_symlink: false,
        }
    }

    /// Set the creation time.
    #[must_use]
    pub fn with_created(mut self, created: SystemTime) -> Self {
        self.created = created;
        self
    }

    /// Build an entry from already-fetched metadata.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata, is_symlink: bool) -> Self {
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created = metadata.created().unwrap_or(modified);
        Self {
            path,
            size: metadata.len(),
            created,
            modified,
            is_symlink,
        }
    }

    /// Snapshot a file that exists on disk right now.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from reading the file metadata.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(Self::from_metadata(
            path.to_path_buf(),
            &metadata,
            metadata.file_type().is_symlink(),
        ))
    }
}

/// Configuration for directory walking.
///
/// Controls filtering, depth, symlink handling, and parallelism.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Maximum recursion depth below the root.
    pub max_depth: usize,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (gitignore-style).
    /// These are applied in addition to a `.gitignore` at the root.
    pub ignore_patterns: Vec<String>,

    /// Absolute paths pruned from the walk.
    pub exclude_paths: Vec<PathBuf>,

    /// Number of threads reading directories in parallel.
    pub threads: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            skip_hidden: true,
            max_depth: DEFAULT_MAX_DEPTH,
            min_size: None,
            max_size: None,
            ignore_patterns: Vec::new(),
            exclude_paths: Vec::new(),
            threads: 4,
        }
    }
}

impl WalkerConfig {
    /// Set the recursion ceiling.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set whether hidden entries are skipped.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Set whether symlinked files and directories are followed.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set the size range filters.
    #[must_use]
    pub fn with_size_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    /// Set gitignore-style ignore patterns.
    #[must_use]
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set absolute paths pruned from the walk.
    #[must_use]
    pub fn with_exclude_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.exclude_paths = paths;
        self
    }

    /// Set the number of directory reader threads (at least 1).
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }
}

/// Errors that can occur while walking a directory tree.
///
/// These are recovered locally: the offending entry is skipped and the
/// walk continues.
#[derive(thiserror::Error, Debug)]
pub enum TraversalError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// The entry vanished between listing and stat.
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A symbolic link loop was detected.
    #[error("Filesystem loop at {}", .0.display())]
    Loop(PathBuf),

    /// An I/O error occurred while accessing an entry.
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl TraversalError {
    /// Classify an I/O error for the given path.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::Loop(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}

/// Errors that can occur while fingerprinting a file.
///
/// A file that fails is dropped from its size bucket; its siblings are
/// still fingerprinted.
#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    /// The file was not found.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl FingerprintError {
    /// Classify an I/O error for the given path.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
