//! File removal backends.
//!
//! # Overview
//!
//! The merge engine never calls `std::fs` or the trash directly. It goes
//! through a [`FileRemover`], which deletes a path only if it still exists:
//!
//! - [`PermanentRemover`]: `std::fs::remove_file`, not recoverable
//! - [`TrashRemover`]: moves the file to the system trash via the `trash` crate
//!
//! [`FileSnapshot`] captures a file's current size and modification time so
//! the engine can refuse to delete something that changed after the scan.
//!
//! # Example
//!
//! ```no_run
//! use dupmerge::actions::delete::{FileRemover, Removal, TrashRemover};
//! use std::path::Path;
//!
//! match TrashRemover.remove_if_exists(Path::new("/path/to/duplicate.txt")) {
//!     Ok(Removal::Removed) => println!("moved to trash"),
//!     Ok(Removal::Absent) => println!("already gone"),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// File was modified since scan.
    #[error("file modified since scan: {}", .0.display())]
    Modified(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {}: {message}", path.display())]
    TrashFailed {
        /// File that could not be trashed
        path: PathBuf,
        /// Message from the trash backend
        message: String,
    },

    /// General I/O error.
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        /// File being removed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
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

    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// What a removal call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The file existed and was removed.
    Removed,
    /// Nothing was at the path.
    Absent,
}

/// Deletes a file if, and only if, it still exists.
pub trait FileRemover: Send + Sync {
    /// Remove `path`, reporting [`Removal::Absent`] when nothing is there.
    ///
    /// # Errors
    ///
    /// Returns [`DeleteError`] if the file exists but could not be removed.
    fn remove_if_exists(&self, path: &Path) -> Result<Removal, DeleteError>;

    /// Whether removals are unrecoverable.
    fn is_permanent(&self) -> bool;
}

/// Unrecoverable deletion via `std::fs::remove_file`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermanentRemover;

impl FileRemover for PermanentRemover {
    fn remove_if_exists(&self, path: &Path) -> Result<Removal, DeleteError> {
        match fs::remove_file(path) {
            Ok(()) => {
                log::info!("Permanently deleted: {}", path.display());
                Ok(Removal::Removed)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Removal::Absent),
            Err(e) => {
                log::error!("Permanent delete failed for {}: {}", path.display(), e);
                Err(DeleteError::from_io(path, e))
            }
        }
    }

    fn is_permanent(&self) -> bool {
        true
    }
}

/// Recoverable deletion via the system trash.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrashRemover;

impl FileRemover for TrashRemover {
    fn remove_if_exists(&self, path: &Path) -> Result<Removal, DeleteError> {
        match fs::symlink_metadata(path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Removal::Absent),
            Err(e) => return Err(DeleteError::from_io(path, e)),
        }

        trash::delete(path).map_err(|e| {
            log::error!("Trash operation failed for {}: {}", path.display(), e);
            DeleteError::TrashFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        log::info!("Moved to trash: {}", path.display());
        Ok(Removal::Removed)
    }

    fn is_permanent(&self) -> bool {
        false
    }
}

/// File metadata snapshot for change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
}

impl FileSnapshot {
    /// Capture a file's current state.
    ///
    /// # Errors
    ///
    /// Returns [`DeleteError::NotFound`] if the file is gone, or another
    /// variant if it cannot be inspected.
    pub fn capture(path: &Path) -> Result<Self, DeleteError> {
        let metadata = fs::metadata(path).map_err(|e| DeleteError::from_io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }

    /// Check this (current) snapshot against what the scan recorded.
    ///
    /// # Errors
    ///
    /// Returns [`DeleteError::Modified`] if the size or the modification
    /// time differs.
    pub fn matches(&self, size: u64, mtime: SystemTime) -> Result<(), DeleteError> {
        if self.size != size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                self.path.display(),
                size,
                self.size
            );
            return Err(DeleteError::Modified(self.path.clone()));
        }

        if let Some(current) = self.mtime {
            if current != mtime {
                log::warn!(
                    "File modified since scan: {} (mtime changed)",
                    self.path.display()
                );
                return Err(DeleteError::Modified(self.path.clone()));
            }
        }

        Ok(())
    }
}
