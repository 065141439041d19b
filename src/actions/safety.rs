//! Path safety checks consulted before every deletion.
//!
//! # Overview
//!
//! A [`PathGuard`] refuses deletions that no duplicate cleanup should ever
//! make, whatever the scan found:
//!
//! - Paths under a protected root (operating-system directories by default)
//! - Paths outside the allow list, when one is configured
//! - Files with a critical executable/driver extension, when enabled
//!
//! Paths are compared component-wise after NFC normalization, so a macOS
//! NFD path matches its NFC spelling. On Windows the comparison also ignores
//! case.
//!
//! # Example
//!
//! ```
//! use dupmerge::actions::PathGuard;
//! use std::path::Path;
//!
//! let guard = PathGuard::default();
//! # #[cfg(unix)]
//! assert!(guard.check(Path::new("/etc/hosts")).is_err());
//! ```

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

/// Extensions protected when critical-file protection is on.
pub const CRITICAL_EXTENSIONS: &[&str] = &["sys", "dll", "exe", "drv", "ocx"];

#[cfg(windows)]
const DEFAULT_PROTECTED_ROOTS: &[&str] = &[
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
    "C:\\$Recycle.Bin",
];

#[cfg(not(windows))]
const DEFAULT_PROTECTED_ROOTS: &[&str] = &[
    "/bin", "/boot", "/etc", "/lib", "/lib64", "/sbin", "/usr", "/System",
];

/// Why a path may not be deleted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardViolation {
    /// The path is inside a protected root.
    #[error("{} is inside protected path {}", path.display(), root.display())]
    ProtectedRoot {
        /// Rejected path
        path: PathBuf,
        /// Protected root containing it
        root: PathBuf,
    },

    /// An allow list is configured and the path is not under any entry.
    #[error("{} is outside the allowed paths", .0.display())]
    OutsideAllowedRoots(PathBuf),

    /// The file has a critical extension.
    #[error("{} has protected extension .{extension}", path.display())]
    CriticalExtension {
        /// Rejected path
        path: PathBuf,
        /// Lowercased extension
        extension: String,
    },
}

/// Deny/allow policy for deletion targets.
#[derive(Debug, Clone)]
pub struct PathGuard {
    protected_roots: Vec<PathBuf>,
    allowed_roots: Vec<PathBuf>,
    protect_critical_extensions: bool,
}

impl Default for PathGuard {
    fn default() -> Self {
        Self {
            protected_roots: DEFAULT_PROTECTED_ROOTS.iter().map(PathBuf::from).collect(),
            allowed_roots: Vec::new(),
            protect_critical_extensions: true,
        }
    }
}

impl PathGuard {
    /// Guard with the platform's protected roots and critical extensions on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard that allows everything.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            protected_roots: Vec::new(),
            allowed_roots: Vec::new(),
            protect_critical_extensions: false,
        }
    }

    /// Add protected roots on top of the current ones.
    #[must_use]
    pub fn with_protected_roots(mut self, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        self.protected_roots.extend(roots);
        self
    }

    /// Restrict deletions to paths under these roots. Empty means unrestricted.
    #[must_use]
    pub fn with_allowed_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.allowed_roots = roots;
        self
    }

    /// Turn critical-extension protection on or off.
    #[must_use]
    pub fn with_critical_extensions(mut self, enabled: bool) -> Self {
        self.protect_critical_extensions = enabled;
        self
    }

    /// Protected roots in effect.
    #[must_use]
    pub fn protected_roots(&self) -> &[PathBuf] {
        &self.protected_roots
    }

    /// Check whether `path` may be deleted.
    ///
    /// # Errors
    ///
    /// Returns the first [`GuardViolation`] that applies.
    pub fn check(&self, path: &Path) -> Result<(), GuardViolation> {
        let key = comparison_key(path);

        if let Some(root) = self
            .protected_roots
            .iter()
            .find(|root| key.starts_with(comparison_key(root)))
        {
            return Err(GuardViolation::ProtectedRoot {
                path: path.to_path_buf(),
                root: root.clone(),
            });
        }

        if !self.allowed_roots.is_empty()
            && !self
                .allowed_roots
                .iter()
                .any(|root| key.starts_with(comparison_key(root)))
        {
            return Err(GuardViolation::OutsideAllowedRoots(path.to_path_buf()));
        }

        if self.protect_critical_extensions {
            if let Some(ext) = path.extension() {
                let extension = ext.to_string_lossy().to_lowercase();
                if CRITICAL_EXTENSIONS.contains(&extension.as_str()) {
                    return Err(GuardViolation::CriticalExtension {
                        path: path.to_path_buf(),
                        extension,
                    });
                }
            }
        }

        Ok(())
    }

    /// Whether `path` may be deleted.
    #[must_use]
    pub fn is_allowed(&self, path: &Path) -> bool {
        self.check(path).is_ok()
    }
}

/// NFC-normalized path, lowercased where the filesystem ignores case.
///
/// On Windows the verbatim prefix `canonicalize` adds is dropped, so
/// `\\?\C:\Windows` and `C:\Windows` compare equal.
fn comparison_key(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };
    let normalized: String = s.nfc().collect();
    if cfg!(windows) {
        PathBuf::from(strip_verbatim(&normalized).to_lowercase())
    } else {
        PathBuf::from(normalized)
    }
}

/// `\\?\C:\x` becomes `C:\x` and `\\?\UNC\server\share` becomes `\\server\share`.
///
/// Other verbatim forms (volume GUIDs, devices) have no plain spelling and are kept.
fn strip_verbatim(path: &str) -> Cow<'_, str> {
    if let Some(rest) = path.strip_prefix(r"\\?\UNC\") {
        return Cow::Owned(format!(r"\\{rest}"));
    }
    match path.strip_prefix(r"\\?\") {
        Some(rest) if rest.as_bytes().get(1) == Some(&b':') => Cow::Borrowed(rest),
        _ => Cow::Borrowed(path),
    }
}
