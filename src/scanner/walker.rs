//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! [`Walker`] enumerates candidate files under a root. Directory reads run on
//! a bounded rayon pool owned by jwalk; entries are yielded lazily in sorted
//! order.
//!
//! # Features
//!
//! - Depth ceiling (10 by default)
//! - Hidden entries and OS-reserved names pruned before descent
//! - Gitignore-style patterns and excluded paths, also pruned before descent
//! - Zero-byte files never emitted
//! - Hardlinks emitted once via [`IdentityTracker`]
//! - Per-entry failures yielded as [`TraversalError`] values
//! - Early stop via a shared cancellation flag
//!
//! # Example
//!
//! ```no_run
//! use dupmerge::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("{} candidates", files.len());
//! ```

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::{Parallelism, WalkDir};

use super::identity::IdentityTracker;
use super::{FileEntry, TraversalError, WalkerConfig, RESERVED_NAMES};

/// Directory walker for parallel file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for early termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Identity set shared with other walkers of the same scan
    identities: Option<Arc<Mutex<IdentityTracker>>>,
}

/// Pruning rules shared with jwalk's reader threads.
struct PruneRules {
    root: PathBuf,
    reserved: HashSet<String>,
    exclude_paths: Vec<PathBuf>,
    gitignore: Option<Gitignore>,
}

impl PruneRules {
    fn keeps(&self, path: &Path, name: &OsStr, is_dir: bool) -> bool {
        let lowered = name.to_string_lossy().to_lowercase();
        if self.reserved.contains(&lowered) {
            log::trace!("Pruning reserved entry: {}", path.display());
            return false;
        }
        if self.exclude_paths.iter().any(|p| path.starts_with(p)) {
            log::trace!("Pruning excluded path: {}", path.display());
            return false;
        }
        if let Some(gi) = &self.gitignore {
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if gi.matched(relative, is_dir).is_ignore() {
                log::trace!("Pruning ignored entry: {}", path.display());
                return false;
            }
        }
        true
    }
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
            identities: None,
        }
    }

    /// Set the shutdown flag for early termination.
    ///
    /// Once the flag is `true` the iterator ends at the next entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Share an identity tracker with other walkers.
    ///
    /// Walkers over several roots of one scan must share a tracker, otherwise a
    /// file reached through a hardlink or followed symlink under another root
    /// is emitted again. Without one, each walk starts with an empty tracker.
    #[must_use]
    pub fn with_identity_tracker(mut self, tracker: Arc<Mutex<IdentityTracker>>) -> Self {
        self.identities = Some(tracker);
        self
    }

    /// Root directory of this walk.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build gitignore matcher from config patterns and a root `.gitignore`.
    fn build_gitignore(&self) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(&self.root);

        let gitignore_path = self.root.join(".gitignore");
        if gitignore_path.is_file() {
            if let Some(e) = builder.add(&gitignore_path) {
                log::warn!(
                    "Failed to load .gitignore from {}: {}",
                    gitignore_path.display(),
                    e
                );
            } else {
                log::debug!("Loaded .gitignore from {}", gitignore_path.display());
            }
        }

        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    fn prune_rules(&self) -> Arc<PruneRules> {
        Arc::new(PruneRules {
            root: self.root.clone(),
            reserved: RESERVED_NAMES.iter().map(|n| (*n).to_string()).collect(),
            exclude_paths: self.config.exclude_paths.clone(),
            gitignore: self.build_gitignore(),
        })
    }

    fn passes_size_filter(&self, size: u64) -> bool {
        if self.config.min_size.is_some_and(|min| size < min) {
            return false;
        }
        if self.config.max_size.is_some_and(|max| size > max) {
            return false;
        }
        true
    }

    /// Walk the directory tree, yielding file entries.
    ///
    /// Errors are yielded as [`TraversalError`] values rather than stopping
    /// iteration. Each call starts a fresh walk from the root.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, TraversalError>> + '_ {
        let rules = self.prune_rules();
        let identities = self.identities.clone().unwrap_or_default();

        let walk_dir = WalkDir::new(&self.root)
            .max_depth(self.config.max_depth)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(self.config.skip_hidden)
            .parallelism(Parallelism::RayonNewPool(self.config.threads.max(1)))
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|child| match child {
                    Ok(entry) => {
                        rules.keeps(&entry.path(), &entry.file_name, entry.file_type.is_dir())
                    }
                    Err(_) => true,
                });
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name.cmp(&b.file_name),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir
            .into_iter()
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    if entry.depth == 0 || entry.file_type().is_dir() {
                        return None;
                    }
                    let path = entry.path();
                    let is_symlink = entry.path_is_symlink();
                    if is_symlink && !self.config.follow_symlinks {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }
                    self.stat_entry(path, is_symlink, &identities)
                }
                Err(e) => Some(Err(self.classify_walk_error(&e))),
            })
    }

    /// Stat a listed file and turn it into a candidate entry.
    fn stat_entry(
        &self,
        path: PathBuf,
        is_symlink: bool,
        identities: &Mutex<IdentityTracker>,
    ) -> Option<Result<FileEntry, TraversalError>> {
        let metadata = if self.config.follow_symlinks {
            std::fs::metadata(&path)
        } else {
            std::fs::symlink_metadata(&path)
        };
        let metadata = match metadata {
            Ok(m) => m,
            Err(e) => {
                let err = TraversalError::from_io(&path, e);
                log::warn!("Skipping entry: {}", err);
                return Some(Err(err));
            }
        };

        if !metadata.is_file() {
            return None;
        }

        let size = metadata.len();
        if size == 0 {
            log::trace!("Skipping empty file: {}", path.display());
            return None;
        }
        if !self.passes_size_filter(size) {
            log::trace!("Skipping file due to size filter ({}): {}", size, path.display());
            return None;
        }
        let seen = identities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .seen_before(&metadata);
        if seen {
            log::debug!("Skipping second link to same file: {}", path.display());
            return None;
        }

        Some(Ok(FileEntry::from_metadata(path, &metadata, is_symlink)))
    }

    fn classify_walk_error(&self, error: &jwalk::Error) -> TraversalError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        let err = if error.loop_ancestor().is_some() {
            TraversalError::Loop(path)
        } else {
            match error.io_error() {
                Some(io) => TraversalError::from_io(&path, std::io::Error::new(io.kind(), io.to_string())),
                None => TraversalError::Io {
                    path,
                    source: std::io::Error::other(error.to_string()),
                },
            }
        };
        log::warn!("Walker error: {}", err);
        err
    }
}
