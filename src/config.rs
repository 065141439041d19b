//! Layered application configuration.
//!
//! Settings are merged with `figment`, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file: `--config PATH`, or `config.toml` in the platform config
//!    directory (`~/.config/dupmerge` on Linux)
//! 3. Environment: `DUPMERGE_` prefix, `__` for nesting
//!    (`DUPMERGE_SCAN__IO_THREADS=8`)
//! 4. CLI flags, applied by the caller on the extracted [`Config`]
//!
//! ```toml
//! [scan]
//! max_depth = 10
//! ignore_patterns = ["*.tmp", "node_modules/"]
//!
//! [merge]
//! permanent = false
//! potential_policy = "verify"
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::{MergeConfig, PathGuard, PotentialPolicy};
use crate::duplicates::FinderConfig;
use crate::scanner::{Hasher, WalkerConfig, DEFAULT_MAX_DEPTH, LARGE_FILE_THRESHOLD, PREFIX_BYTES};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DUPMERGE_";

/// Errors from loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A layer could not be parsed or extracted.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Dotted key of the offending value
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// `[scan]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Recursion ceiling below each root
    pub max_depth: usize,
    /// Skip dot entries
    pub skip_hidden: bool,
    /// Follow symbolic links
    pub follow_symlinks: bool,
    /// Smallest file considered, in bytes
    pub min_size: Option<u64>,
    /// Largest file considered, in bytes
    pub max_size: Option<u64>,
    /// Gitignore-style patterns excluded from the walk
    pub ignore_patterns: Vec<String>,
    /// Absolute paths excluded from the walk
    pub exclude_paths: Vec<PathBuf>,
    /// Directory reader threads
    pub walk_threads: usize,
    /// Fingerprinting threads
    pub io_threads: usize,
    /// Size at which only a prefix is fingerprinted
    pub large_file_threshold: u64,
    /// Length of that prefix
    pub prefix_bytes: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            skip_hidden: true,
            follow_symlinks: false,
            min_size: None,
            max_size: None,
            ignore_patterns: Vec::new(),
            exclude_paths: Vec::new(),
            walk_threads: 4,
            io_threads: 4,
            large_file_threshold: LARGE_FILE_THRESHOLD,
            prefix_bytes: PREFIX_BYTES,
        }
    }
}

/// `[merge]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Delete permanently instead of moving to the trash
    pub permanent: bool,
    /// Treatment of potential groups
    pub potential_policy: PotentialPolicy,
    /// Refuse to remove files changed since the scan
    pub verify_unchanged: bool,
    /// Extra roots never deleted from, on top of the platform defaults
    pub protected_paths: Vec<PathBuf>,
    /// If non-empty, only files under these roots may be deleted
    pub allowed_paths: Vec<PathBuf>,
    /// Never delete `.sys`, `.dll`, `.exe`, `.drv` or `.ocx` files
    pub protect_critical_extensions: bool,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            permanent: false,
            potential_policy: PotentialPolicy::Verify,
            verify_unchanged: true,
            protected_paths: Vec::new(),
            allowed_paths: Vec::new(),
            protect_critical_extensions: true,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan settings
    pub scan: ScanSettings,
    /// Merge settings
    pub merge: MergeSettings,
}

impl Config {
    /// Platform-specific default config file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dupmerge").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Build the figment for an optional explicit file.
    ///
    /// Without an explicit file the default location is used if it exists.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = path.map(Path::to_path_buf).or_else(Self::default_path) {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if `path` is given but missing,
    /// [`ConfigError::Load`] for malformed layers, and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(file) = path {
            if !file.is_file() {
                return Err(ConfigError::NotFound(file.to_path_buf()));
            }
        }

        let config: Config = Self::figment(path).extract().map_err(Box::new)?;
        config.validate()?;
        log::debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |field: &'static str, value: u64| {
            if value == 0 {
                Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                })
            } else {
                Ok(())
            }
        };

        positive("scan.max_depth", self.scan.max_depth as u64)?;
        positive("scan.walk_threads", self.scan.walk_threads as u64)?;
        positive("scan.io_threads", self.scan.io_threads as u64)?;
        positive("scan.large_file_threshold", self.scan.large_file_threshold)?;
        positive("scan.prefix_bytes", self.scan.prefix_bytes)?;

        if let (Some(min), Some(max)) = (self.scan.min_size, self.scan.max_size) {
            if min > max {
                return Err(ConfigError::Invalid {
                    field: "scan.min_size",
                    reason: format!("{min} is larger than scan.max_size {max}"),
                });
            }
        }
        Ok(())
    }

    /// Walker settings.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        let scan = &self.scan;
        WalkerConfig {
            follow_symlinks: scan.follow_symlinks,
            ..WalkerConfig::default()
        }
        .with_max_depth(scan.max_depth)
        .with_skip_hidden(scan.skip_hidden)
        .with_size_range(scan.min_size, scan.max_size)
        .with_ignore_patterns(scan.ignore_patterns.clone())
        .with_exclude_paths(scan.exclude_paths.clone())
        .with_threads(scan.walk_threads)
    }

    /// Finder settings (no shutdown flag or progress callback).
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_io_threads(self.scan.io_threads)
            .with_walker_config(self.walker_config())
            .with_hasher(self.hasher())
    }

    /// Fingerprint policy.
    #[must_use]
    pub fn hasher(&self) -> Hasher {
        Hasher::new()
            .with_large_file_threshold(self.scan.large_file_threshold)
            .with_prefix_bytes(self.scan.prefix_bytes)
    }

    /// Merge engine settings.
    #[must_use]
    pub fn merge_config(&self) -> MergeConfig {
        MergeConfig::default()
            .with_potential_policy(self.merge.potential_policy)
            .with_verify_unchanged(self.merge.verify_unchanged)
    }

    /// Path guard for the merge engine.
    #[must_use]
    pub fn path_guard(&self) -> PathGuard {
        PathGuard::default()
            .with_protected_roots(self.merge.protected_paths.clone())
            .with_allowed_roots(self.merge.allowed_paths.clone())
            .with_critical_extensions(self.merge.protect_critical_extensions)
    }
}
