//! Command-line interface definitions.
//!
//! Global options (verbosity, color, config file) apply to every subcommand.
//! Flags given here override the layered [`Config`](crate::config::Config).
//!
//! ```bash
//! # Report duplicates
//! dupmerge scan ~/Downloads ~/Pictures
//!
//! # Machine-readable report
//! dupmerge scan ~/Downloads --json
//!
//! # Show what would be removed, keeping the oldest copy
//! dupmerge merge ~/Downloads --strategy keep-oldest --dry-run
//!
//! # Remove duplicates permanently without prompting
//! dupmerge merge ~/Downloads --strategy keep-newest --permanent --yes
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::actions::{MergeStrategy, PotentialPolicy};
use crate::config::Config;

/// Duplicate file finder and merger.
///
/// Files are grouped by size, then by BLAKE3 fingerprint. Large files are
/// fingerprinted over a prefix and reported as potential duplicates.
#[derive(Debug, Parser)]
#[command(name = "dupmerge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find duplicate files and report them
    Scan(ScanArgs),
    /// Find duplicate files and remove all but one copy of each
    Merge(MergeArgs),
}

/// Options shared by `scan` and `merge`.
#[derive(Debug, Args)]
pub struct ScanOptions {
    /// Directories to scan
    #[arg(value_name = "PATH", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// Minimum file size to consider (e.g., 1KB, 1MB, 1GB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 1KB, 1MB, 1GB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Gitignore-style patterns to skip (can be specified multiple times)
    ///
    /// Added to the patterns of the root's .gitignore and the config file.
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Maximum recursion depth below each root
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Follow symbolic links during the walk
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Include hidden files and directories (starting with .)
    #[arg(long)]
    pub include_hidden: bool,

    /// Number of fingerprinting threads
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Emit a JSON report on stdout
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `scan`.
#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub options: ScanOptions,
}

/// Arguments for `merge`.
#[derive(Debug, Args)]
pub struct MergeArgs {
    #[command(flatten)]
    pub options: ScanOptions,

    /// Which copy of each group to keep
    #[arg(short, long, value_enum)]
    pub strategy: StrategyArg,

    /// How to treat groups matched only over a prefix
    #[arg(long, value_enum, value_name = "POLICY")]
    pub potential: Option<PotentialArg>,

    /// Delete permanently instead of moving to the trash
    ///
    /// Warning: files cannot be recovered.
    #[arg(long)]
    pub permanent: bool,

    /// Print the merge plan without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Survivor policy as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Earliest creation time
    KeepOldest,
    /// Latest creation time
    KeepNewest,
    /// First in path order
    KeepFirst,
    /// Last in path order
    KeepLast,
}

impl From<StrategyArg> for MergeStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::KeepOldest => MergeStrategy::KeepOldest,
            StrategyArg::KeepNewest => MergeStrategy::KeepNewest,
            StrategyArg::KeepFirst => MergeStrategy::KeepFirst,
            StrategyArg::KeepLast => MergeStrategy::KeepLast,
        }
    }
}

/// Potential-group policy as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PotentialArg {
    /// Leave potential groups untouched
    Skip,
    /// Compare full content with the survivor before removing
    Verify,
    /// Remove without further checks
    Allow,
}

impl From<PotentialArg> for PotentialPolicy {
    fn from(arg: PotentialArg) -> Self {
        match arg {
            PotentialArg::Skip => PotentialPolicy::Skip,
            PotentialArg::Verify => PotentialPolicy::Verify,
            PotentialArg::Allow => PotentialPolicy::Allow,
        }
    }
}

impl ScanOptions {
    /// Override scan settings with the flags that were given.
    pub fn apply_to(&self, config: &mut Config) {
        let scan = &mut config.scan;
        if self.min_size.is_some() {
            scan.min_size = self.min_size;
        }
        if self.max_size.is_some() {
            scan.max_size = self.max_size;
        }
        scan.ignore_patterns.extend(self.ignore_patterns.iter().cloned());
        if let Some(depth) = self.max_depth {
            scan.max_depth = depth;
        }
        if self.follow_symlinks {
            scan.follow_symlinks = true;
        }
        if self.include_hidden {
            scan.skip_hidden = false;
        }
        if let Some(threads) = self.io_threads {
            scan.io_threads = threads;
        }
    }
}

impl MergeArgs {
    /// Override scan and merge settings with the flags that were given.
    pub fn apply_to(&self, config: &mut Config) {
        self.options.apply_to(config);
        if self.permanent {
            config.merge.permanent = true;
        }
        if let Some(policy) = self.potential {
            config.merge.potential_policy = policy.into();
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// ```
/// use dupmerge::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
