//! JSON output for scan and merge results.
//!
//! # Scan schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "digest": "abc123...",
//!       "classification": "exact",
//!       "size": 1024,
//!       "reclaimable_bytes": 1024,
//!       "files": ["/path/to/file1.txt", "/path/to/file2.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "duplicate_groups": 5,
//!     "reclaimable_space": 51200,
//!     "interrupted": false,
//!     "exit_code": 0,
//!     "exit_code_name": "DM000"
//!   }
//! }
//! ```
//!
//! Merge output adds `strategy`, `dry_run`, the `plans` of a dry run, or the
//! `result` of a real one.

use std::io::Write;

use serde::Serialize;

use crate::actions::{MergePlan, MergeResult, MergeStrategy};
use crate::duplicates::{Classification, DuplicateGroup, ScanSummary};
use crate::error::ExitCode;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// BLAKE3 digest as hexadecimal string (64 characters)
    pub digest: String,
    /// Exact or potential
    pub classification: Classification,
    /// File size in bytes
    pub size: u64,
    /// Bytes freed by keeping one copy
    pub reclaimable_bytes: u64,
    /// Member paths in path order
    pub files: Vec<String>,
}

impl From<&DuplicateGroup> for JsonDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            digest: group.digest_hex(),
            classification: group.classification,
            size: group.size,
            reclaimable_bytes: group.reclaimable_bytes(),
            files: group
                .files
                .iter()
                .map(|f| f.path.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Files considered after filters
    pub total_files: usize,
    /// Bytes in those files
    pub total_size: u64,
    /// Files ruled out because their size is unique
    pub eliminated_by_size: usize,
    /// Size buckets fingerprinted
    pub buckets_processed: usize,
    /// Size buckets skipped after cancellation
    pub buckets_skipped: usize,
    /// Groups matched on full content
    pub exact_groups: usize,
    /// Groups matched on a prefix only
    pub potential_groups: usize,
    /// Redundant copies across all groups
    pub duplicate_files: usize,
    /// Bytes freed by keeping one copy per group
    pub reclaimable_space: u64,
    /// Wall-clock scan time in milliseconds
    pub scan_duration_ms: u64,
    /// Whether the scan was cancelled
    pub interrupted: bool,
    /// Entries skipped because of an error
    pub errors: Vec<String>,
    /// Numeric exit code
    pub exit_code: i32,
    /// Machine-readable exit code name (e.g., "DM000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Build from a scan summary and the exit code of the run.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        let errors = summary
            .traversal_errors
            .iter()
            .map(ToString::to_string)
            .chain(summary.fingerprint_errors.iter().map(ToString::to_string))
            .collect();

        Self {
            total_files: summary.total_files,
            total_size: summary.total_bytes,
            eliminated_by_size: summary.eliminated_by_size,
            buckets_processed: summary.buckets_processed,
            buckets_skipped: summary.buckets_skipped,
            exact_groups: summary.exact_groups,
            potential_groups: summary.potential_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_bytes,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            interrupted: summary.interrupted,
            errors,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Scan report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a scan report.
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            duplicates: groups.iter().map(JsonDuplicateGroup::from).collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        write_json(writer, self)
    }
}

/// Merge report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonMergeOutput {
    /// Survivor policy in effect
    pub strategy: String,
    /// Whether files were left untouched
    pub dry_run: bool,
    /// Planned removals (dry run only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<MergePlan>,
    /// What the engine did (real run only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MergeResult>,
    /// Statistics of the scan that produced the groups
    pub summary: JsonSummary,
}

impl JsonMergeOutput {
    /// Report for a dry run.
    #[must_use]
    pub fn planned(
        strategy: MergeStrategy,
        plans: Vec<MergePlan>,
        summary: &ScanSummary,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            strategy: strategy.to_string(),
            dry_run: true,
            plans,
            result: None,
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Report for a completed merge.
    #[must_use]
    pub fn completed(
        strategy: MergeStrategy,
        result: MergeResult,
        summary: &ScanSummary,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            strategy: strategy.to_string(),
            dry_run: false,
            plans: Vec::new(),
            result: Some(result),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        write_json(writer, self)
    }
}

fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<(), JsonOutputError> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON output: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{FileEntry, Fingerprint, FingerprintScope};
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn group(byte: u8, size: u64, names: &[&str], scope: FingerprintScope) -> DuplicateGroup {
        let now = SystemTime::now();
        let files = names
            .iter()
            .map(|n| FileEntry::new(PathBuf::from(n), size, now))
            .collect();
        DuplicateGroup::new(
            Fingerprint::new([byte; 32], scope),
            size,
            files,
        )
    }

    #[test]
    fn test_scan_report_groups() {
        let groups = vec![
            group(1, 1024, &["/a/1", "/a/2"], FingerprintScope::Full),
            group(2, 4096, &["/b/1", "/b/2", "/b/3"], FingerprintScope::PartialPrefix),
        ];
        let output = JsonOutput::new(&groups, &ScanSummary::default(), ExitCode::Success);

        assert_eq!(output.duplicates.len(), 2);
        assert_eq!(output.duplicates[0].digest.len(), 64);
        assert_eq!(output.duplicates[0].reclaimable_bytes, 1024);
        assert_eq!(output.duplicates[1].files.len(), 3);

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["duplicates"][0]["classification"], "exact");
        assert_eq!(value["duplicates"][1]["classification"], "potential");
        assert_eq!(value["summary"]["exit_code_name"], "DM000");
    }

    #[test]
    fn test_summary_fields() {
        let summary = ScanSummary {
            total_files: 10,
            scan_duration: Duration::from_millis(1500),
            interrupted: true,
            buckets_skipped: 3,
            ..Default::default()
        };
        let json = JsonSummary::from_scan_summary(&summary, ExitCode::Interrupted);
        assert_eq!(json.total_files, 10);
        assert_eq!(json.scan_duration_ms, 1500);
        assert!(json.interrupted);
        assert_eq!(json.buckets_skipped, 3);
        assert_eq!(json.exit_code, 130);
    }

    #[test]
    fn test_write_to_ends_with_newline() {
        let output = JsonOutput::new(&[], &ScanSummary::default(), ExitCode::NoDuplicates);
        let mut buffer = Vec::new();
        output.write_to(&mut buffer).unwrap();

        let written = String::from_utf8(buffer).unwrap();
        assert!(written.starts_with('{'));
        assert!(written.ends_with("}\n"));
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["summary"]["exit_code"], 2);
    }

    #[test]
    fn test_merge_report_shapes() {
        let plan = MergePlan {
            group_index: 0,
            survivor: PathBuf::from("/a/1"),
            targets: vec![PathBuf::from("/a/2")],
            reclaimable_bytes: 10,
            classification: Classification::Exact,
        };
        let dry = JsonMergeOutput::planned(
            MergeStrategy::KeepFirst,
            vec![plan],
            &ScanSummary::default(),
            ExitCode::Success,
        );
        let value = serde_json::to_value(&dry).unwrap();
        assert_eq!(value["strategy"], "keep-first");
        assert_eq!(value["dry_run"], true);
        assert!(value.get("result").is_none());
        assert_eq!(value["plans"][0]["survivor"], "/a/1");

        let done = JsonMergeOutput::completed(
            MergeStrategy::KeepOldest,
            MergeResult::default(),
            &ScanSummary::default(),
            ExitCode::Success,
        );
        let value = serde_json::to_value(&done).unwrap();
        assert!(value.get("plans").is_none());
        assert_eq!(value["result"]["deleted_count"], 0);
    }
}
