//! Human-readable terminal output.
//!
//! Colors come from `yansi`; the caller disables them globally for
//! `--no-color` or a non-terminal stdout.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::actions::{MergePlan, MergeResult, OutcomeStatus};
use crate::duplicates::{Classification, DuplicateGroup, ScanSummary};

const DIGEST_PREVIEW: usize = 16;

fn classification_label(classification: Classification) -> String {
    match classification {
        Classification::Exact => "exact".green().to_string(),
        Classification::Potential => "potential".yellow().to_string(),
    }
}

/// Write every group followed by the scan summary.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_scan<W: Write>(
    writer: &mut W,
    groups: &[DuplicateGroup],
    summary: &ScanSummary,
) -> io::Result<()> {
    for (index, group) in groups.iter().enumerate() {
        let digest = group.digest_hex();
        writeln!(
            writer,
            "{} [{}] {} files x {}, reclaimable {}  {}",
            format!("Group {}", index + 1).bold(),
            classification_label(group.classification),
            group.len(),
            ByteSize::b(group.size),
            ByteSize::b(group.reclaimable_bytes()),
            digest[..DIGEST_PREVIEW.min(digest.len())].dim()
        )?;
        for file in &group.files {
            writeln!(writer, "    {}", file.path.display())?;
        }
        writeln!(writer)?;
    }
    write_summary(writer, groups, summary)
}

/// Write the scan statistics.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_summary<W: Write>(
    writer: &mut W,
    groups: &[DuplicateGroup],
    summary: &ScanSummary,
) -> io::Result<()> {
    writeln!(
        writer,
        "Scanned {} files ({}) in {:.2}s",
        summary.total_files,
        summary.total_size_display(),
        summary.scan_duration.as_secs_f64()
    )?;

    if groups.is_empty() {
        writeln!(writer, "{}", "No duplicates found.".green())?;
    } else {
        writeln!(
            writer,
            "Found {} duplicate groups ({} exact, {} potential), {} redundant copies",
            groups.len().bold(),
            summary.exact_groups,
            summary.potential_groups,
            summary.duplicate_files
        )?;
        writeln!(
            writer,
            "Reclaimable: {} ({:.1}% of scanned bytes)",
            summary.reclaimable_display().bold(),
            summary.wasted_percentage()
        )?;
    }

    if summary.interrupted {
        writeln!(
            writer,
            "{} {} size bucket(s) skipped, results are partial",
            "Scan interrupted:".yellow().bold(),
            summary.buckets_skipped
        )?;
    }
    if summary.has_errors() {
        writeln!(
            writer,
            "{} {} entries skipped due to errors (use -v for details)",
            "Warning:".yellow(),
            summary.error_count()
        )?;
    }
    Ok(())
}

/// Write a dry-run merge plan.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_plans<W: Write>(writer: &mut W, plans: &[MergePlan]) -> io::Result<()> {
    let mut files = 0usize;
    let mut bytes = 0u64;

    for plan in plans {
        writeln!(
            writer,
            "{} [{}] keep {}",
            format!("Group {}", plan.group_index + 1).bold(),
            classification_label(plan.classification),
            plan.survivor.display().green()
        )?;
        for target in &plan.targets {
            writeln!(writer, "    remove {}", target.display())?;
        }
        files += plan.targets.len();
        bytes += plan.reclaimable_bytes;
    }

    writeln!(
        writer,
        "Dry run: would remove {} file(s), freeing up to {}",
        files,
        ByteSize::b(bytes).bold()
    )
}

/// Write the per-file outcomes and the totals of a merge.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_merge_result<W: Write>(writer: &mut W, result: &MergeResult) -> io::Result<()> {
    for outcome in &result.outcomes {
        match &outcome.status {
            OutcomeStatus::Deleted => {
                writeln!(writer, "{} {}", "removed".green(), outcome.path.display())?;
            }
            OutcomeStatus::AlreadyAbsent => {
                writeln!(writer, "{} {}", "absent ".dim(), outcome.path.display())?;
            }
            OutcomeStatus::Failed(reason) => {
                writeln!(
                    writer,
                    "{} {}: {}",
                    "failed ".red(),
                    outcome.path.display(),
                    reason
                )?;
            }
        }
    }
    for failure in &result.group_errors {
        writeln!(
            writer,
            "{} group {} skipped: {}",
            "Warning:".yellow(),
            failure.group_index + 1,
            failure.error
        )?;
    }
    writeln!(writer, "{}", result.summary().bold())
}
