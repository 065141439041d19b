//! Structured error handling and exit codes.

use serde::Serialize;

use crate::signal::EXIT_CODE_INTERRUPTED;

/// Process exit codes.
///
/// - 0: Success (duplicates found, or merge completed)
/// - 1: General error
/// - 2: No duplicates found
/// - 3: Partial success (non-fatal scan errors or failed merge targets)
/// - 130: Interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Completed normally.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Scan completed but found no duplicates.
    NoDuplicates = 2,
    /// Completed with per-file errors or merge failures.
    PartialSuccess = 3,
    /// Cancelled by the user.
    Interrupted = EXIT_CODE_INTERRUPTED as isize,
}

impl ExitCode {
    /// Numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DM000",
            Self::GeneralError => "DM001",
            Self::NoDuplicates => "DM002",
            Self::PartialSuccess => "DM003",
            Self::Interrupted => "DM130",
        }
    }
}

/// Error object printed by `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Code prefix, e.g. "DM001"
    pub code: String,
    /// Numeric exit code
    pub exit_code: i32,
    /// Human-readable message including the cause chain
    pub message: String,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Build from an anyhow error and the exit code it maps to.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
