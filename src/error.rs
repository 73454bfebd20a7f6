//! Exit codes and structured error output for the binary.

use serde::Serialize;

use crate::duplicates::SearchError;

/// Exit codes for the copyfinder application.
///
/// - 0: Success (completed normally, duplicates found)
/// - 1: General error (unexpected failure)
/// - 2: No duplicates found (completed normally, no duplicates)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: Search completed and duplicates were found.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No duplicates: Search completed but no duplicates were found.
    NoDuplicates = 2,
    /// Interrupted: Search was aborted (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "CF000",
            Self::GeneralError => "CF001",
            Self::NoDuplicates => "CF002",
            Self::Interrupted => "CF130",
        }
    }

    /// Exit code for a completed search.
    #[must_use]
    pub fn for_groups(group_count: usize) -> Self {
        if group_count == 0 {
            Self::NoDuplicates
        } else {
            Self::Success
        }
    }

    /// Exit code for an error that reached the binary boundary.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<SearchError>() {
            Some(SearchError::Aborted) => Self::Interrupted,
            _ => Self::GeneralError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "CF001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
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
