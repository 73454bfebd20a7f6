//! JSON output formatter for search results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "fingerprint": "2d41d8cd98f00b204e9800998ecf8427e",
//!       "size": 2,
//!       "files": ["/path/to/a", "/path/to/b"]
//!     }
//!   ],
//!   "summary": {
//!     "indexed_files": 3,
//!     "skipped_files": 0,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 1,
//!     "reclaimable_space": 2,
//!     "scan_duration_ms": 12,
//!     "exit_code": 0,
//!     "exit_code_name": "CF000"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Shared fingerprint (size followed by hex digest)
    pub fingerprint: String,
    /// File size in bytes
    pub size: u64,
    /// Paths of all members, in discovery order
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group from a DuplicateGroup.
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            fingerprint: group.fingerprint.clone().unwrap_or_default(),
            size: group.size(),
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
    /// Files indexed
    pub indexed_files: usize,
    /// Entries skipped because they could not be read
    pub skipped_files: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding the first of each group)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates (bytes)
    pub reclaimable_space: u64,
    /// Duration of the search in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "CF000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            indexed_files: summary.indexed_files,
            skipped_files: summary.skipped_files,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Search summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from duplicate groups, summary and exit code.
    ///
    /// # Example
    ///
    /// ```
    /// use copyfinder::duplicates::ScanSummary;
    /// use copyfinder::error::ExitCode;
    /// use copyfinder::output::json::JsonOutput;
    ///
    /// let output = JsonOutput::new(&[], &ScanSummary::default(), ExitCode::NoDuplicates);
    /// assert!(output.duplicates.is_empty());
    /// assert_eq!(output.summary.exit_code, 2);
    /// ```
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            duplicates: groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
