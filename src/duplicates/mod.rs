//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Index level: enumerate the tree into [`FileRecord`](crate::scanner::FileRecord)s
//!   with partial hashes
//! - Coarse level: group records by partial hash
//! - Full level: confirm coarse survivors by full-content hash
//! - Sequencing the three levels, in the foreground or on a worker thread
//!
//! # Example
//!
//! ```no_run
//! use copyfinder::duplicates::{CopySearchEngine, EngineConfig, SearchProcessor};
//! use copyfinder::progress::SilentProgress;
//!
//! let engine = CopySearchEngine::new("/data/photos", EngineConfig::default());
//! let processor = SearchProcessor::new(engine);
//!
//! for group in processor.launch(&SilentProgress).unwrap() {
//!     println!("{} copies of {}", group.len(), group.files[0].display_name);
//! }
//! ```

pub mod engine;
pub mod groups;
pub mod processor;

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::scanner::HashError;

pub use engine::{CopySearchEngine, EngineConfig, IndexStats, SearchPhase};
pub use groups::{partition_by_fingerprint, DuplicateGroup};
pub use processor::{SearchEvent, SearchHandle, SearchProcessor};

/// The three levels of a search, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchLevel {
    /// Enumerate files and compute partial hashes.
    Index,
    /// Group by partial hash.
    Coarse,
    /// Group by full-content hash.
    Full,
}

impl SearchLevel {
    /// All levels in execution order.
    pub const ALL: [SearchLevel; 3] = [SearchLevel::Index, SearchLevel::Coarse, SearchLevel::Full];

    /// Short human-readable description.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            SearchLevel::Index => "Indexing",
            SearchLevel::Coarse => "Comparing prefixes",
            SearchLevel::Full => "Comparing contents",
        }
    }
}

impl std::fmt::Display for SearchLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchLevel::Index => write!(f, "index"),
            SearchLevel::Coarse => write!(f, "coarse"),
            SearchLevel::Full => write!(f, "full"),
        }
    }
}

/// Errors that end a search level.
#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    /// The root path is missing or not a directory.
    #[error("Folder not found: {0}")]
    FolderNotFound(PathBuf),

    /// A record the engine already trusted can no longer be read.
    #[error(transparent)]
    FileNotFound(HashError),

    /// The user's home directory could not be resolved.
    #[error("Home folder could not be determined")]
    HomeFolderNotFound,

    /// Another search is already running on this engine.
    #[error("A search is already in progress")]
    SearchInProgress,

    /// The search was cancelled.
    #[error("Search aborted")]
    Aborted,

    /// The background worker ended without reporting a result.
    #[error("Search worker failed: {0}")]
    WorkerFailed(String),
}

impl From<HashError> for SearchError {
    fn from(error: HashError) -> Self {
        match error {
            HashError::Interrupted(_) => SearchError::Aborted,
            other => SearchError::FileNotFound(other),
        }
    }
}

/// Summary statistics from a completed search.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Files indexed by the last Index level
    pub indexed_files: usize,
    /// Entries skipped during indexing because they could not be read
    pub skipped_files: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Number of duplicate files (excluding the first of each group)
    pub duplicate_files: usize,
    /// Bytes that removing the duplicates would free
    pub reclaimable_space: u64,
    /// Duration of the entire search
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Build a summary from the final groups and the index statistics.
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], stats: IndexStats, scan_duration: Duration) -> Self {
        Self {
            indexed_files: stats.indexed,
            skipped_files: stats.skipped,
            duplicate_groups: groups.len(),
            duplicate_files: groups.iter().map(DuplicateGroup::duplicate_count).sum(),
            reclaimable_space: groups.iter().map(DuplicateGroup::wasted_space).sum(),
            scan_duration,
        }
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimable_space).to_string()
    }
}
