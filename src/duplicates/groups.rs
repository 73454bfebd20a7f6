//! Duplicate groups and the fingerprint partitioning pass.
//!
//! # Overview
//!
//! The Coarse and Full levels share one algorithm. The working set is consumed
//! head first: the head's fingerprint is computed, the rest of the set is
//! split into records that match it and a fresh remaining set, and the head
//! plus its matches become a [`DuplicateGroup`] when there are at least two
//! of them. The loop then continues on the remaining set.
//!
//! Group membership keeps discovery order, and groups come out in the order
//! of their first member.
//!
//! # Example
//!
//! ```no_run
//! use copyfinder::duplicates::{partition_by_fingerprint, SearchLevel};
//! use copyfinder::progress::SilentProgress;
//! use copyfinder::scanner::ContentHasher;
//! use copyfinder::signal::SearchState;
//!
//! let records = Vec::new(); // FileRecords from the Index level
//! let state = SearchState::new();
//! assert!(state.try_begin());
//!
//! let groups = partition_by_fingerprint(
//!     records,
//!     SearchLevel::Coarse,
//!     &ContentHasher::new(),
//!     &state,
//!     &SilentProgress,
//! )
//! .unwrap();
//! assert!(groups.is_empty());
//! ```

use std::path::Path;

use super::{SearchError, SearchLevel};
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::scanner::{ContentHasher, FileRecord};
use crate::signal::SearchState;

/// Records sharing a fingerprint at one level.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    /// Level that produced the group
    pub level: SearchLevel,
    /// Shared fingerprint; `None` for the Index level's whole-set group
    pub fingerprint: Option<String>,
    /// Members in discovery order
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a new group.
    #[must_use]
    pub fn new(level: SearchLevel, fingerprint: Option<String>, files: Vec<FileRecord>) -> Self {
        Self {
            level,
            fingerprint,
            files,
        }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Size of one member in bytes.
    ///
    /// Fingerprints embed the size, so every member of a Coarse or Full group
    /// has the same one.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.files.first().map_or(0, |f| f.size)
    }

    /// Members beyond the first.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Bytes held by the members beyond the first.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size() * self.duplicate_count() as u64
    }

    /// Member paths in order.
    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }
}

/// Partition `records` into groups of two or more sharing a fingerprint at `level`.
///
/// At [`SearchLevel::Full`] candidates are compared by partial hash first and
/// a full hash is only computed for records that share the head's partial
/// hash. Full hashes are memoized on the records.
///
/// Emits one progress event per group with the share of the input consumed
/// so far, as a percentage.
///
/// # Errors
///
/// - [`SearchError::Aborted`] if `state` is no longer in progress before a
///   head is taken, or hashing was interrupted.
/// - [`SearchError::FileNotFound`] if a full hash cannot be computed.
pub fn partition_by_fingerprint(
    records: Vec<FileRecord>,
    level: SearchLevel,
    hasher: &ContentHasher,
    state: &SearchState,
    progress: &dyn ProgressCallback,
) -> Result<Vec<DuplicateGroup>, SearchError> {
    let total = records.len();
    let step = if total == 0 { 0.0 } else { 100.0 / total as f64 };
    let mut groups = Vec::new();
    let mut pending = records.into_iter();

    loop {
        if !state.is_in_progress() {
            return Err(SearchError::Aborted);
        }
        let Some(mut head) = pending.next() else {
            break;
        };

        // A head without a partial-hash partner cannot form a Full group
        if level == SearchLevel::Full
            && !pending
                .as_slice()
                .iter()
                .any(|candidate| candidate.partial_hash() == head.partial_hash())
        {
            log::trace!("No full-hash candidates for {}", head.path.display());
            continue;
        }

        let fingerprint = head.fingerprint(level, hasher)?.to_string();
        let mut matches = vec![head];
        let mut remaining = Vec::with_capacity(pending.len());

        for mut candidate in pending {
            if is_match(&mut candidate, &matches[0], &fingerprint, level, hasher)? {
                matches.push(candidate);
            } else {
                remaining.push(candidate);
            }
        }

        if matches.len() > 1 {
            let value = 100.0 - step * remaining.len() as f64;
            log::debug!(
                "{} group {}: {} files",
                level,
                fingerprint,
                matches.len()
            );
            progress.on_progress(&ProgressEvent::new(value, matches.clone(), level));
            groups.push(DuplicateGroup::new(level, Some(fingerprint), matches));
        }

        pending = remaining.into_iter();
    }

    Ok(groups)
}

fn is_match(
    candidate: &mut FileRecord,
    head: &FileRecord,
    fingerprint: &str,
    level: SearchLevel,
    hasher: &ContentHasher,
) -> Result<bool, SearchError> {
    match level {
        SearchLevel::Index | SearchLevel::Coarse => Ok(candidate.partial_hash() == fingerprint),
        SearchLevel::Full => {
            if candidate.partial_hash() != head.partial_hash() {
                return Ok(false);
            }
            Ok(candidate.ensure_full_hash(hasher)? == fingerprint)
        }
    }
}
