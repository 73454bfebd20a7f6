//! The search engine: owns the working set and runs one level at a time.
//!
//! # Overview
//!
//! [`CopySearchEngine::search_copies`] runs a single [`SearchLevel`]:
//!
//! 1. **Index**: claim the run state, walk the root and build one
//!    [`FileRecord`] per readable regular file. Unreadable entries are
//!    counted in [`IndexStats::skipped`] and otherwise ignored.
//! 2. **Coarse**: partition the working set by partial hash. Members of the
//!    resulting groups become the working set for the next level.
//! 3. **Full**: partition the working set by full-content hash.
//!
//! Index claims the engine's [`SearchState`]. The claim is released when Full
//! completes or when any level fails, so an aborted run keeps new searches out
//! until it has actually unwound. Levels are sequenced by
//! [`SearchProcessor`](super::SearchProcessor).

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use parking_lot::Mutex;

use super::groups::partition_by_fingerprint;
use super::{DuplicateGroup, SearchError, SearchLevel};
use crate::config::Config;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::scanner::{
    ContentHasher, FileRecord, HashAlgorithm, HashError, ScanError, WalkEntry, Walker,
    WalkerConfig, DEFAULT_BLOCK_SIZE, DEFAULT_PREFIX_THRESHOLD,
};
use crate::signal::SearchState;

/// Tuning for a [`CopySearchEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bytes covered by the partial fingerprint
    pub prefix_threshold: u64,
    /// Read block size for hashing
    pub block_size: usize,
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Skip hidden files and directories
    pub skip_hidden: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prefix_threshold: DEFAULT_PREFIX_THRESHOLD,
            block_size: DEFAULT_BLOCK_SIZE,
            algorithm: HashAlgorithm::default(),
            skip_hidden: true,
        }
    }
}

impl EngineConfig {
    /// Set the partial fingerprint threshold.
    #[must_use]
    pub fn with_prefix_threshold(mut self, threshold: u64) -> Self {
        self.prefix_threshold = threshold;
        self
    }

    /// Set the hashing block size.
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set whether hidden entries are skipped.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self::default()
            .with_prefix_threshold(config.prefix_threshold)
            .with_block_size(config.block_size)
            .with_algorithm(config.algorithm)
            .with_skip_hidden(config.skip_hidden)
    }
}

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    /// No search has run yet.
    #[default]
    Idle,
    /// Walking the tree.
    Indexing,
    /// Running a grouping level.
    Grouping(SearchLevel),
    /// The last level observed an abort.
    Aborted,
    /// The last level failed with an error other than an abort.
    Failed,
    /// The Full level finished.
    Completed,
}

/// Counts from the last Index level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Records added to the working set
    pub indexed: usize,
    /// Entries that could not be read and were left out
    pub skipped: usize,
}

/// Reasons an entry is left out of the index.
#[derive(thiserror::Error, Debug)]
enum SkipReason {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Duplicate search over one directory tree.
///
/// At most one search runs per engine; the Index level fails with
/// [`SearchError::SearchInProgress`] while another is running.
#[derive(Debug)]
pub struct CopySearchEngine {
    root: PathBuf,
    config: EngineConfig,
    hasher: ContentHasher,
    state: SearchState,
    working_set: Mutex<Vec<FileRecord>>,
    phase: Mutex<SearchPhase>,
    stats: Mutex<IndexStats>,
}

impl CopySearchEngine {
    /// Create an engine for `root`.
    ///
    /// The root is validated when the Index level runs, not here.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: EngineConfig) -> Self {
        let state = SearchState::new();
        let hasher = ContentHasher::new()
            .with_algorithm(config.algorithm)
            .with_block_size(config.block_size)
            .with_search_state(state.clone());

        Self {
            root: root.into(),
            config,
            hasher,
            state,
            working_set: Mutex::new(Vec::new()),
            phase: Mutex::new(SearchPhase::Idle),
            stats: Mutex::new(IndexStats::default()),
        }
    }

    /// Create an engine rooted at the current user's home directory.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::HomeFolderNotFound`] if no home directory is known.
    pub fn for_home(config: EngineConfig) -> Result<Self, SearchError> {
        let home = directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or(SearchError::HomeFolderNotFound)?;
        Ok(Self::new(home, config))
    }

    /// Root directory of the search.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared run state.
    #[must_use]
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SearchPhase {
        *self.phase.lock()
    }

    /// Counts from the last Index level.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        *self.stats.lock()
    }

    /// Number of records awaiting the next level.
    #[must_use]
    pub fn working_set_len(&self) -> usize {
        self.working_set.lock().len()
    }

    /// Run one level of the search.
    ///
    /// - Index returns a single group holding every indexed record.
    /// - Coarse and Full return the groups of two or more found at that level.
    ///
    /// The run state is released after Full succeeds and after any error
    /// other than [`SearchError::SearchInProgress`].
    ///
    /// # Errors
    ///
    /// - [`SearchError::SearchInProgress`] if Index is requested while a
    ///   search is running.
    /// - [`SearchError::FolderNotFound`] if the root is not a directory.
    /// - [`SearchError::Aborted`] if the search was aborted at a checkpoint.
    /// - [`SearchError::FileNotFound`] if a grouping level cannot hash a record.
    pub fn search_copies(
        &self,
        level: SearchLevel,
        progress: &dyn ProgressCallback,
    ) -> Result<Vec<DuplicateGroup>, SearchError> {
        let result = match level {
            SearchLevel::Index => self.index(progress),
            SearchLevel::Coarse | SearchLevel::Full => self.group(level, progress),
        };

        match &result {
            Ok(_) if level == SearchLevel::Full => self.state.finish(),
            Ok(_) | Err(SearchError::SearchInProgress) => {}
            Err(SearchError::Aborted) => {
                log::info!("{} level aborted", level);
                self.set_phase(SearchPhase::Aborted);
                self.state.finish();
            }
            Err(e) => {
                log::warn!("{} level failed: {}", level, e);
                self.set_phase(SearchPhase::Failed);
                self.state.finish();
            }
        }

        result
    }

    fn index(&self, progress: &dyn ProgressCallback) -> Result<Vec<DuplicateGroup>, SearchError> {
        if !self.state.try_begin() {
            return Err(SearchError::SearchInProgress);
        }

        self.set_phase(SearchPhase::Indexing);
        self.working_set.lock().clear();
        *self.stats.lock() = IndexStats::default();

        if !self.root.is_dir() {
            return Err(SearchError::FolderNotFound(self.root.clone()));
        }

        log::info!("Indexing {}", self.root.display());
        progress.on_level_start(SearchLevel::Index, 0);

        let walker = Walker::new(
            &self.root,
            WalkerConfig {
                skip_hidden: self.config.skip_hidden,
            },
        );

        for entry in walker.walk() {
            if !self.state.is_in_progress() {
                return Err(SearchError::Aborted);
            }

            let entry = match entry {
                Ok(entry) if entry.is_dir => continue,
                Ok(entry) => entry,
                Err(e) => {
                    self.skip(&e.to_string());
                    continue;
                }
            };

            match self.index_entry(&entry) {
                Ok(Some(record)) => {
                    self.working_set.lock().push(record.clone());
                    self.stats.lock().indexed += 1;
                    progress.on_progress(&ProgressEvent::new(
                        1.0,
                        vec![record],
                        SearchLevel::Index,
                    ));
                }
                Ok(None) => {}
                Err(SkipReason::Hash(HashError::Interrupted(_))) => {
                    return Err(SearchError::Aborted);
                }
                Err(e) => self.skip(&e.to_string()),
            }
        }

        if !self.state.is_in_progress() {
            return Err(SearchError::Aborted);
        }

        let stats = self.stats();
        log::info!(
            "Indexed {} files ({} skipped)",
            stats.indexed,
            stats.skipped
        );
        progress.on_level_end(SearchLevel::Index);

        let records = self.working_set.lock().clone();
        Ok(vec![DuplicateGroup::new(SearchLevel::Index, None, records)])
    }

    /// Build a record for a regular file. Other entry kinds yield `None`.
    fn index_entry(&self, entry: &WalkEntry) -> Result<Option<FileRecord>, SkipReason> {
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            log::trace!("Not a regular file: {}", entry.path.display());
            return Ok(None);
        }

        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        let digest = self
            .hasher
            .compute_partial(&entry.path, self.config.prefix_threshold)?;

        Ok(Some(FileRecord::new(entry.path.clone(), modified, digest)))
    }

    fn skip(&self, reason: &str) {
        log::debug!("Skipping entry: {}", reason);
        self.stats.lock().skipped += 1;
    }

    fn group(
        &self,
        level: SearchLevel,
        progress: &dyn ProgressCallback,
    ) -> Result<Vec<DuplicateGroup>, SearchError> {
        if !self.state.is_in_progress() {
            return Err(SearchError::Aborted);
        }

        self.set_phase(SearchPhase::Grouping(level));
        let records = std::mem::take(&mut *self.working_set.lock());

        log::info!("{}: {} candidates", level.description(), records.len());
        progress.on_level_start(level, records.len());

        let groups = partition_by_fingerprint(records, level, &self.hasher, &self.state, progress)?;

        if level == SearchLevel::Coarse {
            *self.working_set.lock() = groups
                .iter()
                .flat_map(|group| group.files.iter().cloned())
                .collect();
        } else {
            self.set_phase(SearchPhase::Completed);
        }

        log::info!("{}: {} groups", level.description(), groups.len());
        progress.on_level_end(level);

        Ok(groups)
    }

    fn set_phase(&self, phase: SearchPhase) {
        log::trace!("Search phase: {:?}", phase);
        *self.phase.lock() = phase;
    }
}
