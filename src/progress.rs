//! Progress reporting for the search levels.
//!
//! The engine reports through the [`ProgressCallback`] trait. Any closure
//! `Fn(&ProgressEvent)` is a callback, which keeps tests and small callers
//! short; [`Progress`] is the `indicatif` implementation used by the CLI.
//!
//! Callbacks are invoked from the single worker running the search and never
//! concurrently.

use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::Mutex;

use crate::duplicates::SearchLevel;
use crate::scanner::FileRecord;

/// One progress increment emitted by a search level.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Index: 1.0 per indexed file. Coarse/Full: completion percentage (0-100).
    pub value: f64,
    /// Records found in this increment.
    pub records: Vec<FileRecord>,
    /// Level that produced the event.
    pub level: SearchLevel,
}

impl ProgressEvent {
    /// Create a new event.
    #[must_use]
    pub fn new(value: f64, records: Vec<FileRecord>, level: SearchLevel) -> Self {
        Self {
            value,
            records,
            level,
        }
    }
}

/// Receiver of search progress.
pub trait ProgressCallback: Send + Sync {
    /// Called when a level starts, with the number of records it will examine.
    ///
    /// Index does not know its total up front and reports zero.
    fn on_level_start(&self, _level: SearchLevel, _total: usize) {}

    /// Called for each progress increment.
    fn on_progress(&self, event: &ProgressEvent);

    /// Called when a level completes successfully.
    fn on_level_end(&self, _level: SearchLevel) {}
}

impl<F> ProgressCallback for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event);
    }
}

/// Callback that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Progress reporter using indicatif.
///
/// Shows a spinner with a file count while indexing and a percentage bar for
/// each grouping level.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use copyfinder::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            quiet,
        }
    }

    /// Create a style for the index level (spinner).
    fn index_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    /// Create a style for the grouping levels (percentage bar).
    fn grouping_style() -> ProgressStyle {
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_level_start(&self, level: SearchLevel, _total: usize) {
        if self.quiet {
            return;
        }

        let pb = match level {
            SearchLevel::Index => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::index_style());
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            SearchLevel::Coarse | SearchLevel::Full => {
                let pb = self.multi.add(ProgressBar::new(100));
                pb.set_style(Self::grouping_style());
                pb
            }
        };
        pb.set_message(level.description());
        *self.active.lock() = Some(pb);
    }

    fn on_progress(&self, event: &ProgressEvent) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *self.active.lock() {
            match event.level {
                SearchLevel::Index => {
                    pb.inc(event.records.len() as u64);
                    if let Some(record) = event.records.last() {
                        pb.set_message(format!(
                            "{}: {}",
                            event.level.description(),
                            truncate_path(&record.path.to_string_lossy(), 30)
                        ));
                    }
                }
                SearchLevel::Coarse | SearchLevel::Full => {
                    pb.set_position(event.value.clamp(0.0, 100.0) as u64);
                }
            }
        }
    }

    fn on_level_end(&self, level: SearchLevel) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.active.lock().take() {
            if level != SearchLevel::Index {
                pb.set_position(100);
            }
            pb.finish_with_message(format!("{} complete", level.description()));
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.len() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if file_name.chars().count() >= max_len {
        let tail: String = file_name
            .chars()
            .rev()
            .take(max_len.saturating_sub(3))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
