//! Sequencing of the three search levels.
//!
//! [`SearchProcessor::launch`] runs Index, Coarse and Full in order on the
//! calling thread and returns the Full groups. [`SearchProcessor::spawn`] does
//! the same on a background thread and streams [`SearchEvent`]s back over a
//! bounded channel.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use copyfinder::duplicates::{CopySearchEngine, EngineConfig, SearchProcessor};
//! use copyfinder::progress::Progress;
//!
//! let engine = CopySearchEngine::new("/data", EngineConfig::default());
//! let processor = Arc::new(SearchProcessor::new(engine));
//!
//! let handle = processor.spawn().unwrap();
//! let groups = handle.wait(&Progress::new(false)).unwrap();
//! println!("{} duplicate groups", groups.len());
//! ```

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use super::{CopySearchEngine, DuplicateGroup, EngineConfig, SearchError, SearchLevel};
use crate::progress::{ProgressCallback, ProgressEvent};

/// Maximum number of events that may queue up before the worker blocks.
pub const EVENT_CHANNEL_CAPACITY: usize = 4_096;

/// Messages sent from a background search to its handle.
#[derive(Debug)]
pub enum SearchEvent {
    /// A level started examining `total` records (zero for Index).
    LevelStarted {
        /// Level that started
        level: SearchLevel,
        /// Records the level will examine
        total: usize,
    },
    /// A progress increment.
    Progress(ProgressEvent),
    /// A level completed successfully.
    LevelFinished(SearchLevel),
    /// The search ended. Always the last event.
    Finished(Result<Vec<DuplicateGroup>, SearchError>),
}

/// Runs the levels of a [`CopySearchEngine`] in order.
#[derive(Debug)]
pub struct SearchProcessor {
    engine: CopySearchEngine,
}

impl SearchProcessor {
    /// Wrap an engine.
    #[must_use]
    pub fn new(engine: CopySearchEngine) -> Self {
        Self { engine }
    }

    /// Processor for a search of the current user's home directory.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::HomeFolderNotFound`] if no home directory is known.
    pub fn for_home(config: EngineConfig) -> Result<Self, SearchError> {
        CopySearchEngine::for_home(config).map(Self::new)
    }

    /// The wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &CopySearchEngine {
        &self.engine
    }

    /// Run Index, Coarse and Full, returning the Full groups.
    ///
    /// The first failing level ends the run and its error is returned
    /// unchanged. The engine releases its run state when the run ends, unless
    /// it was rejected because another run owns it.
    ///
    /// # Errors
    ///
    /// See [`CopySearchEngine::search_copies`].
    pub fn launch(
        &self,
        progress: &dyn ProgressCallback,
    ) -> Result<Vec<DuplicateGroup>, SearchError> {
        let result = self.run_levels(progress);

        match &result {
            Ok(groups) => log::info!("Search finished with {} duplicate groups", groups.len()),
            Err(e) => log::debug!("Search ended: {}", e),
        }

        result
    }

    fn run_levels(
        &self,
        progress: &dyn ProgressCallback,
    ) -> Result<Vec<DuplicateGroup>, SearchError> {
        self.engine.search_copies(SearchLevel::Index, progress)?;
        self.engine.search_copies(SearchLevel::Coarse, progress)?;
        self.engine.search_copies(SearchLevel::Full, progress)
    }

    /// Request cancellation of the running search. Does not wait for it.
    pub fn abort(&self) {
        self.engine.state().abort();
    }

    /// Run [`Self::launch`] on a background thread.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the thread cannot be spawned.
    pub fn spawn(self: Arc<Self>) -> io::Result<SearchHandle> {
        let (event_tx, event_rx) = crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY);
        let processor = Arc::clone(&self);

        let thread = thread::Builder::new()
            .name("copyfinder-search".into())
            .spawn(move || {
                let sink = ChannelProgress {
                    sender: event_tx.clone(),
                };
                let result = processor.launch(&sink);
                let _ = event_tx.send(SearchEvent::Finished(result));
            })?;

        Ok(SearchHandle {
            processor: self,
            events: event_rx,
            thread: Some(thread),
            finished: false,
        })
    }
}

/// Forwards progress callbacks into the event channel.
struct ChannelProgress {
    sender: Sender<SearchEvent>,
}

impl ProgressCallback for ChannelProgress {
    fn on_level_start(&self, level: SearchLevel, total: usize) {
        let _ = self.sender.send(SearchEvent::LevelStarted { level, total });
    }

    fn on_progress(&self, event: &ProgressEvent) {
        let _ = self.sender.send(SearchEvent::Progress(event.clone()));
    }

    fn on_level_end(&self, level: SearchLevel) {
        let _ = self.sender.send(SearchEvent::LevelFinished(level));
    }
}

/// Handle to a search running on a background thread.
///
/// Dropping a handle before the search finished aborts it.
pub struct SearchHandle {
    processor: Arc<SearchProcessor>,
    events: Receiver<SearchEvent>,
    thread: Option<JoinHandle<()>>,
    finished: bool,
}

impl SearchHandle {
    /// Raw event stream, for callers that drive their own loop.
    #[must_use]
    pub fn events(&self) -> &Receiver<SearchEvent> {
        &self.events
    }

    /// Request cancellation of the search.
    pub fn abort(&self) {
        self.processor.abort();
    }

    /// Forward events into `sink` until the search finishes, then return its result.
    ///
    /// # Errors
    ///
    /// Returns the search's error, or [`SearchError::WorkerFailed`] if the
    /// worker ended without reporting a result.
    pub fn wait(
        mut self,
        sink: &dyn ProgressCallback,
    ) -> Result<Vec<DuplicateGroup>, SearchError> {
        let mut outcome = None;

        for event in self.events.iter() {
            match event {
                SearchEvent::LevelStarted { level, total } => sink.on_level_start(level, total),
                SearchEvent::Progress(event) => sink.on_progress(&event),
                SearchEvent::LevelFinished(level) => sink.on_level_end(level),
                SearchEvent::Finished(result) => {
                    outcome = Some(result);
                    break;
                }
            }
        }

        self.finished = true;
        let panic_message = self
            .thread
            .take()
            .and_then(|thread| thread.join().err())
            .map(|payload| panic_text(payload.as_ref()));

        match outcome {
            Some(result) => result,
            None => {
                self.processor.engine().state().finish();
                let reason =
                    panic_message.unwrap_or_else(|| "worker exited without a result".to_string());
                log::error!("Search worker failed: {}", reason);
                Err(SearchError::WorkerFailed(reason))
            }
        }
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!("Search handle dropped before completion, aborting");
            self.processor.abort();
        }
    }
}

impl std::fmt::Debug for SearchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchHandle")
            .field("root", &self.processor.engine().root())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
