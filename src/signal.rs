//! Search run state and Ctrl+C handling.
//!
//! A [`SearchState`] is an atomic run state: idle, running, or aborting.
//! It serves two purposes:
//!
//! - **Re-entrancy gate**: [`SearchState::try_begin`] claims an idle state
//!   with a compare-exchange, so at most one search per engine is ever in
//!   progress. The claim is only released by [`SearchState::finish`].
//! - **Cancellation token**: [`SearchState::abort`] moves a running search to
//!   aborting; it observes that at its next checkpoint and unwinds with
//!   `Aborted`.
//!
//! # Usage
//!
//! ```rust
//! use copyfinder::signal::SearchState;
//!
//! let state = SearchState::new();
//! assert!(state.try_begin());
//! assert!(!state.try_begin()); // already running
//!
//! // From any thread holding a clone
//! state.clone().abort();
//! assert!(!state.is_in_progress());
//! assert!(!state.try_begin()); // still unwinding
//!
//! state.finish();
//! assert!(state.try_begin());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const ABORTING: u8 = 2;

/// Shared run state for one search engine.
///
/// A claimed run stays claimed until its owner calls [`SearchState::finish`],
/// even after [`SearchState::abort`]. An aborted run that has not reached a
/// checkpoint yet therefore still blocks a new [`SearchState::try_begin`].
///
/// Cloning is cheap and every clone observes the same state.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    run: Arc<AtomicU8>,
}

impl SearchState {
    /// Create a state with no search in progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a search is currently running and has not been aborted.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.run.load(Ordering::SeqCst) == RUNNING
    }

    /// Whether no run owns the state. An aborted run that is still unwinding does.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.run.load(Ordering::SeqCst) == IDLE
    }

    /// Claim the state for a new search.
    ///
    /// Returns `false` without changing anything if another search owns it,
    /// whether running or aborted but not yet finished.
    #[must_use]
    pub fn try_begin(&self) -> bool {
        self.run
            .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Request cancellation of the running search. Idempotent.
    ///
    /// The run keeps its claim until it observes the abort and finishes.
    pub fn abort(&self) {
        if self
            .run
            .compare_exchange(RUNNING, ABORTING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            log::info!("Search abort requested");
        }
    }

    /// Release the claim. Called by the run itself once it has unwound.
    pub fn finish(&self) {
        self.run.store(IDLE, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

/// Install a Ctrl+C handler that aborts the search tracked by `state`.
///
/// When Ctrl+C is pressed:
/// 1. The running search is aborted and stops at its next checkpoint
/// 2. A message "Interrupted. Cleaning up..." is printed to stderr
///
/// # Errors
///
/// Returns [`SignalError`] if the process already has a Ctrl+C handler.
pub fn install_handler(state: &SearchState) -> Result<(), SignalError> {
    let state = state.clone();
    ctrlc::set_handler(move || {
        state.abort();

        let _ = writeln!(std::io::stderr(), "\nInterrupted. Cleaning up...");
        let _ = std::io::stderr().flush();

        log::info!("Shutdown signal received");
    })?;
    Ok(())
}
