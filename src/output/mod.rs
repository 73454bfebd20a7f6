//! Output formatters for search results.
//!
//! - [`text`]: human-readable report for the terminal
//! - [`json`]: machine-readable report for scripting
//!
//! # Example
//!
//! ```no_run
//! use std::time::Instant;
//! use copyfinder::duplicates::{CopySearchEngine, EngineConfig, ScanSummary, SearchProcessor};
//! use copyfinder::error::ExitCode;
//! use copyfinder::output::JsonOutput;
//! use copyfinder::progress::SilentProgress;
//!
//! let processor = SearchProcessor::new(CopySearchEngine::new(".", EngineConfig::default()));
//! let started = Instant::now();
//! let groups = processor.launch(&SilentProgress).unwrap();
//! let summary = ScanSummary::new(&groups, processor.engine().stats(), started.elapsed());
//!
//! let output = JsonOutput::new(&groups, &summary, ExitCode::for_groups(groups.len()));
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::JsonOutput;
pub use text::TextOutput;
