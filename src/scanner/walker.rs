//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! The [`Walker`] turns a root directory into a lazy, finite stream of
//! [`WalkEntry`] values. Children of every directory are sorted by name, so
//! the discovery order is stable between runs. Hidden entries (names starting
//! with `.`) are pruned before descent when [`WalkerConfig::skip_hidden`] is
//! set; the root itself is never pruned.
//!
//! Errors for individual entries are yielded as [`ScanError`] values rather
//! than stopping iteration. A walk cannot be restarted midway; call
//! [`Walker::walk`] again to start over from the root.
//!
//! # Example
//!
//! ```no_run
//! use copyfinder::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! let files = walker
//!     .walk()
//!     .filter_map(Result::ok)
//!     .filter(|e| !e.is_dir)
//!     .count();
//! println!("{} files", files);
//! ```

use std::ffi::OsStr;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use super::{ScanError, WalkerConfig};

/// A single filesystem entry produced by the walker.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Full path of the entry
    pub path: PathBuf,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Whether the entry name marks it hidden
    pub is_hidden: bool,
}

impl WalkEntry {
    /// Fetch metadata for the entry without following symlinks.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the entry vanished or cannot be inspected.
    pub fn metadata(&self) -> Result<Metadata, ScanError> {
        std::fs::symlink_metadata(&self.path).map_err(|e| io_error(&self.path, e))
    }
}

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Walk the directory tree, yielding every entry below the root.
    pub fn walk(&self) -> impl Iterator<Item = Result<WalkEntry, ScanError>> + '_ {
        let skip_hidden = self.config.skip_hidden;

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .process_read_dir(move |depth, _path, _read_dir_state, children| {
                // Sort children for deterministic discovery order
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
                // The root arrives here too, with no depth; it is never pruned
                if skip_hidden && depth.is_some() {
                    children.retain(|child| match child {
                        Ok(entry) => !is_hidden(entry.file_name()),
                        Err(_) => true,
                    });
                }
            });

        walk_dir.into_iter().filter_map(move |entry_result| match entry_result {
            Ok(entry) => {
                let path = entry.path();

                // Skip the root directory itself
                if path == self.root {
                    return None;
                }

                Some(Ok(WalkEntry {
                    is_dir: entry.file_type().is_dir(),
                    is_hidden: is_hidden(entry.file_name()),
                    path,
                }))
            }
            Err(e) => {
                let path = e
                    .path()
                    .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                log::debug!("Walker error for {}: {}", path.display(), e);
                Some(Err(match e.io_error().map(std::io::Error::kind) {
                    Some(std::io::ErrorKind::PermissionDenied) => ScanError::PermissionDenied(path),
                    Some(std::io::ErrorKind::NotFound) => ScanError::NotFound(path),
                    _ => ScanError::Io {
                        path,
                        source: std::io::Error::other(e.to_string()),
                    },
                }))
            }
        })
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn io_error(path: &Path, error: std::io::Error) -> ScanError {
    match error.kind() {
        std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(path.to_path_buf()),
        std::io::ErrorKind::NotFound => ScanError::NotFound(path.to_path_buf()),
        _ => ScanError::Io {
            path: path.to_path_buf(),
            source: error,
        },
    }
}
