//! Scanner module for directory traversal and file fingerprinting.
//!
//! This module provides functionality for:
//! - Sorted directory walking using jwalk
//! - Partial (prefix) and full content fingerprints
//! - The [`FileRecord`] entity that carries both through the search levels
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and entry discovery
//! - [`hasher`]: Streaming MD5/BLAKE3 fingerprints
//!
//! # Example
//!
//! ```no_run
//! use copyfinder::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(entry) if !entry.is_dir => println!("{}", entry.path.display()),
//!         Ok(_) => {}
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::duplicates::SearchLevel;

// Re-export main types
pub use hasher::{
    ContentHasher, HashAlgorithm, PartialDigest, DEFAULT_BLOCK_SIZE, DEFAULT_PREFIX_THRESHOLD,
};
pub use walker::{WalkEntry, Walker};

/// Memoized full-content fingerprint of a record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FullHash {
    /// Not computed yet.
    #[default]
    Unset,
    /// Digest of the entire file content.
    Computed(String),
}

impl FullHash {
    /// The computed value, if any.
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            FullHash::Unset => None,
            FullHash::Computed(hash) => Some(hash.as_str()),
        }
    }
}

/// A regular file discovered during indexing.
///
/// Metadata is captured once at enumeration time. The partial fingerprint is
/// always present; the full fingerprint is computed at most once, on demand.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Absolute path to the file; identity key within a scan
    pub path: PathBuf,
    /// File name for display
    pub display_name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
    partial_hash: String,
    full_hash: FullHash,
}

impl FileRecord {
    /// Build a record from enumeration metadata and a partial digest.
    ///
    /// If the digest covered the whole file, the full hash is already known.
    #[must_use]
    pub fn new(path: PathBuf, modified: SystemTime, digest: PartialDigest) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            path,
            display_name,
            size: digest.size,
            modified,
            partial_hash: digest.partial,
            full_hash: digest.full_if_small.map_or(FullHash::Unset, FullHash::Computed),
        }
    }

    /// Size-prefixed digest of the file's leading bytes.
    #[must_use]
    pub fn partial_hash(&self) -> &str {
        &self.partial_hash
    }

    /// The full-content fingerprint, if it has been computed.
    #[must_use]
    pub fn full_hash(&self) -> Option<&str> {
        self.full_hash.as_deref()
    }

    /// Return the full fingerprint, computing and memoizing it first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file can no longer be read.
    pub fn ensure_full_hash(&mut self, hasher: &ContentHasher) -> Result<&str, HashError> {
        if let FullHash::Unset = self.full_hash {
            let full = hasher.compute_full(&self.path)?;
            self.full_hash = FullHash::Computed(full);
        }
        Ok(self.full_hash.as_deref().unwrap_or_default())
    }

    /// Fingerprint used to compare records at `level`.
    ///
    /// # Errors
    ///
    /// Only the full level touches the filesystem; see [`Self::ensure_full_hash`].
    pub fn fingerprint(
        &mut self,
        level: SearchLevel,
        hasher: &ContentHasher,
    ) -> Result<&str, HashError> {
        match level {
            SearchLevel::Index | SearchLevel::Coarse => Ok(&self.partial_hash),
            SearchLevel::Full => self.ensure_full_hash(hasher),
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self { skip_hidden: true }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
///
/// The engine treats every variant except `Interrupted` as "file not found":
/// the record can no longer be trusted.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path exists but is not a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The owning search was aborted while the file was being read.
    #[error("Hashing interrupted: {0}")]
    Interrupted(PathBuf),
}

impl HashError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
            _ => HashError::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path of the file that failed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            HashError::NotFound(path)
            | HashError::PermissionDenied(path)
            | HashError::NotAFile(path)
            | HashError::Interrupted(path)
            | HashError::Io { path, .. } => path,
        }
    }
}
