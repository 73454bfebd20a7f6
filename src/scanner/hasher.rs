//! Streaming content hasher for partial and full fingerprints.
//!
//! # Overview
//!
//! A fingerprint is the file size in bytes followed by the hex digest of the
//! bytes that were read, e.g. `"2" + md5("hi")`. Embedding the size means two
//! files of different length never share a fingerprint, even when their
//! prefixes match.
//!
//! - [`ContentHasher::compute_partial`] reads at most `threshold` bytes. When
//!   the whole file fits under the threshold the partial fingerprint is also
//!   the full one, and a second read is skipped.
//! - [`ContentHasher::compute_full`] always streams the entire file.
//!
//! Both read in blocks of `block_size` bytes (10 MiB by default), so memory use
//! stays bounded regardless of file size.
//!
//! # Example
//!
//! ```no_run
//! use copyfinder::scanner::{ContentHasher, DEFAULT_PREFIX_THRESHOLD};
//! use std::path::Path;
//!
//! let hasher = ContentHasher::new();
//! let digest = hasher
//!     .compute_partial(Path::new("photo.jpg"), DEFAULT_PREFIX_THRESHOLD)
//!     .unwrap();
//! println!("partial: {}", digest.partial);
//! ```

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::HashError;
use crate::signal::SearchState;

/// Default number of leading bytes covered by the partial fingerprint.
pub const DEFAULT_PREFIX_THRESHOLD: u64 = 10 * 1024;

/// Default read block size (10 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 10 * 1024 * 1024;

/// Digest algorithm used for fingerprints.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5: fast, not collision resistant. Fine for a duplicate filter.
    #[default]
    Md5,
    /// BLAKE3: faster on large files and cryptographically strong.
    Blake3,
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Md5 => write!(f, "md5"),
            HashAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}

/// Incremental digest state for one file.
enum StreamDigest {
    Md5(md5::Context),
    Blake3(Box<blake3::Hasher>),
}

impl StreamDigest {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => StreamDigest::Md5(md5::Context::new()),
            HashAlgorithm::Blake3 => StreamDigest::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            StreamDigest::Md5(ctx) => ctx.consume(data),
            StreamDigest::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            StreamDigest::Md5(ctx) => format!("{:x}", ctx.compute()),
            StreamDigest::Blake3(hasher) => hasher.finalize().to_hex().to_string(),
        }
    }
}

/// Result of a partial hashing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDigest {
    /// Size-prefixed digest of the first `threshold` bytes.
    pub partial: String,
    /// Same value as `partial` when the whole file was consumed.
    pub full_if_small: Option<String>,
    /// File size observed before reading.
    pub size: u64,
}

/// Computes size-prefixed content fingerprints.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
    block_size: usize,
    search_state: Option<SearchState>,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            search_state: None,
        }
    }
}

impl ContentHasher {
    /// Create a hasher using MD5 and 10 MiB blocks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the read block size. Values below one byte are raised to one.
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Bind the hasher to a running search.
    ///
    /// Once bound, every block read first checks the search is still in
    /// progress and fails with [`HashError::Interrupted`] otherwise.
    #[must_use]
    pub fn with_search_state(mut self, state: SearchState) -> Self {
        self.search_state = Some(state);
        self
    }

    /// Compute the partial fingerprint of `path` over at most `threshold` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file does not exist, is not a regular
    /// file, cannot be opened, or a read fails.
    pub fn compute_partial(&self, path: &Path, threshold: u64) -> Result<PartialDigest, HashError> {
        let size = self.file_size(path)?;
        let partial = self.digest(path, size, Some(threshold))?;
        let full_if_small = (size <= threshold).then(|| partial.clone());

        log::trace!(
            "Partial hash for {} ({} bytes): {}",
            path.display(),
            size,
            partial
        );

        Ok(PartialDigest {
            partial,
            full_if_small,
            size,
        })
    }

    /// Compute the fingerprint of the entire file content.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] on the same conditions as [`Self::compute_partial`].
    pub fn compute_full(&self, path: &Path) -> Result<String, HashError> {
        let size = self.file_size(path)?;
        let full = self.digest(path, size, None)?;
        log::trace!("Full hash for {} ({} bytes): {}", path.display(), size, full);
        Ok(full)
    }

    fn file_size(&self, path: &Path) -> Result<u64, HashError> {
        let metadata = fs::metadata(path).map_err(|e| HashError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(HashError::NotAFile(path.to_path_buf()));
        }
        Ok(metadata.len())
    }

    /// Stream `path` through the digest, stopping at `limit` bytes if given.
    fn digest(&self, path: &Path, size: u64, limit: Option<u64>) -> Result<String, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let expected = limit.map_or(size, |l| l.min(size));
        let mut reader: Box<dyn Read> = match limit {
            Some(l) => Box::new(file.take(l)),
            None => Box::new(file),
        };

        let mut digest = StreamDigest::new(self.algorithm);
        let mut buffer = vec![0u8; self.buffer_len(expected)];

        loop {
            if self.is_interrupted() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            digest.update(&buffer[..read]);
        }

        Ok(format!("{}{}", size, digest.finalize_hex()))
    }

    fn buffer_len(&self, expected: u64) -> usize {
        let expected = usize::try_from(expected).unwrap_or(usize::MAX);
        self.block_size.min(expected).max(1)
    }

    fn is_interrupted(&self) -> bool {
        self.search_state
            .as_ref()
            .is_some_and(|state| !state.is_in_progress())
    }
}
