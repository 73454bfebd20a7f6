//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory, or the file given with `--config`
//! 3. `COPYFINDER_*` environment variables (e.g. `COPYFINDER_PREFIX_THRESHOLD=65536`)
//! 4. Command-line flags, applied by the caller
//!
//! A file that fails to parse is reported with a warning and the defaults are
//! used instead.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scanner::{HashAlgorithm, DEFAULT_BLOCK_SIZE, DEFAULT_PREFIX_THRESHOLD};

/// Prefix of environment variables read as configuration.
pub const ENV_PREFIX: &str = "COPYFINDER_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Leading bytes covered by the partial fingerprint.
    pub prefix_threshold: u64,
    /// Read block size for hashing.
    pub block_size: usize,
    /// Digest algorithm.
    pub algorithm: HashAlgorithm,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Show progress bars.
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix_threshold: DEFAULT_PREFIX_THRESHOLD,
            block_size: DEFAULT_BLOCK_SIZE,
            algorithm: HashAlgorithm::default(),
            skip_hidden: true,
            progress: true,
        }
    }
}

impl Config {
    /// Load the configuration from the default platform-specific path.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from_path(&path),
            None => {
                log::debug!("No config directory available, using defaults and environment");
                Self::extract(Self::figment(None))
            }
        }
    }

    /// Load the configuration from `path`, layered over defaults and under
    /// the environment.
    pub fn load_from_path(path: &Path) -> Self {
        if path.exists() {
            log::debug!("Loading config from {}", path.display());
        }
        Self::extract(Self::figment(Some(path)))
    }

    /// Build the provider stack without extracting it.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Self {
        match figment.extract() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Save the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "copyfinder", "copyfinder")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
