//! Command-line interface definitions for copyfinder.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, error format, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Scan the home directory
//! copyfinder scan
//!
//! # Scan with JSON output for scripting
//! copyfinder scan ~/Downloads --output json
//!
//! # Compare the first 64 KiB instead of 10 KiB in the coarse pass
//! copyfinder scan ~/Downloads --threshold 64KiB
//!
//! # Verbose mode for debugging
//! copyfinder -v scan ~/Downloads
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;
use crate::scanner::HashAlgorithm;

/// Duplicate file finder.
///
/// copyfinder narrows candidates cheaply with a size-prefixed hash of each
/// file's first bytes and confirms the survivors with a full-content hash.
#[derive(Debug, Parser)]
#[command(name = "copyfinder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Read configuration from this file instead of the platform default
    #[arg(long, value_name = "PATH", global = true, env = "COPYFINDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for copyfinder.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan (defaults to the home directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Leading bytes compared in the coarse pass (e.g., 10KiB, 1MB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub threshold: Option<u64>,

    /// Read block size for hashing (e.g., 1MiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub block_size: Option<u64>,

    /// Digest algorithm for fingerprints
    #[arg(long, value_enum)]
    pub algorithm: Option<HashAlgorithm>,

    /// Include hidden files and directories (starting with .)
    #[arg(long)]
    pub include_hidden: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl ScanArgs {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(threshold) = self.threshold {
            config.prefix_threshold = threshold;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = usize::try_from(block_size).unwrap_or(usize::MAX);
        }
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if self.include_hidden {
            config.skip_hidden = false;
        }
        if self.no_progress {
            config.progress = false;
        }
    }
}

/// Arguments for the config subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write the effective configuration to the config file
    #[arg(long)]
    pub save: bool,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use copyfinder::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("10KiB").unwrap(), 10_240);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
