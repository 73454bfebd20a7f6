//! copyfinder - duplicate file finder
//!
//! Finds duplicate files in a directory tree in three levels, cheapest first:
//! an index of every file with a hash of its first bytes, a coarse grouping
//! by that partial hash, and a full-content hash over the coarse survivors
//! only.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use cli::{Cli, Commands, ConfigArgs, OutputFormat, ScanArgs};
use config::Config;
use duplicates::{CopySearchEngine, EngineConfig, ScanSummary, SearchProcessor};
use error::ExitCode;
use output::{JsonOutput, TextOutput};
use progress::Progress;

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error if the search fails or is aborted, or output cannot be written.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    match &cli.command {
        Commands::Scan(args) => {
            args.apply(&mut config);
            run_scan(args, &config, cli.quiet)
        }
        Commands::Config(args) => run_config(args, &config, cli.config.as_deref()),
    }
}

fn run_scan(args: &ScanArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let engine_config = EngineConfig::from(config);
    let engine = match &args.path {
        Some(path) => CopySearchEngine::new(path.clone(), engine_config),
        None => CopySearchEngine::for_home(engine_config)?,
    };
    log::debug!("Search root: {}", engine.root().display());

    let processor = Arc::new(SearchProcessor::new(engine));
    if let Err(e) = signal::install_handler(processor.engine().state()) {
        log::warn!("{}", e);
    }

    let progress = Progress::new(quiet || !config.progress);
    let started = Instant::now();

    let handle = Arc::clone(&processor)
        .spawn()
        .context("Failed to start search worker")?;
    let groups = handle.wait(&progress)?;

    let summary = ScanSummary::new(&groups, processor.engine().stats(), started.elapsed());
    let exit_code = ExitCode::for_groups(groups.len());
    log::info!(
        "{} duplicate groups, {} reclaimable",
        summary.duplicate_groups,
        summary.reclaimable_display()
    );

    let mut stdout = io::stdout().lock();
    match args.output {
        OutputFormat::Text => TextOutput::new(&groups, &summary).write_to(&mut stdout)?,
        OutputFormat::Json => {
            JsonOutput::new(&groups, &summary, exit_code).write_to(&mut stdout, true)?;
        }
    }

    Ok(exit_code)
}

fn run_config(args: &ConfigArgs, config: &Config, explicit_path: Option<&Path>) -> Result<ExitCode> {
    print!("{}", config.to_toml()?);

    if args.save {
        let path = explicit_path
            .map(Path::to_path_buf)
            .or_else(Config::config_path)
            .context("No configuration directory available")?;
        config.save(&path)?;
    }

    Ok(ExitCode::Success)
}
