//! Logging setup for copyfinder.
//!
//! Uses the `log` facade with the `env_logger` backend. The level comes from,
//! in priority order:
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//! 3. Default: info level
//!
//! Debug builds prefix each line with a timestamp, and with the module path
//! when verbose. Release builds print level and message only.
//!
//! # Example
//!
//! ```rust,no_run
//! use copyfinder::logging::init_logging;
//!
//! // -vv on the command line
//! init_logging(2, false);
//! log::trace!("hashing block");
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize the logging subsystem from CLI verbosity flags.
///
/// Call once at startup. Later calls leave the first logger in place and
/// log a debug message.
pub fn init_logging(verbose: u8, quiet: bool) {
    let from_env = env::var("RUST_LOG").ok();

    let mut builder = Builder::new();
    match from_env {
        Some(_) => {
            builder.parse_default_env();
        }
        None => {
            builder.filter_level(determine_level(verbose, quiet));
        }
    }
    configure_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
        return;
    }

    match from_env {
        Some(spec) => log::debug!("Logging configured from RUST_LOG={}", spec),
        None => log::debug!("Logging initialized at level: {:?}", log::max_level()),
    }
}

/// Map CLI flags to a level filter. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(debug_assertions)]
fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        let timestamp = buf.timestamp_seconds();

        if verbose > 0 {
            writeln!(
                buf,
                "{timestamp} {style}{level:<5}{style:#} [{}] {}",
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "{timestamp} {style}{level:<5}{style:#} {}", record.args())
        }
    });
}

#[cfg(not(debug_assertions))]
fn configure_format(builder: &mut Builder, _verbose: u8) {
    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}{level:<5}{style:#} {}", record.args())
    });
}
