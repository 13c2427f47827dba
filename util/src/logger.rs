//! Session logger
//!
//! Records go to stdout and to the session log file, each tagged with the time since the session
//! epoch and the cycle the executable is running, e.g.:
//!
//! ```text
//! [  12.345678 #310 INF] Decision mode change: forward -> stop
//! ```
//!
//! Records emitted before the first cycle are tagged `init`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::sync::atomic::{AtomicU64, Ordering};
use log::{self, info};
use colored::{ColoredString, Colorize};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// Stored in `CURRENT_CYCLE` until the first cycle starts.
const NO_CYCLE: u64 = u64::MAX;

static CURRENT_CYCLE: AtomicU64 = AtomicU64::new(NO_CYCLE);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` must let `INFO` records through, so that mode changes and the run summary are
/// always in the session log. Must only be called once per process.
pub fn logger_init(
    min_level: self::LevelFilter,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            let prefix = format!(
                "[{:10.6} {} {}]",
                session::get_elapsed_seconds(),
                cycle_tag(CURRENT_CYCLE.load(Ordering::Relaxed)),
                level_to_str(record.level())
            );

            // Debug and trace records carry the module they came from
            if record.level() > log::Level::Info {
                out.finish(format_args!("{} {}: {}", prefix, record.target(), message))
            }
            else {
                out.finish(format_args!("{} {}", prefix, message))
            }
        })
        .level(min_level)
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!(
        "Logging to {:?} at {:?} and above, session epoch {}",
        session.log_file_path,
        min_level,
        session::get_epoch()
    );

    Ok(())
}

/// Set the cycle number shown on subsequent records.
pub fn set_cycle(cycle: u64) {
    CURRENT_CYCLE.store(cycle, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn cycle_tag(cycle: u64) -> String {
    if cycle == NO_CYCLE {
        String::from("init")
    }
    else {
        format!("#{}", cycle)
    }
}

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info  => "INF".normal(),
        log::Level::Warn  => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
