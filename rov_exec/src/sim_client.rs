//! # Simulation Client
//!
//! The SimClient provides per-tick telemetry from a recorded simulator run. Recordings are
//! newline-delimited JSON, one [`Telemetry`] record per tick, each optionally carrying the
//! forward camera frame.
//!
//! Lines which cannot be parsed are reported and skipped so that a single corrupt record does not
//! end the run.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use comms_if::eqpt::rover::Telemetry;
use log::warn;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimClient<R> {
    reader: R,

    /// Number of the last line read, starting from 1
    line_num: usize,

    /// Number of lines which were skipped as unparseable
    num_rejected: usize,

    line: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimClientError {
    #[error("Could not open the telemetry recording: {0}")]
    OpenError(std::io::Error),

    #[error("Could not read from the telemetry recording: {0}")]
    ReadError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimClient<BufReader<File>> {
    /// Open a recording file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SimClientError> {
        let file = File::open(path).map_err(SimClientError::OpenError)?;

        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> SimClient<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line_num: 0,
            num_rejected: 0,
            line: String::new(),
        }
    }

    /// Get the telemetry for the next tick, or `None` at the end of the recording.
    pub fn next_telemetry(&mut self) -> Result<Option<Telemetry>, SimClientError> {
        loop {
            self.line.clear();

            let n = self
                .reader
                .read_line(&mut self.line)
                .map_err(SimClientError::ReadError)?;

            if n == 0 {
                return Ok(None);
            }

            self.line_num += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match Telemetry::from_json(trimmed) {
                Ok(t) => return Ok(Some(t)),
                Err(e) => {
                    warn!("Skipping telemetry line {}: {}", self.line_num, e);
                    self.num_rejected += 1;
                }
            }
        }
    }

    pub fn num_rejected(&self) -> usize {
        self.num_rejected
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
