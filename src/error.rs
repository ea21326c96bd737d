use std::io;
use std::string::FromUtf8Error;
use std::time::Duration;

use thiserror::Error;

/// Argument errors, rejected before any probe process is started.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("invalid host {0:?}")]
    InvalidHost(String),
    #[error("probe count must be between 1 and {max}, got {got}")]
    InvalidCount { got: u32, max: u32 },
    #[error("probe timeout must be greater than zero")]
    InvalidTimeout,
    #[error("optimization level must be between 1 and {max}, got {got}")]
    InvalidLevel { got: u8, max: u8 },
}

/// Faults hit while running a probe. The executor folds these into a
/// non-success result; they never reach callers.
#[derive(Debug, Error)]
pub(crate) enum ProbeFault {
    #[error("probe did not finish within {0:?}")]
    Timeout(Duration),
    #[error("probe command is empty")]
    EmptyCommand,
    #[error("failed to spawn {program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("probe i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("probe output is not valid UTF-8: {0}")]
    Decode(#[from] FromUtf8Error),
}
