// src/errors.rs

//! Crate-wide error type and the process exit-status taxonomy.
//!
//! Every fatal condition maps to exactly one exit code via
//! [`TriggerError::exit_code`]. The "no match" outcome is not an error; it is
//! reported through [`crate::engine::Outcome`] and has its own code.

use std::path::PathBuf;

use thiserror::Error;

use crate::watch::patterns::PatternError;
use crate::watch::watcher::WatchError;

/// Exit codes. Values are distinct per failure category.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const USAGE: i32 = 1;
    pub const OUTPUT_OPEN: i32 = 2;
    pub const HELP: i32 = 3;
    pub const NO_MATCH: i32 = 4;
    pub const STDOUT_PIPE: i32 = 5;
    pub const STDERR_PIPE: i32 = 6;
    pub const TRIGGER_FAILED: i32 = 7;
    /// Also reported when the run is cancelled.
    pub const WATCH_FAILED: i32 = 8;
    pub const MONITOR_SPAWN: i32 = 9;
    pub const MONITOR_EXIT: i32 = 10;
}

/// Which of the monitor's two output pipes an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for PipeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipeStream::Stdout => f.write_str("stdout"),
            PipeStream::Stderr => f.write_str("stderr"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Command-line error: {0}")]
    Usage(String),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("cannot open output file {path:?}: {source}")]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open monitor {stream} pipe for `{cmd}`")]
    PipeOpen { stream: PipeStream, cmd: String },

    #[error("cannot start monitor command `{cmd}`: {source}")]
    SpawnMonitor {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("monitor command `{cmd}` failed: {reason}")]
    MonitorExit { cmd: String, reason: String },

    #[error("trigger command `{cmd}` failed: {reason}")]
    TriggerFailed { cmd: String, reason: String },

    #[error("trigger orchestrator panicked")]
    OrchestratorPanicked,

    #[error("canceled")]
    Canceled,

    #[error("watching monitor {stream} failed: {source}")]
    Watch {
        stream: &'static str,
        #[source]
        source: WatchError,
    },
}

impl TriggerError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            TriggerError::Usage(_) | TriggerError::Pattern(_) => exit_code::USAGE,
            TriggerError::OutputOpen { .. } => exit_code::OUTPUT_OPEN,
            TriggerError::PipeOpen {
                stream: PipeStream::Stdout,
                ..
            } => exit_code::STDOUT_PIPE,
            TriggerError::PipeOpen {
                stream: PipeStream::Stderr,
                ..
            } => exit_code::STDERR_PIPE,
            TriggerError::SpawnMonitor { .. } => exit_code::MONITOR_SPAWN,
            TriggerError::MonitorExit { .. } => exit_code::MONITOR_EXIT,
            TriggerError::TriggerFailed { .. } | TriggerError::OrchestratorPanicked => {
                exit_code::TRIGGER_FAILED
            }
            TriggerError::Watch { .. } | TriggerError::Canceled => exit_code::WATCH_FAILED,
        }
    }
}

pub type Result<T> = std::result::Result<T, TriggerError>;
