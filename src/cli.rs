// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The command line has three parts:
//!
//! ```text
//! trigger [OPTIONS] PATTERN... -- MONITOR_CMD [ARGS...] ++ TRIGGER_CMD [ARGS...]
//! ```
//!
//! Only the part before the first `--` goes through clap; the two command
//! lines are split off by hand so that their own flags are never interpreted.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use thiserror::Error;

use crate::errors::exit_code;
use crate::exec::output::OutputOptions;

const MONITOR_DELIMITER: &str = "--";
const TRIGGER_DELIMITER: &str = "++";

const AFTER_HELP: &str = "\
Patterns enclosed in slashes (/.../) are regular expressions; anything else
is a glob matched against the whole line.

When the monitor's output matches, TRIGGER_CMD runs with the matched text in
the <PROGNAME>_PATTERN environment variable. Without --retrigger it runs only
for the first match.

Output routing: a command with an output file writes both of its streams
there (add the tee flag to also see them on the terminal). A command without
a file writes both streams to stdout (monitor) or stderr (trigger), unless
the other command has a file, in which case its streams are left as they are.";

/// Command-line flags for `trigger`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "trigger",
    version,
    about = "Run a command, watch its output for patterns, and run another command on a match.",
    long_about = None,
    override_usage = "trigger [OPTIONS] PATTERN... -- MONITOR_CMD [ARGS...] ++ TRIGGER_CMD [ARGS...]",
    after_help = AFTER_HELP
)]
pub struct CliArgs {
    /// Write monitor output to FILE, truncating it first.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub monitor_output: Option<PathBuf>,

    /// Append monitor output to FILE.
    #[arg(short = 'a', long, value_name = "FILE")]
    pub monitor_append: Option<PathBuf>,

    /// Also copy monitor output to stdout when writing it to a file.
    #[arg(short = 't', long)]
    pub monitor_tee: bool,

    /// Write trigger output to FILE, truncating it first.
    #[arg(short = 'O', long, value_name = "FILE")]
    pub trigger_output: Option<PathBuf>,

    /// Append trigger output to FILE.
    #[arg(short = 'A', long, value_name = "FILE")]
    pub trigger_append: Option<PathBuf>,

    /// Also copy trigger output to stderr when writing it to a file.
    #[arg(short = 'T', long)]
    pub trigger_tee: bool,

    /// Run the trigger on every match instead of only the first.
    #[arg(short = 'r', long)]
    pub retrigger: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TRIGGER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Glob or /regex/ patterns to look for in the monitor's output.
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,
}

impl CliArgs {
    pub fn monitor_output(&self) -> OutputOptions {
        OutputOptions {
            overwrite: self.monitor_output.clone(),
            append: self.monitor_append.clone(),
            tee: self.monitor_tee,
        }
    }

    pub fn trigger_output(&self) -> OutputOptions {
        OutputOptions {
            overwrite: self.trigger_output.clone(),
            append: self.trigger_append.clone(),
            tee: self.trigger_tee,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// A fully split command line.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub args: CliArgs,
    pub monitor: Vec<String>,
    pub trigger: Vec<String>,
}

#[derive(Error, Debug)]
pub enum CliError {
    /// `--help` or `--version`; the message is the requested text.
    #[error("{0}")]
    Display(clap::Error),

    #[error("{0}")]
    Parse(clap::Error),

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Display(_) => exit_code::HELP,
            CliError::Parse(_) | CliError::Usage(_) => exit_code::USAGE,
        }
    }

    /// Print the error the way clap would: help/version to stdout, the rest
    /// to stderr with the usage line.
    pub fn print(&self) {
        match self {
            CliError::Display(err) | CliError::Parse(err) => {
                let _ = err.print();
            }
            CliError::Usage(msg) => {
                let usage = CliArgs::command().render_usage();
                eprintln!("trigger: {msg}\n\n{usage}\n\nFor more information, try '--help'.");
            }
        }
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> Self {
        match err.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => CliError::Display(err),
            _ => CliError::Parse(err),
        }
    }
}

/// Parse the process's own arguments.
pub fn parse() -> Result<Invocation, CliError> {
    parse_from(std::env::args_os())
}

/// Parse an argument list whose first element is the program name.
///
/// Errors are reported in a fixed order: flag errors (including help and
/// version requests), missing `--`, missing `++`, no pattern, no monitor
/// command, no trigger command.
pub fn parse_from<I, T>(iter: I) -> Result<Invocation, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let argv: Vec<OsString> = iter.into_iter().map(Into::into).collect();

    let monitor_at = argv
        .iter()
        .skip(1)
        .position(|a| a == MONITOR_DELIMITER)
        .map(|i| i + 1);
    let flags_end = monitor_at.unwrap_or(argv.len());

    // Flags first, so --help and --version work on an otherwise broken line.
    let args = CliArgs::try_parse_from(&argv[..flags_end])?;

    let Some(monitor_at) = monitor_at else {
        return Err(CliError::Usage(format!(
            "missing '{MONITOR_DELIMITER}' before the monitor command"
        )));
    };
    let rest = &argv[monitor_at + 1..];

    let Some(trigger_at) = rest.iter().position(|a| a == TRIGGER_DELIMITER) else {
        return Err(CliError::Usage(format!(
            "missing '{TRIGGER_DELIMITER}' before the trigger command"
        )));
    };

    if args.patterns.is_empty() {
        return Err(CliError::Usage("no PATTERN specified".to_string()));
    }

    let monitor = to_strings(&rest[..trigger_at])?;
    if monitor.is_empty() {
        return Err(CliError::Usage("no monitor command specified".to_string()));
    }

    let trigger = to_strings(&rest[trigger_at + 1..])?;
    if trigger.is_empty() {
        return Err(CliError::Usage("no trigger command specified".to_string()));
    }

    Ok(Invocation {
        args,
        monitor,
        trigger,
    })
}

fn to_strings(args: &[OsString]) -> Result<Vec<String>, CliError> {
    args.iter()
        .map(|a| {
            a.clone().into_string().map_err(|bad| {
                CliError::Usage(format!("argument {bad:?} is not valid UTF-8"))
            })
        })
        .collect()
}
