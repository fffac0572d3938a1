// src/config/model.rs

use crate::cli::Invocation;
use crate::exec::command::CommandSpec;
use crate::exec::output::OutputOptions;
use crate::watch::patterns::PatternSet;

/// Configuration as given on the command line, before any checks.
///
/// Nothing here has been compiled or opened yet. Build one with
/// [`RawConfig::from_invocation`] (or field by field in tests) and turn it
/// into a [`Config`] with `Config::try_from`.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    /// Pattern strings in match-precedence order.
    pub patterns: Vec<String>,

    /// Monitor program followed by its arguments.
    pub monitor: Vec<String>,

    /// Trigger program followed by its arguments.
    pub trigger: Vec<String>,

    pub monitor_output: OutputOptions,
    pub trigger_output: OutputOptions,

    /// Fire on every match instead of only the first.
    pub retrigger: bool,

    /// Name the pattern environment variable is derived from.
    pub program: String,
}

impl RawConfig {
    pub fn from_invocation(invocation: Invocation, program: impl Into<String>) -> Self {
        let monitor_output = invocation.args.monitor_output();
        let trigger_output = invocation.args.trigger_output();
        Self {
            patterns: invocation.args.patterns,
            monitor: invocation.monitor,
            trigger: invocation.trigger,
            monitor_output,
            trigger_output,
            retrigger: invocation.args.retrigger,
            program: program.into(),
        }
    }
}

/// Validated configuration.
///
/// Only constructed via `TryFrom<RawConfig>`, so holding one means the
/// patterns compiled and the output files are open.
#[derive(Debug)]
pub struct Config {
    pub patterns: PatternSet,
    pub monitor: CommandSpec,
    pub trigger: CommandSpec,
    pub retrigger: bool,
    /// Environment variable carrying the matched text, e.g. `TRIGGER_PATTERN`.
    pub pattern_key: String,
}

impl Config {
    pub(crate) fn new_unchecked(
        patterns: PatternSet,
        monitor: CommandSpec,
        trigger: CommandSpec,
        retrigger: bool,
        pattern_key: String,
    ) -> Self {
        Self {
            patterns,
            monitor,
            trigger,
            retrigger,
            pattern_key,
        }
    }
}
