// src/exec/command.rs

//! Command specifications for the monitor and trigger processes.

use std::fmt;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

use crate::exec::output::Route;

/// Executable, arguments and resolved output route of one command.
///
/// Built once from the parsed command line and never mutated afterwards.
#[derive(Debug)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub route: Route,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>, route: Route) -> Self {
        Self {
            program: program.into(),
            args,
            route,
        }
    }

    /// A fresh process builder for this command. stdin is the null device;
    /// stdout/stderr are left for the caller to wire up.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Human-readable description of a non-successful exit.
pub fn describe_exit(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exited with status {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {signal}");
        }
    }
    "terminated abnormally".to_string()
}
