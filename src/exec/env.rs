// src/exec/env.rs

//! Environment handed to the trigger command.

use std::ffi::{OsStr, OsString};
use std::path::Path;

use tokio::process::Command;

/// Ordered environment: the inherited variables plus overlay entries.
///
/// Setting a key that already exists replaces its value in place, so the
/// child never sees the same key twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: Vec<(OsString, OsString)>,
}

impl Environment {
    /// Snapshot of this process's environment.
    pub fn from_current() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.vars.push((key, value)),
        }
        self
    }

    /// Copy of `self` with one more entry laid over it.
    pub fn with(&self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        let mut env = self.clone();
        env.set(key, value);
        env
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        let key = key.as_ref();
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    /// Replace the command's environment with exactly these variables.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.env_clear();
        cmd.envs(self.iter());
    }
}

/// Turn a program name into a valid environment variable name.
///
/// Uppercases, maps anything outside `[A-Z0-9_]` to `_`, and makes sure the
/// first character is not a digit.
pub fn normalize_env_key(name: &str) -> String {
    name.to_uppercase()
        .chars()
        .enumerate()
        .map(|(i, c)| match c {
            'A'..='Z' | '_' => c,
            '0'..='9' if i > 0 => c,
            _ => '_',
        })
        .collect()
}

/// Name of the variable carrying the matched text, e.g. `TRIGGER_PATTERN`.
pub fn pattern_key(program: &str) -> String {
    format!("{}_PATTERN", normalize_env_key(program))
}

/// File name of the running executable, or the package name if unknown.
pub fn program_name() -> String {
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}
