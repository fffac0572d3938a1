// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] describes a command to run (program, args, output route).
//! - [`output`] resolves where each command's output goes and provides the
//!   sink writers (files, inherited streams, tees).
//! - [`env`] builds the environment handed to the trigger command.
//! - [`backend`] provides the `TriggerBackend` trait and the concrete
//!   `ProcessTrigger` the orchestrator uses in production, and which tests
//!   can replace with a fake implementation.

pub mod backend;
pub mod command;
pub mod env;
pub mod output;

pub use backend::{ProcessTrigger, TriggerBackend};
pub use command::{CommandSpec, describe_exit};
pub use env::{Environment, normalize_env_key, pattern_key, program_name};
pub use output::{OutputOptions, Route, Sink, StdStream, resolve_routes};
