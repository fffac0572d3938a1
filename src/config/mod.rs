// src/config/mod.rs

//! Run configuration for trigger.
//!
//! Responsibilities:
//! - Define the raw, unchecked configuration built from the command line
//!   and the validated configuration the engine runs on (`model.rs`).
//! - Validate it: compile patterns, check both commands are present and open
//!   the output files (`validate.rs`).
//!
//! There is no config file; everything comes from the invocation.

pub mod model;
pub mod validate;

pub use model::{Config, RawConfig};
