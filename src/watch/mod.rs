// src/watch/mod.rs

//! Monitor output watching.
//!
//! This module is responsible for:
//! - Compiling the configured glob / regex patterns ([`patterns`]).
//! - Wrapping the monitor's pipes in cancellable, optionally merged byte
//!   sources ([`reader`]).
//! - Scanning those sources line by line, echoing every byte to the output
//!   sink and reporting matches to the orchestrator ([`watcher`]).
//!
//! It knows nothing about the trigger command; it only turns output lines
//! into notifications.

pub mod patterns;
pub mod reader;
pub mod watcher;

pub use patterns::{Pattern, PatternError, PatternKind, PatternSet, classify};
pub use reader::{CancellableReader, Interleave, ReadCanceled, is_read_canceled};
pub use watcher::{WatchError, WatchSummary, watch};
