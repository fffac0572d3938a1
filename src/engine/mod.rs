// src/engine/mod.rs

//! Orchestration engine for trigger.
//!
//! This module ties together:
//! - the rendezvous channel carrying match notifications ([`notify`])
//! - the completion barrier and fire counter shared by all tasks ([`barrier`])
//! - the single consumer applying the once/repeat policy ([`orchestrator`])
//! - the supervisor that runs the monitor and waits for everything to settle
//!   ([`supervisor`])

pub mod barrier;
pub mod notify;
pub mod orchestrator;
pub mod supervisor;

pub use barrier::{CompletionBarrier, FireCounter};
pub use notify::{Notification, NotificationStream, Notifier, NotifyError, channel};
pub use orchestrator::TriggerOrchestrator;
pub use supervisor::{Outcome, Supervisor};
