// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod watch;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::Invocation;
use crate::config::{Config, RawConfig};
use crate::engine::{Outcome, Supervisor};
use crate::errors::Result;
use crate::exec::{Environment, ProcessTrigger, program_name};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - configuration (pattern compilation, output files)
/// - the trigger backend with this process's environment
/// - the supervisor
/// - Ctrl-C handling
pub async fn run(invocation: Invocation) -> Result<Outcome> {
    let raw = RawConfig::from_invocation(invocation, program_name());
    let config = Config::try_from(raw)?;

    let token = CancellationToken::new();

    // Ctrl-C → cancel pending reads and any running trigger.
    {
        let token = token.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; cancelling");
            token.cancel();
        });
    }

    run_config(config, token).await
}

/// Run an already validated configuration until the monitor exits or
/// `token` is cancelled.
pub async fn run_config(config: Config, token: CancellationToken) -> Result<Outcome> {
    let Config {
        patterns,
        monitor,
        trigger,
        retrigger,
        pattern_key,
    } = config;

    debug!(?patterns, key = %pattern_key, "starting supervised run");

    let backend = ProcessTrigger::new(trigger, Environment::from_current(), pattern_key);
    Supervisor::new(monitor, patterns, backend, retrigger, token)
        .run()
        .await
}
