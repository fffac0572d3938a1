// src/exec/backend.rs

//! Pluggable trigger backend abstraction.
//!
//! The orchestrator talks to a `TriggerBackend` instead of spawning processes
//! itself. This keeps the firing policy testable with a fake backend while
//! the production implementation lives in [`ProcessTrigger`].
//!
//! - `ProcessTrigger` runs the configured trigger command to completion with
//!   the matched text in its environment.
//! - Tests can provide their own `TriggerBackend` that, for example, records
//!   which texts were fired and checks that runs never overlap.

use std::future::Future;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, TriggerError};
use crate::exec::command::{CommandSpec, describe_exit};
use crate::exec::env::Environment;
use crate::exec::output::ChildOutput;
use crate::watch::reader::Interleave;

/// Trait abstracting how the trigger command is launched.
///
/// `fire` must only resolve once the launch is completely finished; the
/// orchestrator relies on this to keep trigger runs sequential.
pub trait TriggerBackend: Send {
    /// Run the trigger once for `matched`.
    ///
    /// When `token` is cancelled the run must be stopped and reaped before
    /// `fire` resolves with [`TriggerError::Canceled`]. Any error is fatal
    /// for the whole program; there is no retry.
    fn fire(
        &mut self,
        matched: String,
        token: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real backend: spawns the trigger command and waits for it.
#[derive(Debug)]
pub struct ProcessTrigger {
    spec: CommandSpec,
    env: Environment,
    pattern_key: String,
}

impl ProcessTrigger {
    pub fn new(spec: CommandSpec, env: Environment, pattern_key: impl Into<String>) -> Self {
        Self {
            spec,
            env,
            pattern_key: pattern_key.into(),
        }
    }

    fn failed(&self, reason: impl Into<String>) -> TriggerError {
        TriggerError::TriggerFailed {
            cmd: self.spec.to_string(),
            reason: reason.into(),
        }
    }

    async fn run(&self, matched: &str, token: &CancellationToken) -> Result<()> {
        let mut cmd = self.spec.command();
        self.env.with(&self.pattern_key, matched).apply(&mut cmd);

        info!(
            cmd = %self.spec,
            key = %self.pattern_key,
            matched = %matched,
            "running trigger command"
        );

        let output = self
            .spec
            .route
            .child_output()
            .map_err(|e| self.failed(format!("preparing output: {e}")))?;

        let status = match output {
            ChildOutput::Direct { stdout, stderr } => {
                cmd.stdout(stdout).stderr(stderr);
                let mut child = cmd
                    .spawn()
                    .map_err(|e| self.failed(format!("cannot start: {e}")))?;
                tokio::select! {
                    status = child.wait() => status,
                    _ = token.cancelled() => return Err(self.stop(&mut child).await),
                }
                .map_err(|e| self.failed(format!("waiting for exit: {e}")))?
            }
            ChildOutput::Piped(mut writer) => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
                let mut child = cmd
                    .spawn()
                    .map_err(|e| self.failed(format!("cannot start: {e}")))?;
                let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take())
                else {
                    return Err(self.failed("output pipes unavailable"));
                };

                let mut merged = Interleave::new(stdout, stderr);
                let (copied, status) = tokio::select! {
                    done = async {
                        tokio::join!(tokio::io::copy(&mut merged, &mut writer), child.wait())
                    } => done,
                    _ = token.cancelled() => return Err(self.stop(&mut child).await),
                };
                let copied = copied.map_err(|e| self.failed(format!("copying output: {e}")))?;
                writer
                    .flush()
                    .await
                    .map_err(|e| self.failed(format!("copying output: {e}")))?;
                debug!(bytes = copied, "tee'd trigger output");
                status.map_err(|e| self.failed(format!("waiting for exit: {e}")))?
            }
        };

        check_status(status).map_err(|reason| self.failed(reason))
    }

    /// Kill a running trigger on cancellation and wait for it to go away.
    async fn stop(&self, child: &mut Child) -> TriggerError {
        info!(cmd = %self.spec, pid = ?child.id(), "cancellation requested; stopping trigger command");
        if let Err(e) = child.kill().await {
            warn!(cmd = %self.spec, error = %e, "failed to stop trigger command");
        }
        TriggerError::Canceled
    }
}

fn check_status(status: ExitStatus) -> std::result::Result<(), String> {
    if status.success() {
        Ok(())
    } else {
        Err(describe_exit(status))
    }
}

impl TriggerBackend for ProcessTrigger {
    fn fire(
        &mut self,
        matched: String,
        token: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { self.run(&matched, &token).await })
    }
}
