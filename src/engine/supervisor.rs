// src/engine/supervisor.rs

//! Process supervisor: runs the monitor command and wires up the watchers
//! and the orchestrator around it.

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::engine::barrier::{CompletionBarrier, FireCounter};
use crate::engine::notify::{self, Notifier};
use crate::engine::orchestrator::TriggerOrchestrator;
use crate::errors::{PipeStream, Result, TriggerError, exit_code};
use crate::exec::command::{CommandSpec, describe_exit};
use crate::exec::output::{BoxedWriter, Route, StdStream};
use crate::exec::TriggerBackend;
use crate::watch::patterns::PatternSet;
use crate::watch::reader::{CancellableReader, Interleave};
use crate::watch::watcher::{WatchError, watch};

/// How a supervised run ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// At least one notification was processed and the monitor exited cleanly.
    Matched { notifications: usize },
    /// The monitor exited cleanly but no line ever matched.
    NoMatch,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Matched { .. } => exit_code::SUCCESS,
            Outcome::NoMatch => exit_code::NO_MATCH,
        }
    }
}

/// Everything shared by the watcher tasks.
#[derive(Clone)]
struct WatchContext {
    notifier: Notifier,
    patterns: Arc<PatternSet>,
    barrier: Arc<CompletionBarrier>,
    token: CancellationToken,
    failures: mpsc::UnboundedSender<TriggerError>,
}

/// Supervises one monitor/trigger pair for the lifetime of the monitor.
pub struct Supervisor<B> {
    monitor: CommandSpec,
    patterns: Arc<PatternSet>,
    backend: B,
    repeat: bool,
    token: CancellationToken,
}

impl<B> fmt::Debug for Supervisor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("monitor", &self.monitor.to_string())
            .field("patterns", &self.patterns.len())
            .field("repeat", &self.repeat)
            .finish_non_exhaustive()
    }
}

impl<B: TriggerBackend + 'static> Supervisor<B> {
    pub fn new(
        monitor: CommandSpec,
        patterns: PatternSet,
        backend: B,
        repeat: bool,
        token: CancellationToken,
    ) -> Self {
        Self {
            monitor,
            patterns: Arc::new(patterns),
            backend,
            repeat,
            token,
        }
    }

    /// Run the monitor to completion.
    ///
    /// 1. Start the orchestrator.
    /// 2. Spawn the monitor with both output streams piped.
    /// 3. Watch the streams: one merged watcher when both share a sink,
    ///    otherwise one watcher per stream.
    /// 4. Wait until every watcher is done and every notification handled,
    ///    aborting on the first watcher or trigger failure.
    /// 5. Wait for the monitor to exit and report whether anything matched.
    pub async fn run(self) -> Result<Outcome> {
        let Supervisor {
            monitor,
            patterns,
            backend,
            repeat,
            token,
        } = self;

        let watchers = match monitor.route {
            Route::Combined(_) => 1,
            Route::Split => 2,
        };
        let barrier = Arc::new(CompletionBarrier::new(watchers));
        let fired = Arc::new(FireCounter::new());
        let (notifier, notes) = notify::channel(token.clone());
        let (failures, mut failed) = mpsc::unbounded_channel::<TriggerError>();

        // The orchestrator must be listening before the monitor can produce
        // anything.
        let orchestrator =
            TriggerOrchestrator::new(backend, repeat, Arc::clone(&fired), Arc::clone(&barrier));
        let orchestrator_handle = {
            let token = token.clone();
            let failures = failures.clone();
            let mut notes = notes;
            tokio::spawn(async move {
                let _exit = TaskExit {
                    failures: failures.clone(),
                    on_panic: Some(TriggerError::OrchestratorPanicked),
                    release: None,
                };
                if let Err(err) = orchestrator.run(&mut notes, token).await {
                    let _ = failures.send(err);
                }
                // Closing the channel wakes blocked watchers; the real cause
                // is already queued ahead of their errors.
                drop(notes);
            })
        };

        let mut cmd = monitor.command();
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|source| TriggerError::SpawnMonitor {
            cmd: monitor.to_string(),
            source,
        })?;
        info!(cmd = %monitor, pid = ?child.id(), route = %monitor.route, "monitor command started");

        let stdout = child.stdout.take().ok_or_else(|| TriggerError::PipeOpen {
            stream: PipeStream::Stdout,
            cmd: monitor.to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| TriggerError::PipeOpen {
            stream: PipeStream::Stderr,
            cmd: monitor.to_string(),
        })?;

        let ctx = WatchContext {
            notifier,
            patterns,
            barrier: Arc::clone(&barrier),
            token: token.clone(),
            failures,
        };

        let mut handles = Vec::with_capacity(watchers);
        match &monitor.route {
            Route::Combined(sink) => {
                let writer = sink.writer().map_err(|e| TriggerError::Watch {
                    stream: "stdout+stderr",
                    source: WatchError::Write(e),
                })?;
                handles.push(spawn_watcher(
                    "stdout+stderr",
                    Interleave::new(stdout, stderr),
                    writer,
                    ctx.clone(),
                ));
            }
            Route::Split => {
                handles.push(spawn_watcher(
                    "stdout",
                    stdout,
                    StdStream::Stdout.writer(),
                    ctx.clone(),
                ));
                handles.push(spawn_watcher(
                    "stderr",
                    stderr,
                    StdStream::Stderr.writer(),
                    ctx.clone(),
                ));
            }
        }
        // Only the watchers may keep the notification channel open.
        drop(ctx);

        // An outside cancellation is reported as such, whatever follow-on
        // failures it causes in the watchers or the trigger.
        let drained = tokio::select! {
            biased;
            _ = token.cancelled() => Err(TriggerError::Canceled),
            Some(err) = failed.recv() => Err(err),
            _ = barrier.wait() => Ok(()),
        };
        if let Err(err) = drained {
            error!(error = %err, "aborting supervised run");
            token.cancel();
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "monitor already gone");
            }
            let _ = child.wait().await;
            settle(handles, orchestrator_handle).await;
            return Err(err);
        }
        debug!("all watchers finished and notifications processed");

        let status = tokio::select! {
            status = child.wait() => status,
            _ = token.cancelled() => {
                info!("cancellation requested; stopping monitor command");
                let _ = child.start_kill();
                let _ = child.wait().await;
                settle(handles, orchestrator_handle).await;
                return Err(TriggerError::Canceled);
            }
        }
        .map_err(|e| TriggerError::MonitorExit {
            cmd: monitor.to_string(),
            reason: format!("waiting for exit: {e}"),
        })?;

        settle(handles, orchestrator_handle).await;

        if !status.success() {
            return Err(TriggerError::MonitorExit {
                cmd: monitor.to_string(),
                reason: describe_exit(status),
            });
        }
        info!(cmd = %monitor, "monitor command exited cleanly");

        let notifications = fired.get();
        if notifications == 0 {
            info!("monitor finished without any pattern match");
            Ok(Outcome::NoMatch)
        } else {
            Ok(Outcome::Matched { notifications })
        }
    }
}

/// Wait for every task to finish. Nothing may outlive the run: the process
/// exits right after it, without dropping (and so killing) what is left.
async fn settle(watchers: Vec<JoinHandle<()>>, orchestrator: JoinHandle<()>) {
    for handle in watchers {
        if let Err(e) = handle.await {
            error!(error = %e, "watcher task ended abnormally");
        }
    }
    if let Err(e) = orchestrator.await {
        error!(error = %e, "orchestrator task ended abnormally");
    }
}

/// Runs when a spawned task ends, however it ends. A panic is reported on
/// the failure channel before the barrier count (if any) is released, so
/// the supervisor never mistakes the release for a clean drain.
struct TaskExit {
    failures: mpsc::UnboundedSender<TriggerError>,
    on_panic: Option<TriggerError>,
    release: Option<Arc<CompletionBarrier>>,
}

impl Drop for TaskExit {
    fn drop(&mut self) {
        if std::thread::panicking() {
            if let Some(err) = self.on_panic.take() {
                let _ = self.failures.send(err);
            }
        }
        if let Some(barrier) = &self.release {
            barrier.done();
        }
    }
}

fn spawn_watcher<R>(
    stream: &'static str,
    source: R,
    mut writer: BoxedWriter,
    ctx: WatchContext,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let _exit = TaskExit {
            failures: ctx.failures.clone(),
            on_panic: Some(TriggerError::Watch {
                stream,
                source: WatchError::Panicked,
            }),
            release: Some(Arc::clone(&ctx.barrier)),
        };

        let source = CancellableReader::new(source, ctx.token.clone());
        let result = watch(
            source,
            &mut writer,
            &ctx.notifier,
            &ctx.patterns,
            &ctx.barrier,
        )
        .await;

        match result {
            Ok(summary) => debug!(stream, ?summary, "watcher reached end of stream"),
            Err(source) => {
                error!(stream, error = %source, "watcher failed");
                // Reported before `_exit` releases the barrier.
                let _ = ctx.failures.send(TriggerError::Watch { stream, source });
            }
        }
    })
}
