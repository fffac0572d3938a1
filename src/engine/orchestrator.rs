// src/engine/orchestrator.rs

//! Trigger orchestrator: the single consumer of match notifications.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::barrier::{CompletionBarrier, FireCounter};
use crate::engine::notify::NotificationStream;
use crate::errors::Result;
use crate::exec::TriggerBackend;

/// Applies the once/repeat firing policy to incoming notifications.
///
/// State is a single `armed` flag, initially set:
///
/// - armed: run the trigger with the matched text, count the notification,
///   then stay armed only if `repeat` is set.
/// - disarmed: only count the notification.
///
/// Either way the barrier count charged by the watcher for this notification
/// is released afterwards. Because exactly one orchestrator drains the
/// channel and `fire` is awaited to completion, trigger runs never overlap.
/// The token is handed to the backend, which stops a run in progress when
/// it fires.
pub struct TriggerOrchestrator<B> {
    backend: B,
    repeat: bool,
    armed: bool,
    fired: Arc<FireCounter>,
    barrier: Arc<CompletionBarrier>,
}

impl<B> fmt::Debug for TriggerOrchestrator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerOrchestrator")
            .field("repeat", &self.repeat)
            .field("armed", &self.armed)
            .finish_non_exhaustive()
    }
}

impl<B: TriggerBackend> TriggerOrchestrator<B> {
    pub fn new(
        backend: B,
        repeat: bool,
        fired: Arc<FireCounter>,
        barrier: Arc<CompletionBarrier>,
    ) -> Self {
        Self {
            backend,
            repeat,
            armed: true,
            fired,
            barrier,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Consume notifications until `token` is cancelled or every sender is
    /// gone.
    ///
    /// Cancellation is checked first on every iteration, so queued
    /// notifications are not drained after shutdown was requested. A failed
    /// trigger run ends the loop with that error and leaves its barrier count
    /// unreleased: the program is going down.
    ///
    /// `notes` is borrowed so the caller decides when the channel closes; a
    /// caller reporting the error should do so before dropping it.
    pub async fn run(
        mut self,
        notes: &mut NotificationStream,
        token: CancellationToken,
    ) -> Result<()> {
        info!(repeat = self.repeat, "trigger orchestrator started");

        loop {
            let note = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("cancellation requested; orchestrator stopping");
                    return Ok(());
                }
                note = notes.recv() => note,
            };

            let Some(note) = note else {
                debug!("all watchers gone; orchestrator stopping");
                return Ok(());
            };

            let matched = note.acknowledge();
            self.handle(matched, &token).await?;
        }
    }

    async fn handle(&mut self, matched: String, token: &CancellationToken) -> Result<()> {
        if self.armed {
            self.backend.fire(matched, token.clone()).await?;
            self.armed = self.repeat;
        } else {
            debug!(matched = %matched, "trigger already fired and retrigger is off; skipping");
        }

        let seen = self.fired.increment();
        debug!(seen, armed = self.armed, "notification processed");
        self.barrier.done();
        Ok(())
    }
}
