use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use trigger::errors::{Result, TriggerError};
use trigger::exec::TriggerBackend;

#[derive(Debug, Default)]
struct Record {
    fired: Vec<String>,
    in_flight: usize,
    max_in_flight: usize,
    canceled: usize,
}

/// Shared view of what a [`RecordingTrigger`] has done.
#[derive(Debug, Clone, Default)]
pub struct TriggerLog {
    inner: Arc<Mutex<Record>>,
}

impl TriggerLog {
    /// Matched texts, in the order the trigger was fired.
    pub fn fired(&self) -> Vec<String> {
        self.inner.lock().unwrap().fired.clone()
    }

    /// Runs that were stopped by cancellation before they finished.
    pub fn canceled(&self) -> usize {
        self.inner.lock().unwrap().canceled
    }

    /// Highest number of `fire` calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.inner.lock().unwrap().max_in_flight
    }
}

/// A fake trigger backend that:
/// - records every matched text it is fired with
/// - tracks how many runs overlap
/// - optionally takes some time per run (cut short by cancellation), or
///   fails on the n-th run.
#[derive(Debug, Clone, Default)]
pub struct RecordingTrigger {
    log: TriggerLog,
    delay: Option<Duration>,
    fail_on: Option<usize>,
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the `n`-th run (1-based) with `TriggerFailed`.
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    pub fn log(&self) -> TriggerLog {
        self.log.clone()
    }
}

impl TriggerBackend for RecordingTrigger {
    fn fire(
        &mut self,
        matched: String,
        token: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let inner = Arc::clone(&self.log.inner);
        let delay = self.delay;
        let fail_on = self.fail_on;

        Box::pin(async move {
            let run = {
                let mut guard = inner.lock().unwrap();
                guard.in_flight += 1;
                guard.max_in_flight = guard.max_in_flight.max(guard.in_flight);
                guard.fired.push(matched.clone());
                guard.fired.len()
            };

            if let Some(delay) = delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = token.cancelled() => {
                        let mut guard = inner.lock().unwrap();
                        guard.in_flight -= 1;
                        guard.canceled += 1;
                        return Err(TriggerError::Canceled);
                    }
                }
            }

            inner.lock().unwrap().in_flight -= 1;

            if fail_on == Some(run) {
                return Err(TriggerError::TriggerFailed {
                    cmd: "recording-trigger".to_string(),
                    reason: format!("configured to fail on run {run} ({matched})"),
                });
            }
            Ok(())
        })
    }
}
