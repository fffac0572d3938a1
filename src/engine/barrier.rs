// src/engine/barrier.rs

//! Shared counters between the watchers, the orchestrator and the supervisor.

use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{trace, warn};

/// Counting wait primitive (a wait group).
///
/// The supervisor pre-charges it with one count per watcher. Each matching
/// line adds one more count that the orchestrator releases once the
/// notification has been handled, so the count only reaches zero when every
/// watcher has stopped and every notification has been fully processed.
#[derive(Debug)]
pub struct CompletionBarrier {
    count: watch::Sender<usize>,
}

impl CompletionBarrier {
    pub fn new(initial: usize) -> Self {
        let (count, _rx) = watch::channel(initial);
        Self { count }
    }

    pub fn add(&self, n: usize) {
        self.count.send_modify(|c| *c += n);
        trace!(count = self.count(), "barrier add");
    }

    pub fn done(&self) {
        self.count.send_modify(|c| match c.checked_sub(1) {
            Some(next) => *c = next,
            None => warn!("completion barrier released more often than charged"),
        });
        trace!(count = self.count(), "barrier done");
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Resolve once the count is zero.
    pub async fn wait(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|c| *c == 0).await;
    }
}

/// Number of notifications the orchestrator has processed, fired or not.
#[derive(Debug, Default)]
pub struct FireCounter {
    seen: Mutex<usize>,
}

impl FireCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) -> usize {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        *seen += 1;
        *seen
    }

    pub fn get(&self) -> usize {
        *self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
