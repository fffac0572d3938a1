// src/engine/notify.rs

//! Rendezvous channel carrying match notifications to the orchestrator.
//!
//! A send only completes once the orchestrator has taken the notification,
//! so there is never more than one notification in flight and a watcher is
//! held back while the orchestrator is busy with a trigger run.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// One matched line, as seen by the orchestrator.
#[derive(Debug)]
pub struct Notification {
    pub text: String,
    received: oneshot::Sender<()>,
}

impl Notification {
    /// Release the watcher that sent this notification.
    pub fn acknowledge(self) -> String {
        // The sender may already be gone (e.g. it was cancelled); nothing to do.
        let _ = self.received.send(());
        self.text
    }
}

/// Why a notification did not reach the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The orchestrator stopped receiving before taking it.
    Undelivered(String),
    /// Cancellation fired while the sender was waiting.
    Canceled(String),
}

/// Sending half, one clone per watcher.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
    token: CancellationToken,
}

impl Notifier {
    /// Hand `text` to the orchestrator and wait until it has been taken.
    ///
    /// Both the send and the wait for the acknowledgement give up as soon as
    /// the channel's cancellation token fires.
    pub async fn notify(&self, text: String) -> Result<(), NotifyError> {
        let (received, taken) = oneshot::channel();
        let pending = text.clone();

        let delivered = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(NotifyError::Canceled(pending)),
            sent = self.tx.send(Notification { text, received }) => sent,
        };
        if delivered.is_err() {
            return Err(self.lost(pending));
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(NotifyError::Canceled(pending)),
            // Dropped unacknowledged: the orchestrator quit with it still queued.
            ack = taken => ack.map_err(|_| self.lost(pending)),
        }
    }

    /// An orchestrator that stopped because of cancellation is reported as
    /// such, not as having gone away.
    fn lost(&self, text: String) -> NotifyError {
        if self.token.is_cancelled() {
            NotifyError::Canceled(text)
        } else {
            NotifyError::Undelivered(text)
        }
    }
}

/// Receiving half, owned by the single orchestrator task.
#[derive(Debug)]
pub struct NotificationStream {
    rx: mpsc::Receiver<Notification>,
}

impl NotificationStream {
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }
}

/// Create the channel. Senders stop waiting once `token` is cancelled.
pub fn channel(token: CancellationToken) -> (Notifier, NotificationStream) {
    let (tx, rx) = mpsc::channel(1);
    (Notifier { tx, token }, NotificationStream { rx })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn send_completes_only_after_receipt() {
        let (notifier, mut stream) = channel(CancellationToken::new());

        let sender = tokio::spawn(async move { notifier.notify("hit".to_string()).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!sender.is_finished());

        let note = stream.recv().await.unwrap();
        assert_eq!(note.acknowledge(), "hit");
        assert_eq!(sender.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn send_fails_when_receiver_is_gone() {
        let (notifier, stream) = channel(CancellationToken::new());
        drop(stream);
        let err = notifier.notify("lost".to_string()).await.unwrap_err();
        assert_eq!(err, NotifyError::Undelivered("lost".to_string()));
    }

    #[tokio::test]
    async fn waiting_sender_is_released_by_cancellation() {
        let token = CancellationToken::new();
        let (notifier, _stream) = channel(token.clone());

        // The first send fills the one-slot buffer and then waits for an
        // acknowledgement that never comes.
        let sender = tokio::spawn(async move { notifier.notify("stuck".to_string()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!sender.is_finished());

        token.cancel();
        let res = tokio::time::timeout(Duration::from_secs(1), sender)
            .await
            .expect("sender was not released")
            .unwrap();
        assert_eq!(res, Err(NotifyError::Canceled("stuck".to_string())));
    }
}
