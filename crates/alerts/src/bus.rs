//! Notification fan-out (mechanics only).
//!
//! The bus is the seam between the core and the external delivery worker:
//! the core publishes, the worker subscribes. Best-effort broadcast,
//! at-least-once acceptable; consumers must tolerate duplicates.

use std::sync::{Mutex, mpsc};
use std::time::Duration;

use thiserror::Error;

use crate::notification::Notification;

#[derive(Debug, Error)]
pub enum PublishError {
    /// Publish failed due to internal lock poisoning.
    #[error("notification bus lock poisoned")]
    Poisoned,
}

/// A subscription to the notification stream. Each subscriber gets a copy of
/// every notification published after it subscribed.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<Notification>,
}

impl Subscription {
    pub fn new(receiver: mpsc::Receiver<Notification>) -> Self {
        Self { receiver }
    }

    /// Block until the next notification is available.
    pub fn recv(&self) -> Result<Notification, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive without blocking.
    pub fn try_recv(&self) -> Result<Notification, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a notification.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Notification, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(notification) = self.try_recv() {
            out.push(notification);
        }
        out
    }
}

/// Publish/subscribe seam for notifications.
pub trait NotificationBus: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), PublishError>;

    fn subscribe(&self) -> Subscription;
}

impl<B> NotificationBus for std::sync::Arc<B>
where
    B: NotificationBus + ?Sized,
{
    fn publish(&self, notification: Notification) -> Result<(), PublishError> {
        (**self).publish(notification)
    }

    fn subscribe(&self) -> Subscription {
        (**self).subscribe()
    }
}

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Best-effort fan-out
/// - Dead subscribers are dropped while publishing
#[derive(Debug, Default)]
pub struct InMemoryNotificationBus {
    subscribers: Mutex<Vec<mpsc::Sender<Notification>>>,
}

impl InMemoryNotificationBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationBus for InMemoryNotificationBus {
    fn publish(&self, notification: Notification) -> Result<(), PublishError> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| PublishError::Poisoned)?;

        subs.retain(|tx| tx.send(notification.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned we still return a subscription; it just
        // won't receive anything until the process restarts.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}
