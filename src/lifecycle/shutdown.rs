//! Shutdown fan-out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Latched shutdown event shared by the signal handler and the server.
///
/// Once triggered it stays triggered, so a [`ShutdownSignal`] taken after
/// the fact resolves immediately instead of waiting forever.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Future-side handle for one waiter.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
            triggered: Arc::clone(&self.triggered),
        }
    }

    pub fn trigger(&self) {
        // Latch before sending: a waiter subscribed after the send sees the flag.
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Signals taken and not yet resolved or dropped.
    pub fn waiters(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// One waiter on a [`Shutdown`].
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: broadcast::Receiver<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been triggered.
    pub async fn recv(mut self) {
        if self.triggered.load(Ordering::SeqCst) {
            return;
        }
        // A closed channel means every `Shutdown` is gone; nobody can trigger.
        if self.rx.recv().await.is_err() && !self.triggered.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_all_waiters() {
        let shutdown = Shutdown::new();
        let a = shutdown.signal();
        let b = shutdown.signal();
        assert_eq!(shutdown.waiters(), 2);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), a.recv()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), b.recv()).await.unwrap();
        assert_eq!(shutdown.waiters(), 0);
    }

    #[tokio::test]
    async fn test_signal_taken_after_trigger_resolves() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        assert!(shutdown.is_triggered());

        tokio::time::timeout(Duration::from_secs(1), shutdown.signal().recv())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_untriggered_signal_stays_pending() {
        let shutdown = Shutdown::new();
        let signal = shutdown.signal();
        drop(shutdown);

        let waited = tokio::time::timeout(Duration::from_millis(50), signal.recv()).await;
        assert!(waited.is_err());
    }

    #[test]
    fn test_repeated_trigger_is_harmless() {
        let shutdown = Shutdown::default();
        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
    }
}
