//! Call-scoped cancellation.
//!
//! A `CallContext` bounds one outbound call: every network wait and retry
//! sleep races against `done()`. Children inherit every cancellation signal
//! of their parent and keep the earlier of the two deadlines.

use std::fmt;
use std::future::pending;
use std::time::Duration;

use futures_util::future::select_all;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Why a context ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => f.write_str("context canceled"),
            CancelReason::DeadlineExceeded => f.write_str("context deadline exceeded"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    signals: Vec<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Cancels the context it was created with, and every child of it.
/// Dropping the handle without calling `cancel` leaves the context live.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CallContext {
    /// A context that never ends.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancel(&self) -> (CallContext, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut child = self.clone();
        child.signals.push(rx);
        (child, CancelHandle { tx })
    }

    pub fn with_timeout(&self, timeout: Duration) -> CallContext {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> CallContext {
        let mut child = self.clone();
        child.deadline = Some(match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        });
        child
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Some` once the context has ended. Cancellation wins over an expired
    /// deadline when both hold.
    pub fn err(&self) -> Option<CancelReason> {
        if self.signals.iter().any(|rx| *rx.borrow()) {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves when the context ends; pending forever for `background()`.
    pub async fn done(&self) -> CancelReason {
        if let Some(reason) = self.err() {
            return reason;
        }

        let cancelled = async {
            if self.signals.is_empty() {
                return pending::<()>().await;
            }
            let waits = self.signals.iter().map(|rx| {
                let mut rx = rx.clone();
                Box::pin(async move {
                    let fired = rx.wait_for(|cancelled| *cancelled).await.is_ok();
                    if !fired {
                        // Handle dropped without cancelling.
                        pending::<()>().await;
                    }
                })
            });
            select_all(waits).await;
        };

        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancelled => CancelReason::Cancelled,
            _ = expired => CancelReason::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_never_done() {
        let ctx = CallContext::background();
        assert_eq!(ctx.err(), None);
        let res = tokio::time::timeout(Duration::from_millis(20), ctx.done()).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn test_cancel_wakes_done() {
        let (ctx, handle) = CallContext::background().with_cancel();
        let waiter = tokio::spawn(async move { ctx.done().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let reason = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reason, CancelReason::Cancelled);
    }

    #[tokio::test]
    async fn test_child_inherits_parent_cancel() {
        let (parent, handle) = CallContext::background().with_cancel();
        let (child, _child_handle) = parent.with_cancel();
        let child = child.with_timeout(Duration::from_secs(60));

        handle.cancel();
        assert_eq!(child.err(), Some(CancelReason::Cancelled));
        assert_eq!(child.done().await, CancelReason::Cancelled);
    }

    #[tokio::test]
    async fn test_child_cancel_does_not_reach_parent() {
        let (parent, _handle) = CallContext::background().with_cancel();
        let (child, child_handle) = parent.with_cancel();
        child_handle.cancel();

        assert_eq!(child.err(), Some(CancelReason::Cancelled));
        assert_eq!(parent.err(), None);
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(20));
        assert_eq!(ctx.err(), None);
        assert_eq!(ctx.done().await, CancelReason::DeadlineExceeded);
        assert_eq!(ctx.err(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn test_child_keeps_earlier_deadline() {
        let parent = CallContext::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(30));
        assert_eq!(child.deadline(), parent.deadline());

        let tighter = parent.with_timeout(Duration::from_millis(10));
        assert!(tighter.deadline() < parent.deadline());
    }

    #[tokio::test]
    async fn test_dropped_handle_keeps_context_live() {
        let (ctx, handle) = CallContext::background().with_cancel();
        drop(handle);
        assert_eq!(ctx.err(), None);
        let res = tokio::time::timeout(Duration::from_millis(20), ctx.done()).await;
        assert!(res.is_err());
    }
}
