//! Execution context: cancellation flag plus optional deadline.
//!
//! A [`Context`] is cloned into every storage call. Backends observe it while a
//! statement is in flight (SQLite through a progress handler, the PostgreSQL
//! wire backend by racing each future against [`Context::done`]), so a cancel
//! or an expired deadline interrupts the statement and the open transaction is
//! rolled back.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use crate::error::{Result, SnapError};

#[derive(Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
    deadline: Option<Instant>,
}

/// A `Send + 'static` view of a context's done state, for callbacks that run
/// inside a database driver.
#[derive(Debug, Clone)]
pub struct DoneProbe {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl DoneProbe {
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context that also expires after `timeout`. Cancelling either
    /// context cancels both. A timeout past the clock's range adds no deadline.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.clone(),
        }
    }

    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = self.deadline.map_or(deadline, |d| d.min(deadline));
        Self {
            cancelled: Arc::clone(&self.cancelled),
            notify: Arc::clone(&self.notify),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the context is done, if it is.
    #[must_use]
    pub fn done_reason(&self) -> Option<&'static str> {
        if self.is_cancelled() {
            Some("cancelled")
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some("deadline exceeded")
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done_reason().is_some()
    }

    #[must_use]
    pub fn probe(&self) -> DoneProbe {
        DoneProbe {
            cancelled: Arc::clone(&self.cancelled),
            deadline: self.deadline,
        }
    }

    /// Fail with [`SnapError::Cancelled`] once the context is done.
    pub fn check(&self) -> Result<()> {
        match self.done_reason() {
            Some(reason) => Err(SnapError::Cancelled(reason.to_string())),
            None => Ok(()),
        }
    }

    /// Resolves when the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        let cancelled = async {
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.is_cancelled() {
                    return;
                }
                notified.await;
            }
        };
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = cancelled => {}
                    () = tokio::time::sleep_until(deadline.into()) => {}
                }
            }
            None => cancelled.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_live() {
        let ctx = Context::new();
        assert!(!ctx.is_done());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let ctx = Context::new();
        let child = ctx.with_timeout(Duration::from_secs(60));
        ctx.cancel();
        assert!(child.is_cancelled());
        assert!(matches!(child.check(), Err(SnapError::Cancelled(r)) if r == "cancelled"));
    }

    #[test]
    fn expired_deadline_is_done() {
        let ctx = Context::new().with_deadline(Instant::now());
        assert_eq!(ctx.done_reason(), Some("deadline exceeded"));
    }

    #[test]
    fn nested_deadline_keeps_the_earlier_one() {
        let soon = Instant::now() + Duration::from_secs(1);
        let ctx = Context::new()
            .with_deadline(soon)
            .with_timeout(Duration::from_secs(3600));
        assert_eq!(ctx.deadline(), Some(soon));
    }

    #[test]
    fn out_of_range_timeout_adds_no_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ctx.deadline(), None);
        assert!(ctx.check().is_ok());

        let soon = Instant::now() + Duration::from_secs(1);
        let ctx = Context::new()
            .with_deadline(soon)
            .with_timeout(Duration::MAX);
        assert_eq!(ctx.deadline(), Some(soon));
    }

    #[test]
    fn probe_tracks_later_cancellation() {
        let ctx = Context::new();
        let probe = ctx.probe();
        assert!(!probe.is_done());
        ctx.cancel();
        assert!(probe.is_done());
    }

    #[test]
    fn done_future_resolves_on_cancel() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let ctx = Context::new();
        let canceller = ctx.clone();
        rt.block_on(async {
            tokio::join!(ctx.done(), async move {
                tokio::task::yield_now().await;
                canceller.cancel();
            });
        });
        assert!(ctx.is_cancelled());
    }
}
