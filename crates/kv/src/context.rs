//! Cancellation context passed through every transaction and traversal.
//!
//! A `Context` is a cheap-to-clone handle on a shared cancellation flag with
//! an optional deadline. Derived contexts observe their parent: cancelling
//! the parent cancels every child, cancelling a child leaves the parent
//! untouched.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{Error, Result};

struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Context>,
    /// Dropped on cancel, which disconnects `done_rx`
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
}

/// Cancellation and deadline token.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// A root context that is never cancelled unless `cancel` is called.
    pub fn background() -> Self {
        Self::derive(None, None)
    }

    fn derive(parent: Option<Context>, deadline: Option<Instant>) -> Self {
        let (done_tx, done_rx) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline,
                parent,
                done_tx: Mutex::new(Some(done_tx)),
                done_rx,
            }),
        }
    }

    /// A child that can be cancelled independently of this context.
    pub fn with_cancel(&self) -> Self {
        Self::derive(Some(self.clone()), None)
    }

    /// A child that expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A child that expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self::derive(Some(self.clone()), Some(deadline))
    }

    /// Cancel this context and all contexts derived from it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.done_tx.lock().take();
    }

    /// One receiver per context on the parent chain. Each becomes ready
    /// (disconnected) when its context is cancelled. Deadlines are not
    /// signalled here, see `deadline`.
    pub(crate) fn cancel_signals(&self) -> Vec<&Receiver<()>> {
        let mut signals = vec![&self.inner.done_rx];
        let mut current = self.inner.parent.as_ref();
        while let Some(ctx) = current {
            signals.push(&ctx.inner.done_rx);
            current = ctx.inner.parent.as_ref();
        }
        signals
    }

    /// The earliest deadline along the parent chain.
    pub fn deadline(&self) -> Option<Instant> {
        let own = self.inner.deadline;
        let parent = self.inner.parent.as_ref().and_then(Context::deadline);
        match (own, parent) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// `Ok(())` while live, `Cancelled` or `DeadlineExceeded` once done.
    pub fn err(&self) -> Result<()> {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded);
            }
        }
        match &self.inner.parent {
            Some(parent) => parent.err(),
            None => Ok(()),
        }
    }

    /// True once cancelled or past the deadline.
    pub fn is_done(&self) -> bool {
        self.err().is_err()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.inner.cancelled.load(Ordering::Relaxed))
            .field("deadline", &self.deadline())
            .field("done", &self.is_done())
            .finish()
    }
}
