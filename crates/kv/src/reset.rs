//! Single-flight destructive maintenance: drop one bucket or the whole
//! database.

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::bucket_name::BucketName;
use crate::context::Context;
use crate::db::Db;
use crate::error::{Error, Result, ResultExt};
use crate::tx::Tx;

/// Allows at most one holder at a time without ever blocking.
#[derive(Debug, Default)]
pub struct SingleFlight {
    lock: Mutex<()>,
}

/// Proof of holding a [`SingleFlight`]. Released on drop.
pub struct SingleFlightGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if another holder is active.
    pub fn try_acquire(&self) -> Option<SingleFlightGuard<'_>> {
        self.lock
            .try_lock()
            .map(|guard| SingleFlightGuard { _guard: guard })
    }
}

/// Callback run after a reset, typically to cancel whatever was using the
/// database.
pub type ResetHook = Box<dyn Fn() + Send + Sync>;

fn noop_hook() -> ResetHook {
    Box::new(|| {})
}

/// Deletes one bucket per call; overlapping calls are rejected.
pub struct ResetBucket<D> {
    db: D,
    flight: SingleFlight,
    on_reset: ResetHook,
}

impl<D: Db> ResetBucket<D> {
    pub fn new(db: D) -> Self {
        Self {
            db,
            flight: SingleFlight::new(),
            on_reset: noop_hook(),
        }
    }

    /// Run `hook` after every successful reset.
    pub fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reset = Box::new(hook);
        self
    }

    pub fn reset(&self, ctx: &Context, name: &BucketName) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("parameter bucket missing".into()));
        }
        let Some(_guard) = self.flight.try_acquire() else {
            debug!(bucket = %name, "reset bucket running");
            return Err(Error::Busy(format!("reset bucket {name}")));
        };
        debug!(bucket = %name, "reset bucket started");

        self.db
            .update(ctx, &mut |ctx: &Context, tx: &dyn Tx| tx.delete_bucket(ctx, name))
            .context("remove bucket failed")?;

        debug!(bucket = %name, "reset bucket successful");
        (self.on_reset)();
        Ok(())
    }
}

/// Closes and removes the whole database; overlapping calls are rejected.
pub struct ResetDb<D> {
    db: D,
    flight: SingleFlight,
    on_reset: ResetHook,
}

impl<D: Db> ResetDb<D> {
    pub fn new(db: D) -> Self {
        Self {
            db,
            flight: SingleFlight::new(),
            on_reset: noop_hook(),
        }
    }

    /// Run `hook` after every attempt that got past the single-flight
    /// check, successful or not.
    pub fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reset = Box::new(hook);
        self
    }

    pub fn reset(&self) -> Result<()> {
        let Some(_guard) = self.flight.try_acquire() else {
            debug!("reset db already running");
            return Err(Error::Busy("reset db".into()));
        };
        debug!("reset db started");

        let result = self.close_and_remove();
        (self.on_reset)();
        if result.is_ok() {
            debug!("reset db successful");
        }
        result
    }

    fn close_and_remove(&self) -> Result<()> {
        self.db.close().context("reset db failed")?;
        self.db.remove().context("remove db failed")
    }
}
