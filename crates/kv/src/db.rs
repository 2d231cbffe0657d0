//! Database contract.
//!
//! `update` runs its closure in a read-write transaction and commits iff the
//! closure returns `Ok`; `view` runs a read-only transaction. Engines must
//! serialize write transactions (block or fail with
//! `Error::TransactionAlreadyOpen`); this layer adds no lock of its own.

use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::tx::Tx;

/// Transaction body accepted by [`Db::update`] and [`Db::view`].
pub type TxFn<'f> = dyn FnMut(&Context, &dyn Tx) -> Result<()> + 'f;

/// Storage handle owning transaction creation and lifecycle.
pub trait Db: Send + Sync {
    /// Run `f` in a read-write transaction. Commit on `Ok`, abort and
    /// return the error otherwise.
    fn update(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()>;

    /// Run `f` in a read-only transaction.
    fn view(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()>;

    /// Make committed data durable.
    fn sync(&self) -> Result<()>;

    /// Release the database. Transactions fail afterwards.
    fn close(&self) -> Result<()>;

    /// Delete the storage artifact. Only meaningful after `close`.
    fn remove(&self) -> Result<()>;
}

/// Closure-friendly helpers on top of [`Db`].
pub trait DbExt: Db {
    /// `update` returning the closure's value.
    fn update_with<T, F>(&self, ctx: &Context, mut f: F) -> Result<T>
    where
        F: FnMut(&Context, &dyn Tx) -> Result<T>,
    {
        let mut out = None;
        self.update(ctx, &mut |ctx: &Context, tx: &dyn Tx| {
            out = Some(f(ctx, tx)?);
            Ok(())
        })?;
        out.ok_or_else(|| Error::upstream("update returned without running its closure"))
    }

    /// `view` returning the closure's value.
    fn view_with<T, F>(&self, ctx: &Context, mut f: F) -> Result<T>
    where
        F: FnMut(&Context, &dyn Tx) -> Result<T>,
    {
        let mut out = None;
        self.view(ctx, &mut |ctx: &Context, tx: &dyn Tx| {
            out = Some(f(ctx, tx)?);
            Ok(())
        })?;
        out.ok_or_else(|| Error::upstream("view returned without running its closure"))
    }
}

impl<D: Db + ?Sized> DbExt for D {}

impl<D: Db + ?Sized> Db for Arc<D> {
    fn update(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        (**self).update(ctx, f)
    }

    fn view(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        (**self).view(ctx, f)
    }

    fn sync(&self) -> Result<()> {
        (**self).sync()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn remove(&self) -> Result<()> {
        (**self).remove()
    }
}

impl<D: Db + ?Sized> Db for Box<D> {
    fn update(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        (**self).update(ctx, f)
    }

    fn view(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        (**self).view(ctx, f)
    }

    fn sync(&self) -> Result<()> {
        (**self).sync()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn remove(&self) -> Result<()> {
        (**self).remove()
    }
}

impl<D: Db + ?Sized> Db for &D {
    fn update(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        (**self).update(ctx, f)
    }

    fn view(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        (**self).view(ctx, f)
    }

    fn sync(&self) -> Result<()> {
        (**self).sync()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn remove(&self) -> Result<()> {
        (**self).remove()
    }
}
