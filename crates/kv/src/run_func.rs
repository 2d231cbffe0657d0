//! Reusable transaction bodies.

use crate::context::Context;
use crate::db::Db;
use crate::error::Result;
use crate::tx::Tx;

/// A transaction body that can be run inside any `update` or `view`.
pub trait RunnableTx {
    fn run(&self, ctx: &Context, tx: &dyn Tx) -> Result<()>;
}

impl<F> RunnableTx for F
where
    F: Fn(&Context, &dyn Tx) -> Result<()>,
{
    fn run(&self, ctx: &Context, tx: &dyn Tx) -> Result<()> {
        self(ctx, tx)
    }
}

/// Run `runnable` in a read-write transaction of `db`.
pub fn run_update<D, R>(db: &D, ctx: &Context, runnable: &R) -> Result<()>
where
    D: Db + ?Sized,
    R: RunnableTx + ?Sized,
{
    db.update(ctx, &mut |ctx: &Context, tx: &dyn Tx| runnable.run(ctx, tx))
}

/// Run `runnable` in a read-only transaction of `db`.
pub fn run_view<D, R>(db: &D, ctx: &Context, runnable: &R) -> Result<()>
where
    D: Db + ?Sized,
    R: RunnableTx + ?Sized,
{
    db.view(ctx, &mut |ctx: &Context, tx: &dyn Tx| runnable.run(ctx, tx))
}
