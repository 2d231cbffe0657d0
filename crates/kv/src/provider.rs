//! Lazily opened databases.

use std::sync::Arc;

use crate::context::Context;
use crate::db::Db;
use crate::error::Result;

/// Opens (or hands out) a database on demand.
pub trait Provider: Send + Sync {
    fn get(&self, ctx: &Context) -> Result<Arc<dyn Db>>;
}

impl<F> Provider for F
where
    F: Fn(&Context) -> Result<Arc<dyn Db>> + Send + Sync,
{
    fn get(&self, ctx: &Context) -> Result<Arc<dyn Db>> {
        self(ctx)
    }
}
