//! Transaction counters and the decorator that feeds them.

use prometheus_client::metrics::counter::Counter;
use prometheus_client::registry::Registry;

use crate::context::Context;
use crate::db::{Db, TxFn};
use crate::error::Result;

/// Sink for transaction counts.
pub trait Metrics: Send + Sync {
    fn db_update_inc(&self);
    fn db_view_inc(&self);
}

/// Prometheus counters `kv_db_update` and `kv_db_view`.
#[derive(Debug, Clone, Default)]
pub struct PrometheusMetrics {
    update: Counter,
    view: Counter,
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the counters and register them in `registry`.
    pub fn register(registry: &mut Registry) -> Self {
        let metrics = Self::new();
        registry.register(
            "kv_db_update",
            "Number of update transactions started",
            metrics.update.clone(),
        );
        registry.register(
            "kv_db_view",
            "Number of view transactions started",
            metrics.view.clone(),
        );
        metrics
    }

    pub fn updates(&self) -> u64 {
        self.update.get()
    }

    pub fn views(&self) -> u64 {
        self.view.get()
    }
}

impl Metrics for PrometheusMetrics {
    fn db_update_inc(&self) {
        self.update.inc();
    }

    fn db_view_inc(&self) {
        self.view.inc();
    }
}

/// [`Db`] decorator counting every `update` and `view` before it runs,
/// whatever the outcome.
pub struct DbWithMetrics<D, M> {
    db: D,
    metrics: M,
}

impl<D: Db, M: Metrics> DbWithMetrics<D, M> {
    pub fn new(db: D, metrics: M) -> Self {
        Self { db, metrics }
    }

    pub fn inner(&self) -> &D {
        &self.db
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }
}

impl<D: Db, M: Metrics> Db for DbWithMetrics<D, M> {
    fn update(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        self.metrics.db_update_inc();
        self.db.update(ctx, f)
    }

    fn view(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        self.metrics.db_view_inc();
        self.db.view(ctx, f)
    }

    fn sync(&self) -> Result<()> {
        self.db.sync()
    }

    fn close(&self) -> Result<()> {
        self.db.close()
    }

    fn remove(&self) -> Result<()> {
        self.db.remove()
    }
}
