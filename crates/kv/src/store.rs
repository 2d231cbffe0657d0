//! Typed object store that opens its own transactions.

use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::bucket_name::BucketName;
use crate::codec::{Codec, JsonCodec};
use crate::context::Context;
use crate::db::{Db, DbExt};
use crate::error::{Result, ResultExt};
use crate::key::StoreKey;
use crate::store_tx::StoreTx;
use crate::tx::Tx;

/// [`StoreTx`] bound to a database.
///
/// `add` and `remove` each run in their own `update`; the readers each run
/// in one `view`, so a whole `map`/`stream`/`list` sees a single snapshot.
pub struct Store<K, V, C = JsonCodec> {
    db: Arc<dyn Db>,
    store_tx: StoreTx<K, V, C>,
}

impl<K, V> Store<K, V, JsonCodec> {
    pub fn new(db: Arc<dyn Db>, bucket_name: impl Into<BucketName>) -> Self {
        Self::from_tx(db, StoreTx::new(bucket_name))
    }
}

impl<K, V, C> Store<K, V, C> {
    pub fn from_tx(db: Arc<dyn Db>, store_tx: StoreTx<K, V, C>) -> Self {
        Self { db, store_tx }
    }

    pub fn store_tx(&self) -> &StoreTx<K, V, C> {
        &self.store_tx
    }

    pub fn bucket_name(&self) -> &BucketName {
        self.store_tx.bucket_name()
    }
}

impl<K, V, C> Store<K, V, C>
where
    K: StoreKey,
    C: Codec<V>,
{
    pub fn add(&self, ctx: &Context, key: &K, object: &V) -> Result<()> {
        self.db.update(ctx, &mut |ctx: &Context, tx: &dyn Tx| {
            self.store_tx.add(ctx, tx, key, object)
        })
    }

    pub fn remove(&self, ctx: &Context, key: &K) -> Result<()> {
        self.db.update(ctx, &mut |ctx: &Context, tx: &dyn Tx| {
            self.store_tx.remove(ctx, tx, key)
        })
    }

    pub fn get(&self, ctx: &Context, key: &K) -> Result<V> {
        self.db
            .view_with(ctx, |ctx: &Context, tx: &dyn Tx| self.store_tx.get(ctx, tx, key))
            .context("view failed")
    }

    pub fn exists(&self, ctx: &Context, key: &K) -> Result<bool> {
        self.db
            .view_with(ctx, |ctx: &Context, tx: &dyn Tx| {
                self.store_tx.exists(ctx, tx, key)
            })
            .context("view failed")
    }

    pub fn map<F>(&self, ctx: &Context, mut f: F) -> Result<()>
    where
        F: FnMut(&Context, K, V) -> Result<()>,
    {
        self.db.view(ctx, &mut |ctx: &Context, tx: &dyn Tx| {
            self.store_tx.map(ctx, tx, &mut f)
        })
    }

    pub fn stream(&self, ctx: &Context, sender: &Sender<V>) -> Result<()> {
        self.db.view(ctx, &mut |ctx: &Context, tx: &dyn Tx| {
            self.store_tx.stream(ctx, tx, sender)
        })
    }

    pub fn list(&self, ctx: &Context) -> Result<Vec<V>> {
        let mut objects = Vec::new();
        self.map(ctx, |_ctx, _key, object| {
            objects.push(object);
            Ok(())
        })
        .context("map failed")?;
        Ok(objects)
    }
}

impl<K, V, C: Clone> Clone for Store<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            store_tx: self.store_tx.clone(),
        }
    }
}
