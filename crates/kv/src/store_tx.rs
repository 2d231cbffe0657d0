//! Typed object store operating inside a caller-supplied transaction.

use std::marker::PhantomData;

use crossbeam_channel::{Select, Sender};
use tracing::{debug, trace};

use crate::bucket::Bucket;
use crate::bucket_name::BucketName;
use crate::codec::{Codec, JsonCodec};
use crate::context::Context;
use crate::error::{Error, Result, ResultExt};
use crate::item::Item;
use crate::iterator::IteratorGuard;
use crate::key::StoreKey;
use crate::tx::Tx;

/// Maps keys of type `K` to objects of type `V` within one bucket.
///
/// Every operation takes the transaction explicitly, so several stores can
/// take part in one atomic `update`. Values go through the codec `C`
/// (JSON unless chosen otherwise).
pub struct StoreTx<K, V, C = JsonCodec> {
    bucket_name: BucketName,
    codec: C,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> StoreTx<K, V, JsonCodec> {
    pub fn new(bucket_name: impl Into<BucketName>) -> Self {
        Self::with_codec(bucket_name, JsonCodec)
    }
}

impl<K, V, C: Clone> Clone for StoreTx<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            bucket_name: self.bucket_name.clone(),
            codec: self.codec.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K, V, C> StoreTx<K, V, C> {
    pub fn with_codec(bucket_name: impl Into<BucketName>, codec: C) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            codec,
            _marker: PhantomData,
        }
    }

    pub fn bucket_name(&self) -> &BucketName {
        &self.bucket_name
    }
}

impl<K, V, C> StoreTx<K, V, C>
where
    K: StoreKey,
    C: Codec<V>,
{
    /// Encode `object` and store it under `key`, creating the bucket on
    /// first use.
    pub fn add(&self, ctx: &Context, tx: &dyn Tx, key: &K, object: &V) -> Result<()> {
        let bucket = tx
            .create_bucket_if_not_exists(ctx, &self.bucket_name)
            .context("get bucket failed")?;
        let value = self.codec.encode(object).context("marshal value failed")?;
        bucket.put(ctx, key.key_bytes(), &value).context("set failed")
    }

    /// Delete `key`. A missing bucket counts as success.
    pub fn remove(&self, ctx: &Context, tx: &dyn Tx, key: &K) -> Result<()> {
        let bucket = match tx.create_bucket_if_not_exists(ctx, &self.bucket_name) {
            Ok(bucket) => bucket,
            Err(err) if err.is_bucket_not_found() => {
                debug!(bucket = %self.bucket_name, "bucket not found, nothing to remove");
                return Ok(());
            }
            Err(err) => return Err(err.context("get bucket failed")),
        };
        bucket
            .delete(ctx, key.key_bytes())
            .with_context(|| format!("remove {} failed", display_key(key)))
    }

    /// Load and decode the object under `key`.
    ///
    /// A missing bucket is an error here, unlike in `exists`/`map`. A
    /// missing key and an empty stored value both yield `KeyNotFound`.
    pub fn get(&self, ctx: &Context, tx: &dyn Tx, key: &K) -> Result<V> {
        let bucket = tx
            .bucket(ctx, &self.bucket_name)
            .context("get bucket failed")?;
        let item = bucket
            .get(ctx, key.key_bytes())
            .with_context(|| format!("get {} failed", display_key(key)))?;
        if !item.exists() {
            return Err(Error::KeyNotFound
                .context(format!("key({}) not found", display_key(key)))
                .context("handle value failed"));
        }
        self.decode(item.as_ref()).context("handle value failed")
    }

    /// Whether a non-empty value is stored under `key`.
    pub fn exists(&self, ctx: &Context, tx: &dyn Tx, key: &K) -> Result<bool> {
        let Some(bucket) = self.existing_bucket(ctx, tx)? else {
            return Ok(false);
        };
        let item = bucket
            .get(ctx, key.key_bytes())
            .with_context(|| format!("get {} failed", display_key(key)))?;
        Ok(item.exists())
    }

    /// Call `f` with every decoded object in ascending key order.
    ///
    /// Stops at the first decode failure, `f` error or cancellation. A
    /// missing bucket visits nothing.
    pub fn map<F>(&self, ctx: &Context, tx: &dyn Tx, mut f: F) -> Result<()>
    where
        F: FnMut(&Context, K, V) -> Result<()>,
    {
        let Some(bucket) = self.existing_bucket(ctx, tx)? else {
            return Ok(());
        };
        let mut it = IteratorGuard::new(bucket.iterator());
        it.rewind();
        while it.valid() {
            ctx.err()?;
            let item = it.item();
            let key = K::from_key_bytes(item.key()).context("convert key failed")?;
            let object = self
                .decode(item.as_ref())
                .with_context(|| format!("unmarshal {} failed", display_key(&key)))
                .context("handle value failed")?;
            drop(item);
            f(ctx, key, object)
                .context("call fn failed")
                .context("handle value failed")?;
            it.next();
        }
        Ok(())
    }

    /// Send every object to `sender` in key order.
    ///
    /// A full channel blocks the walk until the receiver catches up or the
    /// context ends. A dropped receiver aborts with `StreamClosed`.
    pub fn stream(&self, ctx: &Context, tx: &dyn Tx, sender: &Sender<V>) -> Result<()> {
        self.map(ctx, tx, |ctx, _key, object| send(ctx, sender, object))
    }

    /// All objects in key order.
    pub fn list(&self, ctx: &Context, tx: &dyn Tx) -> Result<Vec<V>> {
        let mut objects = Vec::new();
        self.map(ctx, tx, |_ctx, _key, object| {
            objects.push(object);
            Ok(())
        })
        .context("map failed")?;
        Ok(objects)
    }

    fn existing_bucket<'t>(
        &self,
        ctx: &Context,
        tx: &'t dyn Tx,
    ) -> Result<Option<Box<dyn Bucket + 't>>> {
        match tx.bucket(ctx, &self.bucket_name) {
            Ok(bucket) => Ok(Some(bucket)),
            Err(err) if err.is_bucket_not_found() => {
                trace!(bucket = %self.bucket_name, "bucket not found");
                Ok(None)
            }
            Err(err) => Err(err.context("get bucket failed")),
        }
    }

    fn decode(&self, item: &dyn Item) -> Result<V> {
        let mut object = None;
        item.value(&mut |bytes| {
            object = Some(self.codec.decode(bytes)?);
            Ok(())
        })?;
        object.ok_or(Error::KeyNotFound)
    }
}

/// Hand `object` to the channel. Blocks while the channel is full, until
/// the receiver takes it or `ctx` is cancelled or expires.
fn send<V>(ctx: &Context, sender: &Sender<V>, object: V) -> Result<()> {
    ctx.err()?;
    let signals = ctx.cancel_signals();

    let mut select = Select::new();
    let send_index = select.send(sender);
    for &signal in &signals {
        select.recv(signal);
    }

    let operation = match ctx.deadline() {
        Some(deadline) => select
            .select_deadline(deadline)
            .map_err(|_| Error::DeadlineExceeded)?,
        None => select.select(),
    };
    let index = operation.index();
    if index == send_index {
        return operation
            .send(sender, object)
            .map_err(|_| Error::StreamClosed);
    }

    // A cancel signal only ever fires by disconnecting.
    let _ = operation.recv(signals[index - 1]);
    ctx.err()?;
    Err(Error::Cancelled)
}

fn display_key<K: StoreKey>(key: &K) -> String {
    String::from_utf8_lossy(key.key_bytes()).into_owned()
}
