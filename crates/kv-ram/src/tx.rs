//! Transactions over a RAM snapshot.
//!
//! A transaction starts from the committed snapshot it was given. Writes go
//! to a private copy-on-write clone and are recorded as WAL ops; nothing is
//! visible to other transactions until `RamDb` publishes the result.

use std::cell::RefCell;
use std::sync::Arc;

use bytes::Bytes;
use kv::{Bucket, BucketName, BucketNames, Context, Error, Result, Tx};

use crate::bucket::RamBucket;
use crate::config::Config;
use crate::engine::{BucketData, Snapshot};
use crate::error::RamError;
use crate::format::Operation;

struct TxState {
    snapshot: Arc<Snapshot>,
    ops: Vec<Operation>,
}

/// A read-only or read-write transaction of `RamDb`.
pub struct RamTx {
    state: RefCell<TxState>,
    writable: bool,
    max_key_size: usize,
    max_value_size: usize,
}

impl RamTx {
    pub(crate) fn new(snapshot: Arc<Snapshot>, writable: bool, config: &Config) -> Self {
        Self {
            state: RefCell::new(TxState {
                snapshot,
                ops: Vec::new(),
            }),
            writable,
            max_key_size: config.max_key_size,
            max_value_size: config.max_value_size,
        }
    }

    /// The resulting snapshot and the ops that produced it.
    pub(crate) fn into_parts(self) -> (Arc<Snapshot>, Vec<Operation>) {
        let state = self.state.into_inner();
        (state.snapshot, state.ops)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(Error::ReadOnlyTransaction)
        }
    }

    fn contains_bucket(&self, name: &[u8]) -> bool {
        self.state.borrow().snapshot.contains_bucket(name)
    }

    /// Apply `op` to the private snapshot and remember it for the WAL.
    fn record(&self, op: Operation) {
        let mut state = self.state.borrow_mut();
        Arc::make_mut(&mut state.snapshot).apply(&op);
        state.ops.push(op);
    }

    fn open_bucket(&self, name: &BucketName) -> Box<dyn Bucket + '_> {
        Box::new(RamBucket::new(self, name.as_bytes().to_vec()))
    }

    pub(crate) fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Bytes>> {
        let state = self.state.borrow();
        let data = state.snapshot.bucket(bucket).ok_or(Error::BucketNotFound)?;
        Ok(data.get(key).cloned())
    }

    pub(crate) fn put(&self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        check_key(key, self.max_key_size)?;
        if value.len() > self.max_value_size {
            return Err(oversized("value", value.len(), self.max_value_size));
        }
        if !self.contains_bucket(bucket) {
            return Err(Error::BucketNotFound);
        }
        self.record(Operation::Put {
            bucket: bucket.to_vec(),
            key: key.to_vec(),
            value: Bytes::copy_from_slice(value),
        });
        Ok(())
    }

    pub(crate) fn delete(&self, bucket: &[u8], key: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        check_key(key, self.max_key_size)?;
        let present = {
            let state = self.state.borrow();
            let data = state.snapshot.bucket(bucket).ok_or(Error::BucketNotFound)?;
            data.contains_key(key)
        };
        if present {
            self.record(Operation::Delete {
                bucket: bucket.to_vec(),
                key: key.to_vec(),
            });
        }
        Ok(())
    }

    /// Entries of `bucket` as they are right now. Later writes in this
    /// transaction copy the table and leave the returned one untouched.
    pub(crate) fn bucket_data(&self, bucket: &[u8]) -> Arc<BucketData> {
        self.state
            .borrow()
            .snapshot
            .bucket(bucket)
            .cloned()
            .unwrap_or_default()
    }
}

fn check_key(key: &[u8], max_key_size: usize) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("key must not be empty".into()));
    }
    if key.len() > max_key_size {
        return Err(oversized("key", key.len(), max_key_size));
    }
    Ok(())
}

/// Caller input over a configured limit is an argument error, not an
/// engine failure.
fn oversized(component: &str, size: usize, max: usize) -> Error {
    let err = RamError::OversizedEntry {
        entry_size: size as u64,
        max_size: max as u64,
        component: component.to_string(),
    };
    Error::InvalidArgument(err.to_string())
}

impl Tx for RamTx {
    fn bucket(&self, ctx: &Context, name: &BucketName) -> Result<Box<dyn Bucket + '_>> {
        ctx.err()?;
        if !self.contains_bucket(name.as_bytes()) {
            return Err(Error::BucketNotFound);
        }
        Ok(self.open_bucket(name))
    }

    fn create_bucket(&self, ctx: &Context, name: &BucketName) -> Result<Box<dyn Bucket + '_>> {
        ctx.err()?;
        self.ensure_writable()?;
        if name.is_empty() {
            return Err(Error::InvalidArgument("bucket name must not be empty".into()));
        }
        if name.len() > u16::MAX as usize {
            return Err(oversized("bucket name", name.len(), u16::MAX as usize));
        }
        if self.contains_bucket(name.as_bytes()) {
            return Err(Error::BucketAlreadyExists);
        }
        self.record(Operation::CreateBucket {
            bucket: name.as_bytes().to_vec(),
        });
        Ok(self.open_bucket(name))
    }

    fn create_bucket_if_not_exists(
        &self,
        ctx: &Context,
        name: &BucketName,
    ) -> Result<Box<dyn Bucket + '_>> {
        ctx.err()?;
        if self.contains_bucket(name.as_bytes()) {
            return Ok(self.open_bucket(name));
        }
        self.create_bucket(ctx, name)
    }

    fn delete_bucket(&self, ctx: &Context, name: &BucketName) -> Result<()> {
        ctx.err()?;
        self.ensure_writable()?;
        if !self.contains_bucket(name.as_bytes()) {
            return Err(Error::BucketNotFound);
        }
        self.record(Operation::DeleteBucket {
            bucket: name.as_bytes().to_vec(),
        });
        Ok(())
    }

    fn list_bucket_names(&self, ctx: &Context) -> Result<BucketNames> {
        ctx.err()?;
        Ok(self
            .state
            .borrow()
            .snapshot
            .bucket_names()
            .into_iter()
            .map(BucketName::from)
            .collect())
    }

    fn is_writable(&self) -> bool {
        self.writable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(writable: bool) -> RamTx {
        RamTx::new(Arc::new(Snapshot::default()), writable, &Config::default())
    }

    #[test]
    fn test_writes_are_recorded_in_order() {
        let ctx = Context::background();
        let tx = tx(true);
        let bucket = tx.create_bucket(&ctx, &BucketName::from("b")).unwrap();
        bucket.put(&ctx, b"k", b"v").unwrap();
        bucket.delete(&ctx, b"k").unwrap();
        bucket.delete(&ctx, b"never-there").unwrap();
        drop(bucket);

        let (snapshot, ops) = tx.into_parts();
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], Operation::CreateBucket { .. }));
        assert!(matches!(ops[1], Operation::Put { .. }));
        assert!(matches!(ops[2], Operation::Delete { .. }));
        assert!(snapshot.bucket(b"b").unwrap().is_empty());
    }

    #[test]
    fn test_base_snapshot_untouched() {
        let ctx = Context::background();
        let base = Arc::new(Snapshot::default());
        let tx = RamTx::new(base.clone(), true, &Config::default());
        tx.create_bucket(&ctx, &BucketName::from("b")).unwrap();

        assert_eq!(base.bucket_count(), 0);
        let (snapshot, _) = tx.into_parts();
        assert_eq!(snapshot.bucket_count(), 1);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let ctx = Context::background();
        let tx = tx(false);
        assert!(!tx.is_writable());
        let err = tx.create_bucket(&ctx, &BucketName::from("b")).err().unwrap();
        assert!(matches!(err, Error::ReadOnlyTransaction));
        assert!(matches!(
            tx.delete_bucket(&ctx, &BucketName::from("b")),
            Err(Error::ReadOnlyTransaction)
        ));
    }

    #[test]
    fn test_bucket_lifecycle_errors() {
        let ctx = Context::background();
        let tx = tx(true);
        let name = BucketName::from("b");

        assert!(matches!(tx.bucket(&ctx, &name).err().unwrap(), Error::BucketNotFound));
        tx.create_bucket(&ctx, &name).unwrap();
        assert!(matches!(
            tx.create_bucket(&ctx, &name).err().unwrap(),
            Error::BucketAlreadyExists
        ));
        tx.create_bucket_if_not_exists(&ctx, &name).unwrap();
        tx.delete_bucket(&ctx, &name).unwrap();
        assert!(matches!(tx.delete_bucket(&ctx, &name), Err(Error::BucketNotFound)));

        let (_, ops) = tx.into_parts();
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn test_invalid_names_and_keys() {
        let ctx = Context::background();
        let tx = tx(true);
        let err = tx.create_bucket(&ctx, &BucketName::default()).err().unwrap();
        assert_eq!(err.kind(), kv::ErrorKind::InvalidArgument);

        let bucket = tx.create_bucket(&ctx, &BucketName::from("b")).unwrap();
        assert_eq!(
            bucket.put(&ctx, b"", b"v").unwrap_err().kind(),
            kv::ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_size_limits() {
        let ctx = Context::background();
        let config = Config {
            max_key_size: 4,
            max_value_size: 8,
            ..Config::default()
        };
        let tx = RamTx::new(Arc::new(Snapshot::default()), true, &config);
        let bucket = tx.create_bucket(&ctx, &BucketName::from("b")).unwrap();

        let err = bucket.put(&ctx, b"too-long", b"v").unwrap_err();
        assert_eq!(err.kind(), kv::ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("key too large"));

        let err = bucket.put(&ctx, b"k", b"123456789").unwrap_err();
        assert_eq!(err.kind(), kv::ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("value too large"));

        bucket.put(&ctx, b"k", b"12345678").unwrap();
    }

    #[test]
    fn test_cancelled_context() {
        let ctx = Context::background();
        ctx.cancel();
        let tx = tx(true);
        assert!(matches!(
            tx.list_bucket_names(&ctx),
            Err(Error::Cancelled)
        ));
    }
}
