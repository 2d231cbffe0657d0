//! Bucket contract.

use crate::context::Context;
use crate::error::Result;
use crate::item::Item;
use crate::iterator::BucketIterator;

/// CRUD and iteration over one namespace inside one transaction.
///
/// A bucket borrows its transaction, so it cannot outlive the
/// `update`/`view` closure that produced it.
pub trait Bucket {
    /// Insert or overwrite the value stored under `key`.
    fn put(&self, ctx: &Context, key: &[u8], value: &[u8]) -> Result<()>;

    /// Look up `key`.
    ///
    /// An absent key is not an error: the returned item reports
    /// `exists() == false`. Engines implementing this trait must keep that
    /// contract; `StoreTx` relies on it.
    fn get(&self, ctx: &Context, key: &[u8]) -> Result<Box<dyn Item + '_>>;

    /// Remove `key`. Removing an absent key succeeds.
    fn delete(&self, ctx: &Context, key: &[u8]) -> Result<()>;

    /// Fresh cursor in ascending key order.
    fn iterator(&self) -> Box<dyn BucketIterator + '_>;

    /// Fresh cursor in descending key order.
    fn iterator_reverse(&self) -> Box<dyn BucketIterator + '_>;
}
