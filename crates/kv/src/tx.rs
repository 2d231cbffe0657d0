//! Transaction contract.

use crate::bucket::Bucket;
use crate::bucket_name::{BucketName, BucketNames};
use crate::context::Context;
use crate::error::Result;

/// Atomic unit of work handed to `Db::update` / `Db::view` closures.
///
/// Buckets, items and iterators obtained here borrow the transaction and
/// are therefore confined to the closure.
pub trait Tx {
    /// Open an existing bucket. Fails with `Error::BucketNotFound`.
    fn bucket(&self, ctx: &Context, name: &BucketName) -> Result<Box<dyn Bucket + '_>>;

    /// Create a bucket. Fails with `Error::BucketAlreadyExists`.
    fn create_bucket(&self, ctx: &Context, name: &BucketName) -> Result<Box<dyn Bucket + '_>>;

    /// Open the bucket, creating it first if needed.
    fn create_bucket_if_not_exists(
        &self,
        ctx: &Context,
        name: &BucketName,
    ) -> Result<Box<dyn Bucket + '_>>;

    /// Remove a bucket and every entry in it. Fails with `Error::BucketNotFound`.
    fn delete_bucket(&self, ctx: &Context, name: &BucketName) -> Result<()>;

    /// Names of all buckets visible to this transaction, ascending.
    fn list_bucket_names(&self, ctx: &Context) -> Result<BucketNames>;

    /// False inside `Db::view`.
    fn is_writable(&self) -> bool;
}
