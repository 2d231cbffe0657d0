//! Raw traversal helpers over a bucket.

use crate::bucket::Bucket;
use crate::context::Context;
use crate::error::{Result, ResultExt};
use crate::item::Item;
use crate::iterator::IteratorGuard;

/// Call `f` for every entry of `bucket` in ascending key order.
///
/// The context is checked before each entry. The first error from `f` or
/// from the context stops the walk and is returned; the iterator is closed
/// on every path.
pub fn for_each<F>(ctx: &Context, bucket: &dyn Bucket, mut f: F) -> Result<()>
where
    F: FnMut(&dyn Item) -> Result<()>,
{
    let mut it = IteratorGuard::new(bucket.iterator());
    it.rewind();
    while it.valid() {
        ctx.err()?;
        f(it.item().as_ref()).context("fn failed")?;
        it.next();
    }
    Ok(())
}

/// Number of entries in `bucket`.
///
/// Walks the whole iterator, checking the context before each step. A
/// cancelled walk yields the context error instead of a partial count.
pub fn count(ctx: &Context, bucket: &dyn Bucket) -> Result<u64> {
    let mut it = IteratorGuard::new(bucket.iterator());
    let mut n = 0u64;
    it.rewind();
    loop {
        ctx.err()?;
        if !it.valid() {
            return Ok(n);
        }
        n += 1;
        it.next();
    }
}
