//! Bucket handle of a RAM transaction.

use kv::{Bucket, BucketIterator, ByteItem, Context, Item, Result};

use crate::iterator::RamIterator;
use crate::tx::RamTx;

/// One bucket inside a `RamTx`. All state lives in the transaction; the
/// handle only carries the bucket name.
pub struct RamBucket<'tx> {
    tx: &'tx RamTx,
    name: Vec<u8>,
}

impl<'tx> RamBucket<'tx> {
    pub(crate) fn new(tx: &'tx RamTx, name: Vec<u8>) -> Self {
        Self { tx, name }
    }
}

impl Bucket for RamBucket<'_> {
    fn put(&self, ctx: &Context, key: &[u8], value: &[u8]) -> Result<()> {
        ctx.err()?;
        self.tx.put(&self.name, key, value)
    }

    fn get(&self, ctx: &Context, key: &[u8]) -> Result<Box<dyn Item + '_>> {
        ctx.err()?;
        let value = self.tx.get(&self.name, key)?;
        Ok(Box::new(ByteItem::new(key.to_vec(), value)))
    }

    fn delete(&self, ctx: &Context, key: &[u8]) -> Result<()> {
        ctx.err()?;
        self.tx.delete(&self.name, key)
    }

    fn iterator(&self) -> Box<dyn BucketIterator + '_> {
        Box::new(RamIterator::new(self.tx.bucket_data(&self.name), false))
    }

    fn iterator_reverse(&self) -> Box<dyn BucketIterator + '_> {
        Box::new(RamIterator::new(self.tx.bucket_data(&self.name), true))
    }
}
