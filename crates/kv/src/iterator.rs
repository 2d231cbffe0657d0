//! Ordered cursors over one bucket.

use std::ops::{Deref, DerefMut};

use crate::item::Item;

/// Ordered cursor over one bucket's entries within one transaction.
///
/// Usage follows `rewind` → (`valid` → `item` → `next`)* and ends with
/// exactly one `close`. `item` and `next` are only meaningful while `valid`
/// returns true.
pub trait BucketIterator {
    /// Position at the first entry (last entry for reverse iterators).
    fn rewind(&mut self);

    /// True while the cursor addresses an entry.
    fn valid(&self) -> bool;

    /// Advance one entry in iteration order.
    fn next(&mut self);

    /// The entry at the current position.
    fn item(&self) -> Box<dyn Item + '_>;

    /// Release resources held by the cursor.
    fn close(&mut self);
}

/// Owns an acquired iterator and closes it exactly once on drop.
///
/// Every traversal in this crate holds its iterator through a guard, so
/// early returns, callback errors, cancellation and unwinding all release
/// the cursor.
pub struct IteratorGuard<'a> {
    inner: Box<dyn BucketIterator + 'a>,
}

impl<'a> IteratorGuard<'a> {
    pub fn new(inner: Box<dyn BucketIterator + 'a>) -> Self {
        Self { inner }
    }
}

impl<'a> Deref for IteratorGuard<'a> {
    type Target = dyn BucketIterator + 'a;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl<'a> DerefMut for IteratorGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for IteratorGuard<'_> {
    fn drop(&mut self) {
        self.inner.close();
    }
}
