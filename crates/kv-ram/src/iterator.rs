//! Ordered cursor over one bucket's table.
//!
//! The cursor holds its own `Arc` of the table, so creating it is O(1) and
//! it keeps reading the state from the moment it was opened. Each step is a
//! BTreeMap range lookup from the current key: O(log n).

use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;
use kv::{BucketIterator, ByteItem, Item};

use crate::engine::BucketData;

/// Forward or reverse cursor over a `BucketData` table.
pub struct RamIterator {
    /// Table as of cursor creation
    data: Arc<BucketData>,
    /// Current key, `None` before `rewind` and after the last entry
    position: Option<Vec<u8>>,
    reverse: bool,
    closed: bool,
}

impl RamIterator {
    pub(crate) fn new(data: Arc<BucketData>, reverse: bool) -> Self {
        Self {
            data,
            position: None,
            reverse,
            closed: false,
        }
    }

    fn entry(&self) -> Option<(&Vec<u8>, &Bytes)> {
        let key = self.position.as_ref()?;
        self.data.get_key_value(key)
    }
}

impl std::fmt::Debug for RamIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RamIterator")
            .field("entries", &self.data.len())
            .field("position", &self.position)
            .field("reverse", &self.reverse)
            .field("closed", &self.closed)
            .finish()
    }
}

impl BucketIterator for RamIterator {
    fn rewind(&mut self) {
        if self.closed {
            return;
        }
        let first = if self.reverse {
            self.data.keys().next_back()
        } else {
            self.data.keys().next()
        };
        self.position = first.cloned();
    }

    fn valid(&self) -> bool {
        !self.closed && self.position.is_some()
    }

    fn next(&mut self) {
        let Some(current) = self.position.take() else {
            return;
        };
        let next = if self.reverse {
            self.data
                .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(current.as_slice())))
                .next_back()
        } else {
            self.data
                .range::<[u8], _>((Bound::Excluded(current.as_slice()), Bound::Unbounded))
                .next()
        };
        self.position = next.map(|(k, _)| k.clone());
    }

    fn item(&self) -> Box<dyn Item + '_> {
        match self.entry() {
            Some((key, value)) => Box::new(ByteItem::new(key.clone(), Some(value.clone()))),
            None => Box::new(ByteItem::default()),
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.position = None;
    }
}
