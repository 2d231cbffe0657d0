//! Hand-written test doubles: a scripted iterator with call counters and a
//! small map-backed database.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::bucket::Bucket;
use crate::bucket_name::{BucketName, BucketNames};
use crate::context::Context;
use crate::db::{Db, TxFn};
use crate::error::{Error, Result};
use crate::item::{ByteItem, Item};
use crate::iterator::BucketIterator;
use crate::tx::Tx;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Calls {
    pub rewind: usize,
    pub valid: usize,
    pub next: usize,
    pub item: usize,
    pub close: usize,
}

struct Script {
    entries: Vec<(Bytes, Bytes)>,
    endless: bool,
    pos: usize,
    calls: Calls,
}

/// Iterator over a fixed list of entries. Clones share position and counters.
#[derive(Clone)]
pub(crate) struct ScriptedIterator {
    script: Rc<RefCell<Script>>,
}

impl ScriptedIterator {
    pub fn from_entries(entries: Vec<(Bytes, Bytes)>) -> Self {
        Self {
            script: Rc::new(RefCell::new(Script {
                entries,
                endless: false,
                pos: 0,
                calls: Calls::default(),
            })),
        }
    }

    pub fn with_keys(keys: &[&str]) -> Self {
        Self::from_entries(
            keys.iter()
                .map(|k| (Bytes::copy_from_slice(k.as_bytes()), Bytes::from_static(b"v")))
                .collect(),
        )
    }

    /// `valid` never turns false.
    pub fn endless() -> Self {
        let it = Self::from_entries(Vec::new());
        it.script.borrow_mut().endless = true;
        it
    }

    pub fn calls(&self) -> Calls {
        self.script.borrow().calls
    }
}

impl BucketIterator for ScriptedIterator {
    fn rewind(&mut self) {
        let mut s = self.script.borrow_mut();
        s.calls.rewind += 1;
        s.pos = 0;
    }

    fn valid(&self) -> bool {
        let mut s = self.script.borrow_mut();
        s.calls.valid += 1;
        s.endless || s.pos < s.entries.len()
    }

    fn next(&mut self) {
        let mut s = self.script.borrow_mut();
        s.calls.next += 1;
        s.pos += 1;
    }

    fn item(&self) -> Box<dyn Item + '_> {
        let mut s = self.script.borrow_mut();
        s.calls.item += 1;
        let item = match s.entries.get(s.pos) {
            Some((k, v)) => ByteItem::new(k.clone(), Some(v.clone())),
            None => ByteItem::new(Bytes::from_static(b"k"), Some(Bytes::from_static(b"v"))),
        };
        Box::new(item)
    }

    fn close(&mut self) {
        self.script.borrow_mut().calls.close += 1;
    }
}

/// Bucket whose only real behavior is handing out one scripted iterator.
pub(crate) struct ScriptedBucket {
    iterator: ScriptedIterator,
}

impl ScriptedBucket {
    pub fn new(iterator: ScriptedIterator) -> Self {
        Self { iterator }
    }
}

impl Bucket for ScriptedBucket {
    fn put(&self, _ctx: &Context, _key: &[u8], _value: &[u8]) -> Result<()> {
        Ok(())
    }

    fn get(&self, _ctx: &Context, key: &[u8]) -> Result<Box<dyn Item + '_>> {
        Ok(Box::new(ByteItem::missing(Bytes::copy_from_slice(key))))
    }

    fn delete(&self, _ctx: &Context, _key: &[u8]) -> Result<()> {
        Ok(())
    }

    fn iterator(&self) -> Box<dyn BucketIterator + '_> {
        Box::new(self.iterator.clone())
    }

    fn iterator_reverse(&self) -> Box<dyn BucketIterator + '_> {
        Box::new(self.iterator.clone())
    }
}

type Buckets = BTreeMap<BucketName, BTreeMap<Vec<u8>, Bytes>>;

/// Map-backed database. Updates hold the lock for their whole run, so
/// writers serialize; views work on a copy.
#[derive(Default)]
pub(crate) struct MemDb {
    data: Mutex<Buckets>,
    pub updates: AtomicUsize,
    pub views: AtomicUsize,
    pub syncs: AtomicUsize,
    pub closes: AtomicUsize,
    pub removes: AtomicUsize,
    /// Fail `close` with an upstream error when set.
    pub fail_close: std::sync::atomic::AtomicBool,
}

impl MemDb {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl Db for MemDb {
    fn update(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.lock();
        let tx = MemTx {
            buckets: RefCell::new(data.clone()),
            writable: true,
        };
        f(ctx, &tx)?;
        *data = tx.buckets.into_inner();
        Ok(())
    }

    fn view(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        self.views.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.data.lock().clone();
        let tx = MemTx {
            buckets: RefCell::new(snapshot),
            writable: false,
        };
        f(ctx, &tx)
    }

    fn sync(&self) -> Result<()> {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(Error::upstream("close failed"));
        }
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.data.lock().clear();
        Ok(())
    }
}

struct MemTx {
    buckets: RefCell<Buckets>,
    writable: bool,
}

impl MemTx {
    fn check_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(Error::ReadOnlyTransaction)
        }
    }
}

impl Tx for MemTx {
    fn bucket(&self, _ctx: &Context, name: &BucketName) -> Result<Box<dyn Bucket + '_>> {
        if !self.buckets.borrow().contains_key(name) {
            return Err(Error::BucketNotFound);
        }
        Ok(Box::new(MemBucket { tx: self, name: name.clone() }))
    }

    fn create_bucket(&self, _ctx: &Context, name: &BucketName) -> Result<Box<dyn Bucket + '_>> {
        self.check_writable()?;
        let mut buckets = self.buckets.borrow_mut();
        if buckets.contains_key(name) {
            return Err(Error::BucketAlreadyExists);
        }
        buckets.insert(name.clone(), BTreeMap::new());
        Ok(Box::new(MemBucket { tx: self, name: name.clone() }))
    }

    fn create_bucket_if_not_exists(
        &self,
        ctx: &Context,
        name: &BucketName,
    ) -> Result<Box<dyn Bucket + '_>> {
        if self.buckets.borrow().contains_key(name) {
            return self.bucket(ctx, name);
        }
        self.create_bucket(ctx, name)
    }

    fn delete_bucket(&self, _ctx: &Context, name: &BucketName) -> Result<()> {
        self.check_writable()?;
        match self.buckets.borrow_mut().remove(name) {
            Some(_) => Ok(()),
            None => Err(Error::BucketNotFound),
        }
    }

    fn list_bucket_names(&self, _ctx: &Context) -> Result<BucketNames> {
        Ok(self.buckets.borrow().keys().cloned().collect())
    }

    fn is_writable(&self) -> bool {
        self.writable
    }
}

struct MemBucket<'a> {
    tx: &'a MemTx,
    name: BucketName,
}

impl MemBucket<'_> {
    fn entries(&self, reverse: bool) -> Vec<(Bytes, Bytes)> {
        let buckets = self.tx.buckets.borrow();
        let mut entries: Vec<(Bytes, Bytes)> = buckets
            .get(&self.name)
            .map(|b| {
                b.iter()
                    .map(|(k, v)| (Bytes::copy_from_slice(k), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        if reverse {
            entries.reverse();
        }
        entries
    }
}

impl Bucket for MemBucket<'_> {
    fn put(&self, _ctx: &Context, key: &[u8], value: &[u8]) -> Result<()> {
        self.tx.check_writable()?;
        let mut buckets = self.tx.buckets.borrow_mut();
        let bucket = buckets.get_mut(&self.name).ok_or(Error::BucketNotFound)?;
        bucket.insert(key.to_vec(), Bytes::copy_from_slice(value));
        Ok(())
    }

    fn get(&self, _ctx: &Context, key: &[u8]) -> Result<Box<dyn Item + '_>> {
        let buckets = self.tx.buckets.borrow();
        let bucket = buckets.get(&self.name).ok_or(Error::BucketNotFound)?;
        let value = bucket.get(key).cloned();
        Ok(Box::new(ByteItem::new(Bytes::copy_from_slice(key), value)))
    }

    fn delete(&self, _ctx: &Context, key: &[u8]) -> Result<()> {
        self.tx.check_writable()?;
        let mut buckets = self.tx.buckets.borrow_mut();
        let bucket = buckets.get_mut(&self.name).ok_or(Error::BucketNotFound)?;
        bucket.remove(key);
        Ok(())
    }

    fn iterator(&self) -> Box<dyn BucketIterator + '_> {
        Box::new(ScriptedIterator::from_entries(self.entries(false)))
    }

    fn iterator_reverse(&self) -> Box<dyn BucketIterator + '_> {
        Box::new(ScriptedIterator::from_entries(self.entries(true)))
    }
}
