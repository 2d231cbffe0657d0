//! Committed state of the RAM engine.
//!
//! A `Snapshot` maps bucket names to ordered key/value tables. Tables sit
//! behind `Arc` so that cloning a snapshot is cheap: a write transaction
//! copies only the tables it actually touches (`Arc::make_mut`).
//!
//! **Read path**: clone the published `Arc<Snapshot>`, never block writers
//! **Write path**: copy-on-write, WAL append, then publish

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use hashbrown::HashMap;

use crate::format::Operation;

/// Entries of one bucket, ordered by key bytes.
pub type BucketData = BTreeMap<Vec<u8>, Bytes>;

/// Immutable view of every bucket at one commit.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    buckets: HashMap<Vec<u8>, Arc<BucketData>>,
}

impl Snapshot {
    pub fn bucket(&self, name: &[u8]) -> Option<&Arc<BucketData>> {
        self.buckets.get(name)
    }

    pub fn contains_bucket(&self, name: &[u8]) -> bool {
        self.buckets.contains_key(name)
    }

    /// Mutable access to one bucket's table, copying it if shared.
    pub fn bucket_mut(&mut self, name: &[u8]) -> Option<&mut BucketData> {
        self.buckets.get_mut(name).map(Arc::make_mut)
    }

    pub fn insert_bucket(&mut self, name: Vec<u8>) {
        self.buckets.entry(name).or_default();
    }

    pub fn remove_bucket(&mut self, name: &[u8]) -> bool {
        self.buckets.remove(name).is_some()
    }

    /// Bucket names in ascending byte order.
    pub fn bucket_names(&self) -> Vec<Vec<u8>> {
        let mut names: Vec<Vec<u8>> = self.buckets.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of entries across all buckets.
    pub fn entry_count(&self) -> usize {
        self.buckets.values().map(|b| b.len()).sum()
    }

    /// Replay one logged operation.
    ///
    /// Ops referring to a bucket that does not exist are skipped; a
    /// transaction only logs ops it could apply, so this only happens on
    /// hand-edited logs.
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::CreateBucket { bucket } => self.insert_bucket(bucket.clone()),
            Operation::DeleteBucket { bucket } => {
                self.remove_bucket(bucket);
            }
            Operation::Put { bucket, key, value } => {
                if let Some(data) = self.bucket_mut(bucket) {
                    data.insert(key.clone(), value.clone());
                }
            }
            Operation::Delete { bucket, key } => {
                if let Some(data) = self.bucket_mut(bucket) {
                    data.remove(key);
                }
            }
        }
    }
}
