//! `RamDb`: the `kv::Db` implementation of the RAM engine.
//!
//! **Read path**: `view` clones the published snapshot `Arc` and never waits
//! for writers.
//! **Write path**: one `update` at a time. The closure works on a private
//! copy; on `Ok` the ops are appended to the WAL and only then is the new
//! snapshot published.
//! **Recovery**: `open` replays the WAL and truncates a torn tail.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use kv::{Context, Db, Error, Result, TxFn};
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, trace};

use crate::config::{Config, WriteLock};
use crate::engine::Snapshot;
use crate::error::{RamError, RamResult};
use crate::format::Operation;
use crate::tx::RamTx;
use crate::wal::{WalReader, WalWriter};

const WAL_DIR: &str = "wal";

/// RAM-first database with an optional write-ahead log.
///
/// All methods take `&self`; share it through `Arc`.
pub struct RamDb {
    /// Last committed state, replaced wholesale on every commit
    committed: RwLock<Arc<Snapshot>>,
    /// Held for the whole of an `update`
    write_lock: Mutex<()>,
    /// `None` for in-memory databases and after `close`
    wal: Mutex<Option<WalWriter>>,
    /// Database directory, `None` for in-memory databases
    path: Option<PathBuf>,
    config: Config,
    closed: AtomicBool,
    /// Sequence number of the last commit
    sequence: AtomicU64,
}

impl RamDb {
    /// Open or create a database in `path`.
    ///
    /// Replays every intact commit from the WAL. A torn or corrupt record
    /// ends the replay; the log is cut back to the last good commit.
    pub fn open<P: AsRef<Path>>(path: P, config: Config) -> RamResult<Self> {
        config.validate().map_err(RamError::InvalidConfig)?;

        let path = path.as_ref().to_path_buf();
        let wal_dir = path.join(WAL_DIR);
        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| RamError::io(&wal_dir, e, "Failed to create WAL directory"))?;

        let reader = WalReader::new(&wal_dir);
        let recovery = reader.recover()?;

        let mut snapshot = Snapshot::default();
        let mut sequence = 0;
        for batch in &recovery.batches {
            for op in &batch.ops {
                snapshot.apply(op);
            }
            sequence = batch.sequence;
        }

        if let Some(damaged) = &recovery.damaged {
            reader.truncate_damaged_tail(damaged)?;
        }

        if !recovery.batches.is_empty() {
            info!(
                path = %path.display(),
                commits = recovery.batches.len(),
                buckets = snapshot.bucket_count(),
                entries = snapshot.entry_count(),
                "recovered database from WAL"
            );
        }

        let wal = WalWriter::open(&wal_dir, config.wal_rotation_size_bytes)?;

        Ok(Self {
            committed: RwLock::new(Arc::new(snapshot)),
            write_lock: Mutex::new(()),
            wal: Mutex::new(Some(wal)),
            path: Some(path),
            config,
            closed: AtomicBool::new(false),
            sequence: AtomicU64::new(sequence),
        })
    }

    /// A database that lives only in memory. `sync` is a no-op and
    /// `remove` drops the data.
    pub fn in_memory(config: Config) -> RamResult<Self> {
        config.validate().map_err(RamError::InvalidConfig)?;
        Ok(Self {
            committed: RwLock::new(Arc::new(Snapshot::default())),
            write_lock: Mutex::new(()),
            wal: Mutex::new(None),
            path: None,
            config,
            closed: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
        })
    }

    /// Database directory, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sequence number of the last commit (0 before the first).
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::DatabaseClosed)
        } else {
            Ok(())
        }
    }

    fn acquire_writer(&self) -> Result<MutexGuard<'_, ()>> {
        match self.config.write_lock {
            WriteLock::Block => Ok(self.write_lock.lock()),
            WriteLock::FailFast => self
                .write_lock
                .try_lock()
                .ok_or(Error::TransactionAlreadyOpen),
        }
    }

    /// Log one commit. Caller holds the write lock.
    fn append(&self, sequence: u64, ops: &[Operation]) -> RamResult<()> {
        let mut wal = self.wal.lock();
        let Some(writer) = wal.as_mut() else {
            return Ok(());
        };
        if self.config.sync_on_commit {
            writer.append_durable(sequence, ops)
        } else {
            writer.append_fast(sequence, ops)
        }
    }
}

impl std::fmt::Debug for RamDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RamDb")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .field("last_sequence", &self.last_sequence())
            .finish()
    }
}

impl Db for RamDb {
    fn update(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        self.ensure_open()?;
        ctx.err()?;

        let _writer = self.acquire_writer()?;
        // close() may have won the race for the lock
        self.ensure_open()?;

        let base = self.committed.read().clone();
        let tx = RamTx::new(base, true, &self.config);
        if let Err(err) = f(ctx, &tx) {
            debug!(error = %err, "update rolled back");
            return Err(err);
        }

        let (snapshot, ops) = tx.into_parts();
        if ops.is_empty() {
            trace!("update without writes, nothing to commit");
            return Ok(());
        }

        let sequence = self.sequence.load(Ordering::Acquire) + 1;
        self.append(sequence, &ops)?;
        *self.committed.write() = snapshot;
        self.sequence.store(sequence, Ordering::Release);
        debug!(sequence, ops = ops.len(), "update committed");
        Ok(())
    }

    fn view(&self, ctx: &Context, f: &mut TxFn<'_>) -> Result<()> {
        self.ensure_open()?;
        ctx.err()?;

        let snapshot = self.committed.read().clone();
        let tx = RamTx::new(snapshot, false, &self.config);
        f(ctx, &tx)
    }

    fn sync(&self) -> Result<()> {
        self.ensure_open()?;
        if let Some(writer) = self.wal.lock().as_ref() {
            writer.sync()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let _writer = self.write_lock.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(writer) = self.wal.lock().take() {
            writer.sync()?;
        }
        debug!(path = ?self.path, "database closed");
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        if !self.is_closed() {
            let path = self
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from("<memory>"));
            return Err(RamError::StillOpen { path }.into());
        }

        let Some(path) = &self.path else {
            *self.committed.write() = Arc::new(Snapshot::default());
            return Ok(());
        };
        match std::fs::remove_dir_all(path) {
            Ok(()) => {
                info!(path = %path.display(), "database removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RamError::io(path, e, "Failed to remove database directory").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use kv::{BucketName, DbExt, Tx};
    use tempfile::TempDir;

    use super::*;

    fn put(db: &RamDb, bucket: &str, key: &str, value: &str) {
        db.update(&Context::background(), &mut |ctx: &Context, tx: &dyn Tx| {
            let bucket = tx.create_bucket_if_not_exists(ctx, &BucketName::from(bucket))?;
            bucket.put(ctx, key.as_bytes(), value.as_bytes())
        })
        .unwrap();
    }

    #[test]
    fn test_sequence_advances_only_on_writes() {
        let db = RamDb::in_memory(Config::default()).unwrap();
        put(&db, "b", "k", "v");
        assert_eq!(db.last_sequence(), 1);

        db.update(&Context::background(), &mut |_: &Context, _: &dyn Tx| Ok(()))
            .unwrap();
        assert_eq!(db.last_sequence(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            max_key_size: 0,
            ..Config::default()
        };
        assert!(matches!(RamDb::in_memory(config), Err(RamError::InvalidConfig(_))));
    }

    #[test]
    fn test_reopen_restores_sequence() {
        let dir = TempDir::new().unwrap();
        {
            let db = RamDb::open(dir.path(), Config::fast()).unwrap();
            put(&db, "b", "k1", "v1");
            put(&db, "b", "k2", "v2");
            db.close().unwrap();
        }
        let db = RamDb::open(dir.path(), Config::fast()).unwrap();
        assert_eq!(db.last_sequence(), 2);
        let n = db
            .view_with(&Context::background(), |ctx, tx| {
                kv::count(ctx, &*tx.bucket(ctx, &BucketName::from("b"))?)
            })
            .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_close_is_idempotent() {
        let db = RamDb::in_memory(Config::default()).unwrap();
        db.close().unwrap();
        db.close().unwrap();
        assert!(db.is_closed());
        assert!(matches!(db.sync(), Err(Error::DatabaseClosed)));
    }

    #[test]
    fn test_in_memory_remove_drops_data() {
        let db = RamDb::in_memory(Config::default()).unwrap();
        put(&db, "b", "k", "v");
        assert!(db.remove().is_err());
        db.close().unwrap();
        db.remove().unwrap();
        assert_eq!(db.committed.read().bucket_count(), 0);
    }

    #[test]
    fn test_debug_output() {
        let db = RamDb::in_memory(Config::default()).unwrap();
        let debug = format!("{:?}", db);
        assert!(debug.contains("RamDb"));
        assert!(debug.contains("closed: false"));
    }
}
