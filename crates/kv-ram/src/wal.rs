//! Write-ahead log of commit batches
//!
//! The WAL provides durability through careful write ordering:
//! 1. Serialize the whole transaction into one framed record
//! 2. Append the record to the current WAL file
//! 3. durable_sync() if the commit must survive power loss
//! 4. Return success (caller publishes the new snapshot AFTER this returns)
//!
//! Reads never touch the WAL. It is only read back once, on open.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{RamError, RamResult};
use crate::format::{deserialize_batch, serialize_batch, CommitBatch, Operation};
use crate::platform_durability::{durable_sync, sync_directory};

const WAL_PREFIX: &str = "wal-";
const WAL_SUFFIX: &str = ".kvlog";

fn wal_file_name(sequence: u64) -> String {
    format!("{}{:016x}{}", WAL_PREFIX, sequence, WAL_SUFFIX)
}

fn parse_wal_file_name(name: &str) -> Option<u64> {
    let hex = name.strip_prefix(WAL_PREFIX)?.strip_suffix(WAL_SUFFIX)?;
    u64::from_str_radix(hex, 16).ok()
}

/// Appends commit records and keeps them durable.
///
/// INVARIANT: `append_*` must return before the caller makes the batch
/// visible to readers.
pub struct WalWriter {
    /// Current WAL file handle
    file: File,
    /// Path to current WAL file (for error context)
    path: PathBuf,
    /// Current file size in bytes (tracked to avoid stat calls)
    size: u64,
    /// WAL directory for file rotation
    wal_dir: PathBuf,
    /// Sequence number in the current file's name
    file_sequence: u64,
    /// Rotate once the current file would grow past this
    rotation_size: u64,
    /// Set after a failed append; the writer refuses further appends
    poisoned: Option<String>,
}

impl WalWriter {
    /// Open the newest WAL file in `wal_dir` for appending, creating the
    /// directory and the first file if needed.
    pub fn open<P: AsRef<Path>>(wal_dir: P, rotation_size: u64) -> RamResult<Self> {
        let wal_dir = wal_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| RamError::io(&wal_dir, e, "Failed to create WAL directory"))?;

        let file_sequence = Self::find_max_sequence(&wal_dir)?;
        let path = wal_dir.join(wal_file_name(file_sequence));
        let file = open_append(&path)?;
        let size = file
            .metadata()
            .map_err(|e| RamError::io(&path, e, "Failed to stat WAL file"))?
            .len();
        sync_directory(&wal_dir)
            .map_err(|e| RamError::io(&wal_dir, e, "Failed to sync WAL directory"))?;

        Ok(Self { file, path, size, wal_dir, file_sequence, rotation_size, poisoned: None })
    }

    fn find_max_sequence(wal_dir: &Path) -> RamResult<u64> {
        Ok(list_wal_files(wal_dir)?
            .last()
            .map(|(sequence, _)| *sequence)
            .unwrap_or(0))
    }

    /// Append one commit and wait until it is on persistent storage.
    pub fn append_durable(&mut self, sequence: u64, ops: &[Operation]) -> RamResult<()> {
        self.append(sequence, ops, true)
    }

    /// Append one commit to the OS page cache only.
    ///
    /// The commit survives a process crash but not a power loss until the
    /// next `sync`.
    pub fn append_fast(&mut self, sequence: u64, ops: &[Operation]) -> RamResult<()> {
        self.append(sequence, ops, false)
    }

    /// Write one record. Either the whole record is in the file (and synced
    /// when `durable`) or the file is back at its previous length.
    fn append(&mut self, sequence: u64, ops: &[Operation], durable: bool) -> RamResult<()> {
        if let Some(reason) = &self.poisoned {
            return Err(RamError::WalPoisoned { path: self.path.clone(), reason: reason.clone() });
        }
        let record = serialize_batch(sequence, ops)?;

        if self.size > 0 && self.size + record.len() as u64 > self.rotation_size {
            self.rotate()?;
        }

        let start = self.size;
        let written = self
            .file
            .write_all(&record)
            .map_err(|e| RamError::io(&self.path, e, "WAL write failed"))
            .and_then(|()| if durable { self.sync() } else { Ok(()) });

        match written {
            Ok(()) => {
                self.size = start + record.len() as u64;
                Ok(())
            }
            Err(err) => Err(self.abandon_record(start, err)),
        }
    }

    /// Cut the file back to `start` after a failed append and stop taking
    /// writes. Returns the error the caller should report.
    fn abandon_record(&mut self, start: u64, err: RamError) -> RamError {
        self.poisoned = Some(err.to_string());
        warn!(
            path = %self.path.display(),
            offset = start,
            error = %err,
            "WAL append failed, writer refuses further commits"
        );

        let truncated = self
            .file
            .set_len(start)
            .and_then(|()| durable_sync(&self.file));
        match truncated {
            Ok(()) => {
                self.size = start;
                err
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    offset = start,
                    error = %e,
                    "failed to drop partial WAL record"
                );
                RamError::io(&self.path, e, "Failed to drop partial WAL record")
            }
        }
    }

    /// True once an append has failed.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Start a new WAL file. Syncs the current one first.
    fn rotate(&mut self) -> RamResult<()> {
        self.sync()?;

        let next_sequence = self.file_sequence + 1;
        let new_path = self.wal_dir.join(wal_file_name(next_sequence));
        let new_file = open_append(&new_path)?;
        sync_directory(&self.wal_dir)
            .map_err(|e| RamError::io(&self.wal_dir, e, "Failed to sync WAL directory"))?;

        debug!(from = %self.path.display(), to = %new_path.display(), "rotated WAL");
        self.file = new_file;
        self.path = new_path;
        self.size = 0;
        self.file_sequence = next_sequence;
        Ok(())
    }

    /// Flush everything appended so far to persistent storage.
    pub fn sync(&self) -> RamResult<()> {
        durable_sync(&self.file).map_err(|e| RamError::io(&self.path, e, "WAL durable_sync failed"))
    }

    /// Get the current WAL file path (for diagnostics)
    pub fn current_path(&self) -> &Path {
        &self.path
    }

    /// Get the current WAL file size in bytes
    pub fn current_size(&self) -> u64 {
        self.size
    }
}

fn open_append(path: &Path) -> RamResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| RamError::io(path, e, "Failed to open WAL file"))
}

/// WAL files in `wal_dir`, ordered by sequence.
fn list_wal_files(wal_dir: &Path) -> RamResult<Vec<(u64, PathBuf)>> {
    let mut files = Vec::new();
    let entries = match std::fs::read_dir(wal_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(RamError::io(wal_dir, e, "Failed to read WAL directory")),
    };
    for entry in entries {
        let entry = entry.map_err(|e| RamError::io(wal_dir, e, "Failed to read directory entry"))?;
        let path = entry.path();
        if let Some(sequence) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_wal_file_name)
        {
            files.push((sequence, path));
        }
    }
    files.sort();
    Ok(files)
}

/// Where replay had to stop before the end of the log.
#[derive(Debug, Clone)]
pub struct DamagedTail {
    /// File containing the first unreadable record
    pub path: PathBuf,
    /// Length of the readable prefix of that file
    pub valid_len: u64,
    /// Later WAL files, never replayed
    pub later_files: Vec<PathBuf>,
    /// Why the record could not be read
    pub error: RamError,
}

/// Result of reading the whole WAL.
#[derive(Debug, Default)]
pub struct Recovery {
    /// Intact commits in log order
    pub batches: Vec<CommitBatch>,
    /// Set when replay stopped at a torn or corrupt record
    pub damaged: Option<DamagedTail>,
}

/// Reads commit batches back on open.
pub struct WalReader {
    wal_dir: PathBuf,
}

impl WalReader {
    pub fn new<P: AsRef<Path>>(wal_dir: P) -> Self {
        Self { wal_dir: wal_dir.as_ref().to_path_buf() }
    }

    /// Read every intact commit in sequence order.
    ///
    /// Stops at the first torn or corrupt record: a commit is applied
    /// completely or not at all, and nothing after a bad record is trusted.
    pub fn recover(&self) -> RamResult<Recovery> {
        let files = list_wal_files(&self.wal_dir)?;
        let mut recovery = Recovery::default();

        for (index, (_, path)) in files.iter().enumerate() {
            let buffer = read_file(path)?;
            let mut offset = 0usize;

            while offset < buffer.len() {
                match deserialize_batch(&buffer[offset..]) {
                    Ok((batch, used)) => {
                        recovery.batches.push(batch);
                        offset += used;
                    }
                    Err(e) => {
                        let error = e.at(path, offset as u64);
                        warn!(
                            path = %path.display(),
                            offset,
                            error = %error,
                            "WAL replay stopped at unreadable record"
                        );
                        recovery.damaged = Some(DamagedTail {
                            path: path.clone(),
                            valid_len: offset as u64,
                            later_files: files[index + 1..].iter().map(|(_, p)| p.clone()).collect(),
                            error,
                        });
                        return Ok(recovery);
                    }
                }
            }
        }

        Ok(recovery)
    }

    /// Cut the log back to its readable prefix so new commits are appended
    /// after the last good record.
    pub fn truncate_damaged_tail(&self, damaged: &DamagedTail) -> RamResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(&damaged.path)
            .map_err(|e| RamError::io(&damaged.path, e, "Failed to open WAL file for repair"))?;
        file.set_len(damaged.valid_len)
            .map_err(|e| RamError::io(&damaged.path, e, "Failed to truncate WAL file"))?;
        durable_sync(&file)
            .map_err(|e| RamError::io(&damaged.path, e, "Failed to sync repaired WAL file"))?;

        for later in &damaged.later_files {
            std::fs::remove_file(later)
                .map_err(|e| RamError::io(later, e, "Failed to remove unreplayed WAL file"))?;
        }
        sync_directory(&self.wal_dir)
            .map_err(|e| RamError::io(&self.wal_dir, e, "Failed to sync WAL directory"))
    }
}

fn read_file(path: &Path) -> RamResult<Vec<u8>> {
    let mut file = File::open(path)
        .map_err(|e| RamError::io(path, e, "Failed to open WAL file for recovery"))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)
        .map_err(|e| RamError::io(path, e, "Failed to read WAL file"))?;
    Ok(buffer)
}
