//! kv-ram - RAM-First Engine for the kv Contracts
//!
//! An embedded implementation of `kv::Db` where RAM holds the whole data
//! set and a write-ahead log on disk provides crash safety.
//!
//! # Architecture
//!
//! - **Read path**: `view` reads an immutable snapshot (never blocks writers)
//! - **Write path**: single writer, copy-on-write, WAL-first, then publish
//! - **Recovery**: replay the WAL on open, cut a torn tail
//!
//! # Persistence Optional
//!
//! `RamDb::in_memory` skips the WAL entirely, which makes it a convenient
//! engine for tests of code written against `kv`.

pub mod bucket;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod format;
pub mod iterator;
pub mod platform_durability;
pub mod tx;
pub mod wal;

// Re-export key types for convenience
pub use config::{Config, WriteLock};
pub use db::RamDb;
pub use error::{RamError, RamResult};
pub use format::Operation;
pub use wal::{Recovery, WalReader, WalWriter};
