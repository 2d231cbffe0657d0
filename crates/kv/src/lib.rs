//! kv - Engine-Agnostic Transactional Key-Value Layer
//!
//! Contracts for an ordered, bucketed key-value store with closure-scoped
//! transactions, plus the generic machinery built on them.
//!
//! # Architecture
//!
//! - **Contracts**: [`Db`] → [`Tx`] → [`Bucket`] → [`BucketIterator`] / [`Item`]
//! - **Typed store**: [`StoreTx`] works inside a caller's transaction,
//!   [`Store`] opens its own
//! - **Decorators**: [`DbWithMetrics`] counts transactions into Prometheus
//! - **Maintenance**: single-flight [`ResetBucket`] / [`ResetDb`], and a
//!   write/read [`Benchmark`]
//!
//! # No Engine Inside
//!
//! This crate never touches a disk. Storage engines implement the contracts
//! in separate crates (e.g. kv-ram).

pub mod benchmark;
pub mod bucket;
pub mod bucket_name;
pub mod codec;
pub mod context;
pub mod db;
pub mod error;
pub mod foreach;
pub mod item;
pub mod iterator;
pub mod key;
pub mod metrics;
pub mod provider;
pub mod reset;
pub mod run_func;
pub mod store;
pub mod store_tx;
pub mod tx;

#[cfg(test)]
mod mock;

// Re-export key types for convenience
pub use benchmark::{
    rand_string, run_with_provider, shuffle, Benchmark, BenchmarkParams, BenchmarkResult,
    BENCHMARK_TIMEOUT,
};
pub use bucket::Bucket;
pub use bucket_name::{BucketName, BucketNames, BUCKET_NAME_SEPARATOR};
pub use codec::{Codec, JsonCodec};
pub use context::Context;
pub use db::{Db, DbExt, TxFn};
pub use error::{BoxError, Error, ErrorKind, Result, ResultExt};
pub use foreach::{count, for_each};
pub use item::{ByteItem, Item};
pub use iterator::{BucketIterator, IteratorGuard};
pub use key::{Key, StoreKey};
pub use metrics::{DbWithMetrics, Metrics, PrometheusMetrics};
pub use provider::Provider;
pub use reset::{ResetBucket, ResetDb, ResetHook, SingleFlight, SingleFlightGuard};
pub use run_func::{run_update, run_view, RunnableTx};
pub use store::Store;
pub use store_tx::StoreTx;
pub use tx::Tx;
