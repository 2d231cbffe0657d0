//! Write/read throughput measurement against any [`Db`].

use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::bucket_name::BucketName;
use crate::context::Context;
use crate::db::Db;
use crate::error::{Error, Result, ResultExt};
use crate::provider::Provider;
use crate::tx::Tx;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Upper bound for one [`run_with_provider`] call.
pub const BENCHMARK_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Timings of one benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkResult {
    pub amount: usize,
    pub value_size: usize,
    pub write_duration: Duration,
    pub read_duration: Duration,
}

impl BenchmarkResult {
    pub fn avg_write(&self) -> Duration {
        average(self.write_duration, self.amount)
    }

    pub fn avg_read(&self) -> Duration {
        average(self.read_duration, self.amount)
    }
}

fn average(total: Duration, amount: usize) -> Duration {
    match u32::try_from(amount) {
        Ok(0) | Err(_) => Duration::ZERO,
        Ok(n) => total / n,
    }
}

/// Writes `amount` random values in shuffled key order, then reads them
/// all back in a fresh shuffled order.
pub struct Benchmark<D> {
    db: D,
    bucket_name: BucketName,
}

impl<D: Db> Benchmark<D> {
    pub fn new(db: D) -> Self {
        Self {
            db,
            bucket_name: BucketName::from("test"),
        }
    }

    pub fn bucket_name(&self) -> &BucketName {
        &self.bucket_name
    }

    /// Run the benchmark with `batch_size` operations per transaction.
    pub fn run(
        &self,
        ctx: &Context,
        amount: usize,
        value_size: usize,
        batch_size: usize,
    ) -> Result<BenchmarkResult> {
        if batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be positive".into()));
        }
        let mut keys = generate_keys(amount);

        let start = Instant::now();
        self.write(ctx, &mut keys, batch_size, value_size)
            .context("write failed")?;
        let write_duration = start.elapsed();
        debug!(amount, ?write_duration, "write complete");

        let start = Instant::now();
        self.read(ctx, &mut keys, batch_size)
            .context("read failed")?;
        let read_duration = start.elapsed();
        debug!(amount, ?read_duration, "read complete");

        Ok(BenchmarkResult {
            amount,
            value_size,
            write_duration,
            read_duration,
        })
    }

    fn write(
        &self,
        ctx: &Context,
        keys: &mut [String],
        batch_size: usize,
        value_size: usize,
    ) -> Result<()> {
        let value = rand_string(value_size);
        shuffle(keys);
        for batch in keys.chunks(batch_size) {
            ctx.err()?;
            self.db.update(ctx, &mut |ctx: &Context, tx: &dyn Tx| {
                let bucket = tx
                    .create_bucket_if_not_exists(ctx, &self.bucket_name)
                    .context("create bucket failed")?;
                for key in batch {
                    bucket
                        .put(ctx, key.as_bytes(), value.as_bytes())
                        .context("put failed")?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn read(&self, ctx: &Context, keys: &mut [String], batch_size: usize) -> Result<()> {
        shuffle(keys);
        for batch in keys.chunks(batch_size) {
            ctx.err()?;
            self.db.view(ctx, &mut |ctx: &Context, tx: &dyn Tx| {
                let bucket = tx
                    .bucket(ctx, &self.bucket_name)
                    .context("get bucket failed")?;
                for key in batch {
                    let item = bucket.get(ctx, key.as_bytes()).context("get failed")?;
                    item.value(&mut |value| {
                        if value.is_empty() {
                            return Err(Error::KeyNotFound.context(format!("empty value for {key}")));
                        }
                        Ok(())
                    })
                    .context("value failed")?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }
}

/// Query parameters of a benchmark trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkParams {
    pub amount: usize,
    pub value_length: usize,
    pub batch_size: usize,
}

impl Default for BenchmarkParams {
    fn default() -> Self {
        Self {
            amount: 1000,
            value_length: 10_000,
            batch_size: 1,
        }
    }
}

impl BenchmarkParams {
    /// Parse `amount`, `valueLength` and `batchSize` from a query string
    /// such as `amount=10&batchSize=5`. Missing, unparsable and
    /// non-positive values fall back to the defaults.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for pair in query.trim_start_matches('?').split('&') {
            let Some((name, raw)) = pair.split_once('=') else {
                continue;
            };
            let Some(value) = raw.trim().parse::<usize>().ok().filter(|v| *v > 0) else {
                continue;
            };
            match name {
                "amount" => params.amount = value,
                "valueLength" => params.value_length = value,
                "batchSize" => params.batch_size = value,
                _ => {}
            }
        }
        params
    }
}

/// Open a database through `provider`, benchmark it under
/// [`BENCHMARK_TIMEOUT`] and close it again.
pub fn run_with_provider<P>(
    provider: &P,
    ctx: &Context,
    params: BenchmarkParams,
) -> Result<BenchmarkResult>
where
    P: Provider + ?Sized,
{
    let ctx = ctx.with_timeout(BENCHMARK_TIMEOUT);
    let db = provider.get(&ctx).context("open db failed")?;
    let result = Benchmark::new(db.clone())
        .run(&ctx, params.amount, params.value_length, params.batch_size)
        .context("benchmark failed");
    if let Err(err) = db.close() {
        debug!(error = %err, "close after benchmark failed");
    }
    let result = result?;

    info!(
        amount = params.amount,
        value_length = params.value_length,
        batch_size = params.batch_size,
        write_total = ?result.write_duration,
        write_avg_us = result.avg_write().as_micros() as u64,
        read_total = ?result.read_duration,
        read_avg_us = result.avg_read().as_micros() as u64,
        "benchmark finished"
    );
    Ok(result)
}

/// `n` random ASCII letters.
pub fn rand_string(n: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

/// Shuffle in place.
pub fn shuffle<T>(items: &mut [T]) {
    items.shuffle(&mut rand::thread_rng());
}

fn generate_keys(amount: usize) -> Vec<String> {
    (0..amount).map(|i| i.to_string()).collect()
}
