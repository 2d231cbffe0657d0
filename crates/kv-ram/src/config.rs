//! Configuration for the RAM engine
//!
//! Two presets cover the common trade-off between commit latency and crash
//! safety; every field stays public for custom setups.

/// What a second concurrent `update` does while one is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteLock {
    /// Wait for the running update to finish.
    #[default]
    Block,
    /// Fail immediately with `kv::Error::TransactionAlreadyOpen`.
    FailFast,
}

/// RAM engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// fsync the WAL on every commit (otherwise only on `sync`/`close`)
    pub sync_on_commit: bool,
    /// Behaviour of concurrent write transactions
    pub write_lock: WriteLock,
    /// WAL file rotation threshold (bytes)
    pub wal_rotation_size_bytes: u64,
    /// Maximum key size in bytes
    pub max_key_size: usize,
    /// Maximum value size in bytes
    pub max_value_size: usize,
}

impl Config {
    /// Every commit reaches persistent storage before `update` returns.
    pub fn durable() -> Self {
        Self {
            sync_on_commit: true,
            write_lock: WriteLock::Block,
            wal_rotation_size_bytes: 100 * 1024 * 1024,
            max_key_size: 1024,
            max_value_size: 32 * 1024 * 1024,
        }
    }

    /// Commits land in the OS page cache; call `Db::sync` to make them
    /// durable in bulk.
    pub fn fast() -> Self {
        Self {
            sync_on_commit: false,
            ..Self::durable()
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.wal_rotation_size_bytes < 1024 * 1024 {
            return Err("wal_rotation_size_bytes must be >= 1MB".into());
        }
        if self.max_key_size == 0 || self.max_key_size > u16::MAX as usize {
            return Err("max_key_size must be in [1, 65535]".into());
        }
        if self.max_value_size == 0 || self.max_value_size > 128 * 1024 * 1024 {
            return Err("max_value_size must be in [1, 128MB]".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self { Self::durable() }
}
