//! Error types for the RAM engine
//!
//! Engine failures are represented by the RamError enum, which carries
//! enough context (paths, offsets, sizes) to diagnose WAL problems. At the
//! `kv` boundary they become `kv::Error::Upstream`, so callers can still
//! downcast to `RamError` through the source chain.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// RAM engine error types with detailed context
#[derive(Debug, Clone)]
pub enum RamError {
    /// I/O operation failed
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// WAL record is structurally invalid
    WalCorrupted {
        /// Path to the WAL file
        path: PathBuf,
        /// Byte offset where corruption was detected
        offset: u64,
        /// Description of the corruption
        reason: String,
    },

    /// Checksum verification failed
    ChecksumMismatch {
        /// File where checksum failed
        path: PathBuf,
        /// Expected checksum value
        expected: u32,
        /// Actual checksum computed
        actual: u32,
        /// Byte offset of the corrupted data
        offset: u64,
    },

    /// Record cut short at end of file
    TornWrite {
        /// File with torn write
        path: PathBuf,
        /// Expected record size
        expected_size: u32,
        /// Actual bytes available
        available_bytes: u64,
        /// Offset where torn write begins
        offset: u64,
    },

    /// Magic bytes not found at expected location
    NoMagicFound {
        /// File being read
        path: PathBuf,
        /// Offset where magic was expected
        offset: u64,
        /// Bytes actually found
        found_bytes: [u8; 4],
    },

    /// Key, value or bucket name exceeds its limit
    OversizedEntry {
        /// Size of the oversized component
        entry_size: u64,
        /// Maximum allowed size
        max_size: u64,
        /// Which component is oversized
        component: String,
    },

    /// Config::validate rejected the configuration
    InvalidConfig(String),

    /// An earlier append failed; the WAL takes no more commits until reopen
    WalPoisoned {
        /// WAL file that failed
        path: PathBuf,
        /// The original failure
        reason: String,
    },

    /// `remove` was called on a database that is still open
    StillOpen {
        /// Directory that would have been removed
        path: PathBuf,
    },
}

impl RamError {
    /// Attach a path and a description to an I/O error.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error, what: &str) -> Self {
        RamError::Io {
            path: Some(path.into()),
            kind: err.kind(),
            message: format!("{}: {}", what, err),
        }
    }

    /// Same error with `path` replacing the placeholder path of a buffer
    /// decode error.
    pub fn at(self, file: &std::path::Path, base_offset: u64) -> Self {
        match self {
            RamError::WalCorrupted { offset, reason, .. } => RamError::WalCorrupted {
                path: file.to_path_buf(),
                offset: base_offset + offset,
                reason,
            },
            RamError::ChecksumMismatch { expected, actual, offset, .. } => {
                RamError::ChecksumMismatch {
                    path: file.to_path_buf(),
                    expected,
                    actual,
                    offset: base_offset + offset,
                }
            }
            RamError::TornWrite { expected_size, available_bytes, offset, .. } => {
                RamError::TornWrite {
                    path: file.to_path_buf(),
                    expected_size,
                    available_bytes,
                    offset: base_offset + offset,
                }
            }
            RamError::NoMagicFound { offset, found_bytes, .. } => RamError::NoMagicFound {
                path: file.to_path_buf(),
                offset: base_offset + offset,
                found_bytes,
            },
            other => other,
        }
    }
}

impl fmt::Display for RamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RamError::Io { path, kind, message } => {
                if let Some(path) = path {
                    write!(f, "I/O error in {}: {} ({})", path.display(), message, kind)
                } else {
                    write!(f, "I/O error: {} ({})", message, kind)
                }
            }

            RamError::WalCorrupted { path, offset, reason } => {
                write!(f, "WAL corrupted in {} at offset {}: {}", path.display(), offset, reason)
            }

            RamError::ChecksumMismatch { path, expected, actual, offset } => {
                write!(f, "Checksum mismatch in {} at offset {}: expected 0x{:08x}, got 0x{:08x}",
                       path.display(), offset, expected, actual)
            }

            RamError::TornWrite { path, expected_size, available_bytes, offset } => {
                write!(f, "Torn write in {} at offset {}: expected {} bytes, only {} available",
                       path.display(), offset, expected_size, available_bytes)
            }

            RamError::NoMagicFound { path, offset, found_bytes } => {
                write!(f, "Magic bytes not found in {} at offset {}: found {:02x}{:02x}{:02x}{:02x}",
                       path.display(), offset, found_bytes[0], found_bytes[1], found_bytes[2], found_bytes[3])
            }

            RamError::OversizedEntry { entry_size, max_size, component } => {
                write!(f, "Entry {} too large: {} bytes exceeds limit of {} bytes",
                       component, entry_size, max_size)
            }

            RamError::InvalidConfig(reason) => write!(f, "Invalid config: {}", reason),

            RamError::WalPoisoned { path, reason } => {
                write!(f, "WAL {} refuses writes after failed append: {}", path.display(), reason)
            }

            RamError::StillOpen { path } => {
                write!(f, "Database at {} is still open, close it before removing", path.display())
            }
        }
    }
}

impl Error for RamError {}

/// Convert std::io::Error to RamError::Io
impl From<std::io::Error> for RamError {
    fn from(err: std::io::Error) -> Self {
        RamError::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<RamError> for kv::Error {
    fn from(err: RamError) -> Self {
        kv::Error::upstream(err)
    }
}

/// Result type alias for RAM engine operations
pub type RamResult<T> = Result<T, RamError>;
