//! Error types for key-value operations
//!
//! Leaf operations return sentinel variants (`BucketNotFound`, `KeyNotFound`,
//! `BucketAlreadyExists`, ...). Every layer above adds context through
//! [`ResultExt::context`], which nests the original error instead of
//! replacing it, so `err.kind()` and `err.root()` still answer
//! "is this NotFound" no matter how many layers wrapped it.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed error used for codec and engine failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Key-value error with sentinel variants and context wrapping.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested bucket does not exist.
    #[error("bucket not found")]
    BucketNotFound,

    /// `create_bucket` found an existing bucket with the same name.
    #[error("bucket already exists")]
    BucketAlreadyExists,

    /// The key is absent, or present with an empty value.
    #[error("key not found")]
    KeyNotFound,

    /// The engine refused a second concurrent write transaction.
    #[error("transaction already open")]
    TransactionAlreadyOpen,

    /// A mutation was attempted inside a read-only transaction.
    #[error("transaction is read-only")]
    ReadOnlyTransaction,

    /// The database handle was closed.
    #[error("database closed")]
    DatabaseClosed,

    /// The context was cancelled.
    #[error("context canceled")]
    Cancelled,

    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Encoding or decoding a value failed.
    #[error("encoding failed: {0}")]
    Encoding(#[source] BoxError),

    /// The receiving side of a stream went away.
    #[error("stream receiver disconnected")]
    StreamClosed,

    /// A single-flight operation is already running.
    #[error("{0} already running")]
    Busy(String),

    /// Caller supplied an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The storage engine failed.
    #[error("storage error: {0}")]
    Upstream(#[source] BoxError),

    /// Context added by a wrapping layer.
    #[error("{context}: {source}")]
    Context {
        /// What the wrapping layer was doing
        context: String,
        /// The wrapped error
        #[source]
        source: Box<Error>,
    },
}

/// Coarse classification of an [`Error`], stable across wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bucket or key absent
    NotFound,
    /// Bucket creation conflict
    AlreadyExists,
    /// Cancellation or deadline
    Cancelled,
    /// Codec failure
    Encoding,
    /// Engine I/O failure
    Upstream,
    /// Concurrent operation refused (write lock, single-flight)
    Conflict,
    /// Operation not allowed in the current state (read-only tx, closed db, dropped receiver)
    InvalidState,
    /// Bad caller input
    InvalidArgument,
}

impl Error {
    /// Wrap a codec failure.
    pub fn encoding<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Encoding(err.into())
    }

    /// Wrap an engine failure.
    pub fn upstream<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Upstream(err.into())
    }

    /// Add context while keeping this error as the source.
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with every context layer stripped.
    pub fn root(&self) -> &Error {
        let mut current = self;
        while let Error::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Error::BucketNotFound | Error::KeyNotFound => ErrorKind::NotFound,
            Error::BucketAlreadyExists => ErrorKind::AlreadyExists,
            Error::Cancelled | Error::DeadlineExceeded => ErrorKind::Cancelled,
            Error::Encoding(_) => ErrorKind::Encoding,
            Error::Upstream(_) => ErrorKind::Upstream,
            Error::TransactionAlreadyOpen | Error::Busy(_) => ErrorKind::Conflict,
            Error::ReadOnlyTransaction | Error::DatabaseClosed | Error::StreamClosed => {
                ErrorKind::InvalidState
            }
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Context { .. } => unreachable!("root() strips context layers"),
        }
    }

    /// True for a missing bucket or key at any wrapping depth.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// True only for a missing bucket.
    pub fn is_bucket_not_found(&self) -> bool {
        matches!(self.root(), Error::BucketNotFound)
    }

    /// True for cancellation or an expired deadline.
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

/// Context wrapping for `Result<T, Error>`.
pub trait ResultExt<T> {
    /// Wrap the error with a fixed message.
    fn context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Wrap the error with a lazily built message.
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.context(f()))
    }
}

/// Result type alias for key-value operations
pub type Result<T> = std::result::Result<T, Error>;
