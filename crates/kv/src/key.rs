//! Entry keys and the conversions a typed store needs from its key type.

use std::fmt;

use bytes::Bytes;

use crate::bucket_name::BucketName;
use crate::error::{Error, Result};

/// Opaque entry key. No normalization is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<u8>);

impl Key {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self(key.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&[u8]> for Key {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<Vec<u8>> for Key {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

/// Key types usable by `Store`/`StoreTx`.
///
/// Keys travel to the engine as bytes and come back from iteration as bytes,
/// so a key type needs both directions. String keys fail to decode on
/// non-UTF-8 bytes.
pub trait StoreKey: Sized {
    /// The bytes stored in the bucket.
    fn key_bytes(&self) -> &[u8];

    /// Rebuild a key read back from the bucket.
    fn from_key_bytes(bytes: &[u8]) -> Result<Self>;
}

impl StoreKey for Vec<u8> {
    fn key_bytes(&self) -> &[u8] {
        self
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bytes.to_vec())
    }
}

impl StoreKey for String {
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self> {
        String::from_utf8(bytes.to_vec()).map_err(Error::encoding)
    }
}

impl StoreKey for Bytes {
    fn key_bytes(&self) -> &[u8] {
        self
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Bytes::copy_from_slice(bytes))
    }
}

impl StoreKey for Key {
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Key::from(bytes))
    }
}

impl StoreKey for BucketName {
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(BucketName::from(bytes))
    }
}
