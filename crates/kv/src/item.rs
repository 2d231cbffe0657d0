//! Retrieved entries.

use bytes::Bytes;

use crate::error::Result;

/// A key/value handle returned by `Bucket::get` and `BucketIterator::item`.
///
/// An empty value and an absent value are indistinguishable: both report
/// `exists() == false`.
pub trait Item {
    /// The key this item was looked up or iterated under.
    fn key(&self) -> &[u8];

    /// True iff a value with non-zero length is present.
    fn exists(&self) -> bool;

    /// Call `f` with the raw value bytes and return whatever `f` returns.
    ///
    /// Implementations may pass the same underlying buffer on every call;
    /// callers must not assume they receive a private copy.
    fn value(&self, f: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()>;
}

/// Reference [`Item`] over a shared [`Bytes`] buffer.
///
/// Cloning the item or reading its value never copies the bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteItem {
    key: Bytes,
    value: Option<Bytes>,
}

impl ByteItem {
    pub fn new(key: impl Into<Bytes>, value: Option<Bytes>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// An item for a key with no stored value.
    pub fn missing(key: impl Into<Bytes>) -> Self {
        Self::new(key, None)
    }

    /// The shared value buffer, if any.
    pub fn value_bytes(&self) -> Option<&Bytes> {
        self.value.as_ref()
    }
}

impl Item for ByteItem {
    fn key(&self) -> &[u8] {
        &self.key
    }

    fn exists(&self) -> bool {
        self.value.as_ref().map_or(false, |v| !v.is_empty())
    }

    fn value(&self, f: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
        match &self.value {
            Some(v) => f(v),
            None => f(&[]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_exists() {
        assert!(ByteItem::new("key", Some(Bytes::from_static(b"value"))).exists());
        assert!(!ByteItem::new("key", Some(Bytes::new())).exists());
        assert!(!ByteItem::missing("key").exists());
    }

    #[test]
    fn test_key() {
        assert_eq!(ByteItem::missing("test-key").key(), b"test-key");
        assert_eq!(ByteItem::missing("").key(), b"");
    }

    #[test]
    fn test_value_passes_bytes() {
        let item = ByteItem::new("key", Some(Bytes::from_static(b"test-value")));
        let mut received = Vec::new();
        item.value(&mut |v| {
            received = v.to_vec();
            Ok(())
        })
        .unwrap();
        assert_eq!(received, b"test-value");
    }

    #[test]
    fn test_missing_value_is_empty_slice() {
        let item = ByteItem::missing("key");
        let mut len = usize::MAX;
        item.value(&mut |v| {
            len = v.len();
            Ok(())
        })
        .unwrap();
        assert_eq!(len, 0);
    }

    #[test]
    fn test_value_propagates_callback_error() {
        let item = ByteItem::new("key", Some(Bytes::from_static(b"value")));
        let err = item.value(&mut |_| Err(Error::KeyNotFound)).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound));
    }

    #[test]
    fn test_value_aliases_one_buffer() {
        let shared = Bytes::from(b"test-value".to_vec());
        let item = ByteItem::new("key", Some(shared.clone()));

        let mut first = std::ptr::null();
        let mut second = std::ptr::null();
        item.value(&mut |v| {
            first = v.as_ptr();
            Ok(())
        })
        .unwrap();
        item.clone()
            .value(&mut |v| {
                second = v.as_ptr();
                Ok(())
            })
            .unwrap();

        assert_eq!(first, shared.as_ptr());
        assert_eq!(first, second);
    }
}
