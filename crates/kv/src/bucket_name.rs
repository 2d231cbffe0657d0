//! Bucket names: opaque byte strings identifying a key space.

use std::fmt;

/// Separator used by [`BucketName::from_strings`].
pub const BUCKET_NAME_SEPARATOR: &str = "_";

/// Name of a bucket. Equality is byte-exact.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketName(Vec<u8>);

impl BucketName {
    /// Create a bucket name from anything byte-like.
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        Self(name.into())
    }

    /// Join `parts` with `_`.
    ///
    /// Parts are not escaped: `["a_b", "c"]` and `["a", "b_c"]` produce the
    /// same name.
    pub fn from_strings<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = parts
            .into_iter()
            .map(|p| p.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join(BUCKET_NAME_SEPARATOR);
        Self(joined.into_bytes())
    }

    /// Raw bytes of the name.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl AsRef<[u8]> for BucketName {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for BucketName {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for BucketName {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&[u8]> for BucketName {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<Vec<u8>> for BucketName {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

/// Snapshot of bucket names returned by `Tx::list_bucket_names`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketNames(Vec<BucketName>);

impl BucketNames {
    pub fn new(names: Vec<BucketName>) -> Self {
        Self(names)
    }

    /// True if any name is byte-equal to `name`.
    pub fn contains(&self, name: &BucketName) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BucketName> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<BucketName> {
        self.0
    }
}

impl From<Vec<BucketName>> for BucketNames {
    fn from(value: Vec<BucketName>) -> Self {
        Self(value)
    }
}

impl FromIterator<BucketName> for BucketNames {
    fn from_iter<T: IntoIterator<Item = BucketName>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for BucketNames {
    type Item = BucketName;
    type IntoIter = std::vec::IntoIter<BucketName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a BucketNames {
    type Item = &'a BucketName;
    type IntoIter = std::slice::Iter<'a, BucketName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
