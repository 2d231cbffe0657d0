//! Value encoding for typed stores.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Converts stored objects to and from bytes.
pub trait Codec<T> {
    fn encode(&self, value: &T) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// JSON via serde_json. Field order in stored documents is irrelevant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(Error::encoding)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(Error::encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_json_roundtrip() {
        let codec = JsonCodec;
        let bytes = codec.encode(&Point { x: 1, y: -2 }).unwrap();
        assert_eq!(bytes, br#"{"x":1,"y":-2}"#);
        let back: Point = codec.decode(&bytes).unwrap();
        assert_eq!(back, Point { x: 1, y: -2 });
    }

    #[test]
    fn test_field_order_irrelevant() {
        let p: Point = JsonCodec.decode(br#"{"y":4,"x":3}"#).unwrap();
        assert_eq!(p, Point { x: 3, y: 4 });
    }

    #[test]
    fn test_decode_garbage_is_encoding_error() {
        let err = Codec::<Point>::decode(&JsonCodec, b"not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }
}
