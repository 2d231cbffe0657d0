//! Binary format of kv-ram WAL records
//!
//! Every committed transaction becomes one record:
//! ChunkHeader (32 bytes) + op_count(u32) + op*
//!
//! and every op is encoded as:
//! tag(u8) + padding(u8) + bucket_len(u16) + key_len(u32) + value_len(u32) + bucket + key + value
//!
//! The CRC32C in the header covers the whole payload, so a batch is either
//! replayed completely or not at all.

use std::path::PathBuf;

use bytes::Bytes;

use crate::error::{RamError, RamResult};

/// Magic bytes identifying a commit record: "KVRM" in ASCII
pub const MAGIC_ARRAY: [u8; 4] = [0x4B, 0x56, 0x52, 0x4D];

/// Header size in bytes
pub const HEADER_SIZE: usize = 32;

/// Fixed prefix of one encoded op, before its variable-length bytes
const OP_PREFIX_SIZE: usize = 1 + 1 + 2 + 4 + 4;

/// Record type of a commit batch. The only type written today.
pub const RECORD_COMMIT: u8 = 1;

/// One mutation inside a commit batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateBucket { bucket: Vec<u8> },
    DeleteBucket { bucket: Vec<u8> },
    Put { bucket: Vec<u8>, key: Vec<u8>, value: Bytes },
    Delete { bucket: Vec<u8>, key: Vec<u8> },
}

impl Operation {
    fn tag(&self) -> u8 {
        match self {
            Operation::CreateBucket { .. } => 1,
            Operation::DeleteBucket { .. } => 2,
            Operation::Put { .. } => 3,
            Operation::Delete { .. } => 4,
        }
    }

    fn parts(&self) -> (&[u8], &[u8], &[u8]) {
        const EMPTY: &[u8] = &[];
        match self {
            Operation::CreateBucket { bucket } | Operation::DeleteBucket { bucket } => {
                (bucket.as_slice(), EMPTY, EMPTY)
            }
            Operation::Put { bucket, key, value } => {
                (bucket.as_slice(), key.as_slice(), value.as_ref())
            }
            Operation::Delete { bucket, key } => (bucket.as_slice(), key.as_slice(), EMPTY),
        }
    }

    /// Bucket the op applies to.
    pub fn bucket(&self) -> &[u8] {
        self.parts().0
    }

    /// Encoded size of this op inside a payload.
    pub fn encoded_len(&self) -> usize {
        let (bucket, key, value) = self.parts();
        OP_PREFIX_SIZE + bucket.len() + key.len() + value.len()
    }
}

/// Fixed-size header in front of every record
/// Size: 32 bytes
///
/// Layout:
///   [0..4]   magic:       [u8;4] - "KVRM"
///   [4..8]   length:      u32    - payload length in bytes
///   [8..12]  checksum:    u32    - CRC32C of payload bytes
///   [12]     record_type: u8     - RECORD_COMMIT
///   [13..16] reserved:    [u8;3]
///   [16..24] sequence:    u64    - commit sequence number
///   [24..32] padding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub magic: [u8; 4],
    pub length: u32,
    pub checksum: u32,
    pub record_type: u8,
    pub sequence: u64,
}

impl ChunkHeader {
    pub fn new(length: u32, checksum: u32, sequence: u64) -> Self {
        Self {
            magic: MAGIC_ARRAY,
            length,
            checksum,
            record_type: RECORD_COMMIT,
            sequence,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        buf[12] = self.record_type;
        buf[16..24].copy_from_slice(&self.sequence.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        let mut sequence = [0u8; 8];
        sequence.copy_from_slice(&bytes[16..24]);

        Self {
            magic,
            length: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            checksum: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            record_type: bytes[12],
            sequence: u64::from_le_bytes(sequence),
        }
    }
}

/// A decoded commit record.
#[derive(Debug, Clone)]
pub struct CommitBatch {
    pub sequence: u64,
    pub ops: Vec<Operation>,
}

fn buffer_path() -> PathBuf {
    PathBuf::from("<buffer>")
}

fn oversized(component: &str, size: usize, max: usize) -> RamError {
    RamError::OversizedEntry {
        entry_size: size as u64,
        max_size: max as u64,
        component: component.to_string(),
    }
}

/// Serialize a batch of ops into one framed record.
pub fn serialize_batch(sequence: u64, ops: &[Operation]) -> RamResult<Vec<u8>> {
    let mut payload_size = 4usize;
    for op in ops {
        let (bucket, key, value) = op.parts();
        if bucket.len() > u16::MAX as usize {
            return Err(oversized("bucket name", bucket.len(), u16::MAX as usize));
        }
        if key.len() > u32::MAX as usize {
            return Err(oversized("key", key.len(), u32::MAX as usize));
        }
        if value.len() > u32::MAX as usize {
            return Err(oversized("value", value.len(), u32::MAX as usize));
        }
        payload_size += op.encoded_len();
    }
    if payload_size > u32::MAX as usize {
        return Err(oversized("batch", payload_size, u32::MAX as usize));
    }
    let op_count = u32::try_from(ops.len())
        .map_err(|_| oversized("batch op count", ops.len(), u32::MAX as usize))?;

    let mut buffer = Vec::with_capacity(HEADER_SIZE + payload_size);
    buffer.resize(HEADER_SIZE, 0);
    buffer.extend_from_slice(&op_count.to_le_bytes());
    for op in ops {
        let (bucket, key, value) = op.parts();
        buffer.push(op.tag());
        buffer.push(0);
        buffer.extend_from_slice(&(bucket.len() as u16).to_le_bytes());
        buffer.extend_from_slice(&(key.len() as u32).to_le_bytes());
        buffer.extend_from_slice(&(value.len() as u32).to_le_bytes());
        buffer.extend_from_slice(bucket);
        buffer.extend_from_slice(key);
        buffer.extend_from_slice(value);
    }

    let payload = &buffer[HEADER_SIZE..];
    let header = ChunkHeader::new(payload.len() as u32, crc32c::crc32c(payload), sequence);
    buffer[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    Ok(buffer)
}

/// Deserialize one record from the start of `data`.
///
/// Returns the batch and the number of bytes it occupied.
pub fn deserialize_batch(data: &[u8]) -> RamResult<(CommitBatch, usize)> {
    let Some(header_bytes) = data.get(..HEADER_SIZE) else {
        return Err(RamError::TornWrite {
            path: buffer_path(),
            expected_size: HEADER_SIZE as u32,
            available_bytes: data.len() as u64,
            offset: 0,
        });
    };
    let mut raw = [0u8; HEADER_SIZE];
    raw.copy_from_slice(header_bytes);
    let header = ChunkHeader::from_bytes(&raw);

    if header.magic != MAGIC_ARRAY {
        return Err(RamError::NoMagicFound {
            path: buffer_path(),
            offset: 0,
            found_bytes: header.magic,
        });
    }

    let payload_end = HEADER_SIZE + header.length as usize;
    let Some(payload) = data.get(HEADER_SIZE..payload_end) else {
        return Err(RamError::TornWrite {
            path: buffer_path(),
            expected_size: header.length,
            available_bytes: (data.len() - HEADER_SIZE) as u64,
            offset: HEADER_SIZE as u64,
        });
    };

    let computed = crc32c::crc32c(payload);
    if computed != header.checksum {
        return Err(RamError::ChecksumMismatch {
            path: buffer_path(),
            expected: header.checksum,
            actual: computed,
            offset: HEADER_SIZE as u64,
        });
    }

    if header.record_type != RECORD_COMMIT {
        return Err(corrupted(12, format!("unknown record type: {}", header.record_type)));
    }

    let ops = decode_ops(payload)?;
    Ok((
        CommitBatch {
            sequence: header.sequence,
            ops,
        },
        payload_end,
    ))
}

fn corrupted(offset: usize, reason: String) -> RamError {
    RamError::WalCorrupted {
        path: buffer_path(),
        offset: offset as u64,
        reason,
    }
}

fn decode_ops(payload: &[u8]) -> RamResult<Vec<Operation>> {
    let base = HEADER_SIZE;
    let count_bytes = payload
        .get(0..4)
        .ok_or_else(|| corrupted(base, "payload too short for op count".into()))?;
    let count = u32::from_le_bytes([count_bytes[0], count_bytes[1], count_bytes[2], count_bytes[3]]);

    let mut ops = Vec::with_capacity((count as usize).min(payload.len() / OP_PREFIX_SIZE));
    let mut pos = 4usize;
    for _ in 0..count {
        let prefix = payload
            .get(pos..pos + OP_PREFIX_SIZE)
            .ok_or_else(|| corrupted(base + pos, "payload too short for op header".into()))?;
        let tag = prefix[0];
        let bucket_len = u16::from_le_bytes([prefix[2], prefix[3]]) as usize;
        let key_len = u32::from_le_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]) as usize;
        let value_len =
            u32::from_le_bytes([prefix[8], prefix[9], prefix[10], prefix[11]]) as usize;

        let start = pos + OP_PREFIX_SIZE;
        let key_start = start + bucket_len;
        let value_start = key_start + key_len;
        let end = value_start + value_len;
        if end > payload.len() {
            return Err(corrupted(
                base + pos,
                format!(
                    "op needs {} bytes for bucket({}) + key({}) + value({})",
                    end - start,
                    bucket_len,
                    key_len,
                    value_len
                ),
            ));
        }

        let bucket = payload[start..key_start].to_vec();
        let key = payload[key_start..value_start].to_vec();
        let op = match tag {
            1 => Operation::CreateBucket { bucket },
            2 => Operation::DeleteBucket { bucket },
            3 => Operation::Put {
                bucket,
                key,
                value: Bytes::copy_from_slice(&payload[value_start..end]),
            },
            4 => Operation::Delete { bucket, key },
            other => return Err(corrupted(base + pos, format!("invalid op tag: {}", other))),
        };
        ops.push(op);
        pos = end;
    }

    if pos != payload.len() {
        return Err(corrupted(
            base + pos,
            format!("{} trailing bytes after last op", payload.len() - pos),
        ));
    }
    Ok(ops)
}
