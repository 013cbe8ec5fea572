//! Wire framing of the data and statistics components.
//!
//! The data component is a sequence of partition blocks. Each block is a
//! partition header (key length, key bytes, row-level deletion info)
//! followed by column records in comparator order, terminated by a
//! zero-length name sentinel. All integers are big-endian.
//!
//! Decoding never interprets key or value content; truncation and malformed
//! framing surface as [`ScanError::Decode`].

use std::{cmp::Ordering, io::Read};

use crate::{error::ScanError, schema::Token};

/// Column flag byte: ordinary live column.
pub(crate) const FLAG_LIVE: u8 = 0x00;
/// Column flag byte: deletion marker.
pub(crate) const FLAG_TOMBSTONE: u8 = 0x01;
/// Column flag byte: live column with a time-to-live.
pub(crate) const FLAG_EXPIRING: u8 = 0x02;
/// Column flag byte: counter cell.
pub(crate) const FLAG_COUNTER: u8 = 0x04;

/// Magic prefix of the statistics component.
pub(crate) const STATS_MAGIC: u32 = 0x5353_5453;
/// Current statistics format version.
pub(crate) const STATS_VERSION: u16 = 1;

/// A partition key together with its partitioner-derived ordering token.
///
/// Equality and ordering are token-first then raw bytes; the content is
/// never interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionKey {
    key: Vec<u8>,
    token: Token,
}

impl PartitionKey {
    /// Pair raw key bytes with their token.
    pub fn new(key: Vec<u8>, token: Token) -> Self {
        Self { key, token }
    }

    /// Raw key bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.key
    }

    /// Partitioner-derived ordering token.
    pub fn token(&self) -> &Token {
        &self.token
    }
}

impl Ord for PartitionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.token
            .cmp(&other.token)
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for PartitionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Row-level deletion info carried by every partition header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionDeletion {
    /// Timestamp at or below which the whole partition is deleted.
    pub marked_for_delete_at: i64,
    /// Server-local deletion time, seconds.
    pub local_deletion_time: i32,
}

impl PartitionDeletion {
    /// Deletion info of a partition that has not been deleted.
    pub const LIVE: PartitionDeletion = PartitionDeletion {
        marked_for_delete_at: i64::MIN,
        local_deletion_time: i32::MAX,
    };

    /// Whether the partition carries no row-level tombstone.
    pub fn is_live(&self) -> bool {
        self.marked_for_delete_at == i64::MIN
    }
}

/// Liveness classification of a column record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Ordinary live column.
    Live,
    /// Deletion marker for a single column.
    Tombstone {
        /// Server-local deletion time, seconds.
        local_deletion_time: i32,
    },
    /// Live column that expires after a time-to-live.
    Expiring {
        /// Time-to-live, seconds.
        ttl: i32,
        /// Server-local time at which the column expires, seconds.
        local_deletion_time: i32,
    },
    /// Counter cell with its counter-specific payload.
    Counter {
        /// Timestamp of the last delete applied to the counter.
        timestamp_of_last_delete: i64,
    },
}

/// The smallest stored unit within a partition: a named, timestamped value.
///
/// The scanning engine copies these through without interpreting name or
/// value bytes; type-aware decoding is the consumer's concern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRecord {
    /// Column name bytes, ordered by the table's comparator.
    pub name: Vec<u8>,
    /// Value bytes.
    pub value: Vec<u8>,
    /// Write timestamp.
    pub timestamp: i64,
    /// Liveness classification and kind-specific payload.
    pub kind: ColumnKind,
}

/// Contents of the statistics component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Statistics {
    /// Estimated partition count, a cardinality estimate rather than an
    /// exact total.
    pub(crate) partition_count_estimate: u64,
    /// CRC32 of the data component.
    pub(crate) data_crc: u32,
}

impl Statistics {
    pub(crate) fn decode<R: Read>(reader: &mut R) -> Result<Self, ScanError> {
        let magic = read_u32(reader)?;
        if magic != STATS_MAGIC {
            return Err(ScanError::Decode(format!(
                "bad statistics magic {magic:#010x}"
            )));
        }
        let version = read_u16(reader)?;
        if version != STATS_VERSION {
            return Err(ScanError::Decode(format!(
                "unknown statistics version {version}"
            )));
        }
        Ok(Self {
            partition_count_estimate: read_u64(reader)?,
            data_crc: read_u32(reader)?,
        })
    }
}

/// Partition header as stored: raw key bytes plus deletion info. The token
/// is derived afterwards by the bound partitioner.
pub(crate) struct PartitionHeader {
    pub(crate) key: Vec<u8>,
    pub(crate) deletion: PartitionDeletion,
}

pub(crate) fn decode_partition_header<R: Read>(
    reader: &mut R,
    remaining: u64,
) -> Result<PartitionHeader, ScanError> {
    let key_len = read_u16(reader)?;
    if key_len == 0 {
        return Err(ScanError::Decode("zero-length partition key".to_string()));
    }
    let key = read_bytes(reader, u64::from(key_len), remaining)?;
    let local_deletion_time = read_i32(reader)?;
    let marked_for_delete_at = read_i64(reader)?;
    Ok(PartitionHeader {
        key,
        deletion: PartitionDeletion {
            marked_for_delete_at,
            local_deletion_time,
        },
    })
}

/// Decode one column record, or `None` at the end-of-partition sentinel.
pub(crate) fn decode_column<R: Read>(
    reader: &mut R,
    remaining: u64,
) -> Result<Option<ColumnRecord>, ScanError> {
    let name_len = read_u16(reader)?;
    if name_len == 0 {
        return Ok(None);
    }
    let name = read_bytes(reader, u64::from(name_len), remaining)?;
    let flags = read_u8(reader)?;
    let kind = match flags {
        FLAG_LIVE => ColumnKind::Live,
        FLAG_TOMBSTONE => ColumnKind::Tombstone {
            local_deletion_time: read_i32(reader)?,
        },
        FLAG_EXPIRING => ColumnKind::Expiring {
            ttl: read_i32(reader)?,
            local_deletion_time: read_i32(reader)?,
        },
        FLAG_COUNTER => ColumnKind::Counter {
            timestamp_of_last_delete: read_i64(reader)?,
        },
        other => {
            return Err(ScanError::Decode(format!(
                "unknown column flags {other:#04x}"
            )))
        }
    };
    let timestamp = read_i64(reader)?;
    let value_len = read_u32(reader)?;
    let value = read_bytes(reader, u64::from(value_len), remaining)?;
    Ok(Some(ColumnRecord {
        name,
        value,
        timestamp,
        kind,
    }))
}

fn read_bytes<R: Read>(reader: &mut R, len: u64, remaining: u64) -> Result<Vec<u8>, ScanError> {
    // A declared length beyond the file tail means the frame is garbage;
    // refuse before allocating.
    if len > remaining {
        return Err(ScanError::Decode(format!(
            "length {len} exceeds {remaining} remaining bytes"
        )));
    }
    let mut buf = vec![0u8; len as usize];
    read_exact(reader, &mut buf)?;
    Ok(buf)
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), ScanError> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ScanError::Decode("truncated sstable data".to_string())
        } else {
            ScanError::Io(err)
        }
    })
}

macro_rules! read_int {
    ($name:ident, $ty:ty) => {
        pub(crate) fn $name<R: Read>(reader: &mut R) -> Result<$ty, ScanError> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            read_exact(reader, &mut buf)?;
            Ok(<$ty>::from_be_bytes(buf))
        }
    };
}

read_int!(read_u8, u8);
read_int!(read_u16, u16);
read_int!(read_u32, u32);
read_int!(read_u64, u64);
read_int!(read_i32, i32);
read_int!(read_i64, i64);

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::schema::PartitionerKind;

    #[test]
    fn partition_keys_order_by_token_first() {
        let low = PartitionKey::new(b"zzz".to_vec(), Token::Murmur3(-10));
        let high = PartitionKey::new(b"aaa".to_vec(), Token::Murmur3(5));
        assert!(low < high);
    }

    #[test]
    fn colliding_tokens_break_ties_on_key_bytes() {
        // Distinct keys can hash to the same token; they are still distinct,
        // strictly ordered partitions.
        let a = PartitionKey::new(b"aaa".to_vec(), Token::Murmur3(42));
        let b = PartitionKey::new(b"bbb".to_vec(), Token::Murmur3(42));
        assert!(a < b);
        assert_ne!(a, b);
    }

    #[test]
    fn byte_ordered_keys_order_by_bytes() {
        let partitioner = PartitionerKind::ByteOrdered;
        let a = PartitionKey::new(b"a".to_vec(), partitioner.token(b"a"));
        let b = PartitionKey::new(b"b".to_vec(), partitioner.token(b"b"));
        assert!(a < b);
    }

    #[test]
    fn statistics_reject_bad_magic() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0xdead_beefu32.to_be_bytes());
        bytes.extend_from_slice(&STATS_VERSION.to_be_bytes());
        bytes.extend_from_slice(&7u64.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        let result = Statistics::decode(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(ScanError::Decode(_))));
    }

    #[test]
    fn truncated_column_is_a_decode_error() {
        // name_len says 4 but only 2 bytes follow.
        let bytes = [0u8, 4, b'a', b'b'];
        let result = decode_column(&mut Cursor::new(&bytes[..]), 16);
        assert!(matches!(result, Err(ScanError::Decode(_))));
    }

    #[test]
    fn oversized_length_is_rejected_before_allocation() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&u16::MAX.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        let result = decode_column(&mut Cursor::new(bytes), 8);
        assert!(matches!(result, Err(ScanError::Decode(_))));
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.push(b'n');
        bytes.push(0x40);
        let result = decode_column(&mut Cursor::new(bytes), 64);
        assert!(matches!(result, Err(ScanError::Decode(_))));
    }

    #[test]
    fn decodes_expiring_columns() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(b"ttl");
        bytes.push(FLAG_EXPIRING);
        bytes.extend_from_slice(&60i32.to_be_bytes());
        bytes.extend_from_slice(&1234i32.to_be_bytes());
        bytes.extend_from_slice(&99i64.to_be_bytes());
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(b"ok");

        let remaining = bytes.len() as u64;
        let record = decode_column(&mut Cursor::new(bytes), remaining)
            .unwrap()
            .unwrap();
        assert_eq!(record.name, b"ttl");
        assert_eq!(record.value, b"ok");
        assert_eq!(record.timestamp, 99);
        assert_eq!(
            record.kind,
            ColumnKind::Expiring {
                ttl: 60,
                local_deletion_time: 1234
            }
        );
    }

    #[test]
    fn sentinel_ends_a_partition() {
        let bytes = 0u16.to_be_bytes();
        let record = decode_column(&mut Cursor::new(&bytes[..]), 2).unwrap();
        assert!(record.is_none());
    }
}
