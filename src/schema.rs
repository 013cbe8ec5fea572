//! Partitioner and comparator binding.
//!
//! Tables declare which partitioner ordered their partitions and which
//! comparator ordered the columns inside each partition. Both arrive as
//! names in the execution context and are bound here to concrete token
//! derivation and ordering functions before any file is opened. Unknown
//! names are a fatal configuration error, not something the decoder can
//! guess its way around.

use std::cmp::Ordering;

use crate::{
    context::{ExecutionContext, COMPARATOR_KEY, PARTITIONER_KEY},
    error::ScanError,
};

/// Partitioner strategies a table may have been written with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionerKind {
    /// 64-bit Murmur3 hash of the key defines partition order.
    Murmur3,
    /// The raw key bytes define partition order.
    ByteOrdered,
}

impl PartitionerKind {
    /// Derive the ordering token for a partition key.
    pub fn token(&self, key: &[u8]) -> Token {
        match self {
            PartitionerKind::Murmur3 => {
                let (h1, _) = murmur3_x64_128(key, 0);
                let token = h1 as i64;
                // The writer reserves i64::MIN; collapse it onto MAX.
                Token::Murmur3(if token == i64::MIN { i64::MAX } else { token })
            }
            PartitionerKind::ByteOrdered => Token::Bytes(key.to_vec()),
        }
    }

    fn resolve(name: &str) -> Result<Self, ScanError> {
        match short_name(name) {
            "Murmur3Partitioner" => Ok(PartitionerKind::Murmur3),
            "ByteOrderedPartitioner" => Ok(PartitionerKind::ByteOrdered),
            _ => Err(ScanError::UnsupportedSchema(format!(
                "unknown partitioner: {name}"
            ))),
        }
    }
}

/// Comparator strategies defining column-name order within a partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparatorKind {
    /// Lexicographic byte order.
    Bytes,
    /// Big-endian signed 64-bit integers.
    Long,
    /// UTF-8 strings; byte order over validated UTF-8.
    Utf8,
}

impl ComparatorKind {
    /// Compare two column names under this comparator.
    ///
    /// Fails with [`ScanError::Decode`] when a name cannot be interpreted,
    /// e.g. a `Long` name that is not exactly eight bytes.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering, ScanError> {
        match self {
            ComparatorKind::Bytes => Ok(a.cmp(b)),
            ComparatorKind::Long => Ok(decode_long(a)?.cmp(&decode_long(b)?)),
            ComparatorKind::Utf8 => {
                validate_utf8(a)?;
                validate_utf8(b)?;
                Ok(a.cmp(b))
            }
        }
    }

    fn resolve(name: &str) -> Result<Self, ScanError> {
        match short_name(name) {
            "BytesType" => Ok(ComparatorKind::Bytes),
            "LongType" => Ok(ComparatorKind::Long),
            "UTF8Type" => Ok(ComparatorKind::Utf8),
            _ => Err(ScanError::UnsupportedSchema(format!(
                "unknown comparator: {name}"
            ))),
        }
    }
}

/// Configuration values may carry fully qualified class-style names; only
/// the final segment identifies the kind.
fn short_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn decode_long(name: &[u8]) -> Result<i64, ScanError> {
    let bytes: [u8; 8] = name
        .try_into()
        .map_err(|_| ScanError::Decode(format!("long column name of {} bytes", name.len())))?;
    Ok(i64::from_be_bytes(bytes))
}

fn validate_utf8(name: &[u8]) -> Result<(), ScanError> {
    std::str::from_utf8(name)
        .map(|_| ())
        .map_err(|err| ScanError::Decode(format!("column name is not utf-8: {err}")))
}

/// Schema metadata bound for the lifetime of one scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchemaMeta {
    partitioner: PartitionerKind,
    comparator: ComparatorKind,
}

impl SchemaMeta {
    /// Bind a partitioner and comparator directly.
    pub fn new(partitioner: PartitionerKind, comparator: ComparatorKind) -> Self {
        Self {
            partitioner,
            comparator,
        }
    }

    /// Resolve both kinds from the named execution-context keys.
    ///
    /// A missing or unrecognized value fails with
    /// [`ScanError::UnsupportedSchema`] before any table file is touched.
    pub fn from_context(ctx: &ExecutionContext) -> Result<Self, ScanError> {
        let partitioner = ctx.get(PARTITIONER_KEY).ok_or_else(|| {
            ScanError::UnsupportedSchema(format!("{PARTITIONER_KEY} is not set"))
        })?;
        let comparator = ctx.get(COMPARATOR_KEY).ok_or_else(|| {
            ScanError::UnsupportedSchema(format!("{COMPARATOR_KEY} is not set"))
        })?;
        Ok(Self {
            partitioner: PartitionerKind::resolve(partitioner)?,
            comparator: ComparatorKind::resolve(comparator)?,
        })
    }

    /// The bound partitioner.
    pub fn partitioner(&self) -> PartitionerKind {
        self.partitioner
    }

    /// The bound comparator.
    pub fn comparator(&self) -> ComparatorKind {
        self.comparator
    }
}

/// Partitioner-derived ordering token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Token produced by [`PartitionerKind::Murmur3`].
    Murmur3(i64),
    /// Token produced by [`PartitionerKind::ByteOrdered`].
    Bytes(Vec<u8>),
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Token::Murmur3(a), Token::Murmur3(b)) => a.cmp(b),
            (Token::Bytes(a), Token::Bytes(b)) => a.cmp(b),
            // One table never mixes partitioners; rank by variant so Ord
            // stays total anyway.
            (Token::Murmur3(_), Token::Bytes(_)) => Ordering::Less,
            (Token::Bytes(_), Token::Murmur3(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// MurmurHash3 x64 128-bit, as used by the Murmur3 partitioner. The token is
/// the first 64-bit half.
fn murmur3_x64_128(data: &[u8], seed: u64) -> (u64, u64) {
    const C1: u64 = 0x87c3_7b91_1142_53d5;
    const C2: u64 = 0x4cf5_ad43_2745_937f;

    let mut h1 = seed;
    let mut h2 = seed;

    let mut chunks = data.chunks_exact(16);
    for block in chunks.by_ref() {
        let k1 = u64::from_le_bytes(block[..8].try_into().unwrap());
        let k2 = u64::from_le_bytes(block[8..].try_into().unwrap());

        h1 ^= k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
        h1 = h1
            .rotate_left(27)
            .wrapping_add(h2)
            .wrapping_mul(5)
            .wrapping_add(0x52dc_e729);

        h2 ^= k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
        h2 = h2
            .rotate_left(31)
            .wrapping_add(h1)
            .wrapping_mul(5)
            .wrapping_add(0x3849_5ab5);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k1 = 0u64;
        let mut k2 = 0u64;
        for (i, &byte) in tail.iter().enumerate() {
            if i < 8 {
                k1 |= u64::from(byte) << (8 * i);
            } else {
                k2 |= u64::from(byte) << (8 * (i - 8));
            }
        }
        if tail.len() > 8 {
            h2 ^= k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
        }
        h1 ^= k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
    }

    h1 ^= data.len() as u64;
    h2 ^= data.len() as u64;
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);
    h1 = fmix64(h1);
    h2 = fmix64(h2);
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);
    (h1, h2)
}

fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}
