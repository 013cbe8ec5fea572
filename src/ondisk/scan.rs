//! Forward-only partition and column iteration over the data component.
//!
//! [`SsTableScanner`] yields one [`PartitionColumns`] per partition in
//! physical token order; each [`PartitionColumns`] yields that partition's
//! column records in comparator order. Both follow the same discipline:
//! `has_next()` is an idempotent, side-effect-free peek (it buffers at most
//! one decoded item), `next()` consumes, and calling `next()` past
//! exhaustion is a contract violation reported as
//! [`ScanError::IteratorExhausted`].
//!
//! The scanner and the currently active column iterator share one file
//! cursor. A partition handed out but abandoned before being drained is
//! skipped by the scanner when the next partition is requested, so the
//! scanner never depends on the consumer finishing each partition. An
//! iterator held past that point reports exhaustion; it never reads a
//! later partition's bytes.

use std::{
    cell::RefCell,
    fs::File,
    io::{BufReader, Read},
    rc::Rc,
};

use crate::{
    error::ScanError,
    ondisk::format::{
        decode_column, decode_partition_header, ColumnRecord, PartitionDeletion, PartitionKey,
    },
    scan::{ColumnSource, PartitionSource},
    schema::{ComparatorKind, SchemaMeta},
};

/// Sequential cursor over the data component, shared between the scanner
/// and the active column iterator. Single-threaded by contract.
struct DataCursor {
    reader: BufReader<File>,
    pos: u64,
    len: u64,
    /// Whether the cursor sits inside a partition's column area (the
    /// end-of-partition sentinel has not been read yet).
    in_partition: bool,
    /// Incremented each time a partition header is decoded. A column
    /// iterator stamped with an older value is stale: its partition was
    /// passed over and its bytes are gone.
    partition_seq: u64,
}

impl DataCursor {
    fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }
}

impl Read for DataCursor {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read = self.reader.read(buf)?;
        self.pos += read as u64;
        Ok(read)
    }
}

/// Lazy, finite, forward-only sequence of partitions in on-disk order.
pub struct SsTableScanner {
    cursor: Rc<RefCell<DataCursor>>,
    schema: SchemaMeta,
    peeked: Option<(PartitionKey, PartitionDeletion)>,
    last_key: Option<PartitionKey>,
}

impl SsTableScanner {
    pub(crate) fn new(reader: BufReader<File>, len: u64, schema: SchemaMeta) -> Self {
        Self {
            cursor: Rc::new(RefCell::new(DataCursor {
                reader,
                pos: 0,
                len,
                in_partition: false,
                partition_seq: 0,
            })),
            schema,
            peeked: None,
            last_key: None,
        }
    }

    /// Whether another partition is available. Idempotent between calls to
    /// [`SsTableScanner::next_partition`].
    pub fn has_next(&mut self) -> Result<bool, ScanError> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        let mut cursor = self.cursor.borrow_mut();

        // Skip whatever the consumer left unread in the previous partition.
        while cursor.in_partition {
            let remaining = cursor.remaining();
            if decode_column(&mut *cursor, remaining)?.is_none() {
                cursor.in_partition = false;
            }
        }

        if cursor.remaining() == 0 {
            return Ok(false);
        }

        let remaining = cursor.remaining();
        let header = decode_partition_header(&mut *cursor, remaining)?;
        cursor.in_partition = true;
        cursor.partition_seq += 1;
        drop(cursor);

        let token = self.schema.partitioner().token(&header.key);
        let key = PartitionKey::new(header.key, token);
        // Distinct keys may share a token; ordering ties break on the raw
        // key bytes, so only a non-increasing (token, key) pair is corrupt.
        if let Some(last) = &self.last_key {
            if key <= *last {
                return Err(ScanError::Decode(
                    "partitions out of token order".to_string(),
                ));
            }
        }
        self.last_key = Some(key.clone());
        self.peeked = Some((key, header.deletion));
        Ok(true)
    }

    /// Consume the next partition, yielding its column iterator.
    pub fn next_partition(&mut self) -> Result<PartitionColumns, ScanError> {
        if !self.has_next()? {
            return Err(ScanError::IteratorExhausted);
        }
        let (key, deletion) = self.peeked.take().expect("peeked partition");
        let seq = self.cursor.borrow().partition_seq;
        Ok(PartitionColumns {
            cursor: Rc::clone(&self.cursor),
            comparator: self.schema.comparator(),
            key,
            deletion,
            seq,
            peeked: None,
            last_name: None,
            done: false,
        })
    }
}

impl PartitionSource for SsTableScanner {
    type Columns = PartitionColumns;

    fn has_next(&mut self) -> Result<bool, ScanError> {
        SsTableScanner::has_next(self)
    }

    fn next(&mut self) -> Result<PartitionColumns, ScanError> {
        self.next_partition()
    }
}

/// Lazy, finite, forward-only sequence of one partition's column records.
///
/// A partition with zero live columns reports `has_next() == false`
/// immediately; that is a valid partition (a row tombstone), not an error.
pub struct PartitionColumns {
    cursor: Rc<RefCell<DataCursor>>,
    comparator: ComparatorKind,
    key: PartitionKey,
    deletion: PartitionDeletion,
    /// Cursor sequence this iterator was created under; a mismatch means
    /// the scanner has moved past this partition.
    seq: u64,
    peeked: Option<ColumnRecord>,
    last_name: Option<Vec<u8>>,
    done: bool,
}

impl PartitionColumns {
    /// Key of the partition this iterator walks.
    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    /// Row-level deletion info from the partition header.
    pub fn deletion(&self) -> &PartitionDeletion {
        &self.deletion
    }

    /// Whether another column is available. Idempotent between calls to
    /// [`PartitionColumns::next_column`].
    pub fn has_next(&mut self) -> Result<bool, ScanError> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        if self.done {
            return Ok(false);
        }
        let mut cursor = self.cursor.borrow_mut();
        if !cursor.in_partition || cursor.partition_seq != self.seq {
            // The scanner already moved past this partition.
            self.done = true;
            return Ok(false);
        }
        let remaining = cursor.remaining();
        let record = match decode_column(&mut *cursor, remaining)? {
            Some(record) => record,
            None => {
                cursor.in_partition = false;
                self.done = true;
                return Ok(false);
            }
        };
        drop(cursor);

        if let Some(last) = &self.last_name {
            if self.comparator.compare(&record.name, last)? != std::cmp::Ordering::Greater {
                return Err(ScanError::Decode(
                    "columns out of comparator order".to_string(),
                ));
            }
        }
        self.last_name = Some(record.name.clone());
        self.peeked = Some(record);
        Ok(true)
    }

    /// Consume the next column record.
    pub fn next_column(&mut self) -> Result<ColumnRecord, ScanError> {
        if !self.has_next()? {
            return Err(ScanError::IteratorExhausted);
        }
        Ok(self.peeked.take().expect("peeked column"))
    }
}

impl ColumnSource for PartitionColumns {
    fn key(&self) -> &PartitionKey {
        PartitionColumns::key(self)
    }

    fn has_next(&mut self) -> Result<bool, ScanError> {
        PartitionColumns::has_next(self)
    }

    fn next(&mut self) -> Result<ColumnRecord, ScanError> {
        self.next_column()
    }
}
