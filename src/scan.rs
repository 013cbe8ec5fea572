//! The flattening record engine and the processing-unit boundary.
//!
//! [`ColumnRecordScan`] composes a partition scanner and the currently
//! active partition's column iterator into one flat, pull-based sequence of
//! (partition key, column record) pairs. The two-level iteration becomes an
//! explicit state machine: the engine owns at most one active column
//! iterator at a time, advances it until exhaustion, then fetches the next
//! partition from the scanner. Zero-column partitions are skipped inside
//! the advance loop so they never signal a premature end of stream.
//!
//! Progress is credited when a partition is fetched from the scanner (never
//! per column) and reported against the table's estimated partition count,
//! so the value is monotone, bounded in `[0, 1]`, and only as accurate as
//! the estimate.

use crate::{
    error::ScanError,
    fs::StageFiles,
    logging::scan_log,
    ondisk::{
        format::{ColumnRecord, PartitionKey},
        scan::SsTableScanner,
        sstable::SsTableReader,
    },
    schema::SchemaMeta,
    split::SplitDescriptor,
    ExecutionContext, TableDescriptor,
};

/// A forward-only source of partitions, each yielding a column iterator.
///
/// The engine is generic over this seam so its state machine can be tested
/// against synthetic partition layouts; [`SsTableScanner`] is the on-disk
/// implementation.
pub trait PartitionSource {
    /// Column iterator type produced for each partition.
    type Columns: ColumnSource;

    /// Idempotent peek: whether another partition is available.
    fn has_next(&mut self) -> Result<bool, ScanError>;

    /// Consume the next partition. Calling past exhaustion is a contract
    /// violation reported as [`ScanError::IteratorExhausted`].
    fn next(&mut self) -> Result<Self::Columns, ScanError>;
}

/// A forward-only source of one partition's column records.
pub trait ColumnSource {
    /// Key of the partition, valid for the source's lifetime.
    fn key(&self) -> &PartitionKey;

    /// Idempotent peek: whether another column is available.
    fn has_next(&mut self) -> Result<bool, ScanError>;

    /// Consume the next column record.
    fn next(&mut self) -> Result<ColumnRecord, ScanError>;
}

/// Pull-based flat scan over every column record of one table file.
///
/// Single-threaded by contract: one consumer drives `advance()` until it
/// returns `false`, reading `current_key()` / `current_record()` after each
/// successful advance, and calls `shutdown()` when finished or when
/// abandoning the scan early.
pub struct ColumnRecordScan<S: PartitionSource> {
    scanner: Option<S>,
    active: Option<S::Columns>,
    estimated_partitions: u64,
    partitions_advanced: u64,
    current: Option<(PartitionKey, ColumnRecord)>,
    done: bool,
}

impl<S: PartitionSource> ColumnRecordScan<S> {
    /// Build an engine over an already-open partition source.
    pub fn new(scanner: S, estimated_partitions: u64) -> Self {
        Self {
            scanner: Some(scanner),
            active: None,
            estimated_partitions,
            partitions_advanced: 0,
            current: None,
            done: false,
        }
    }

    /// Pull the next (key, record) pair.
    ///
    /// Returns `Ok(true)` when a record was produced, `Ok(false)` at end of
    /// stream (and forever after). Decode and I/O failures abort the scan.
    pub fn advance(&mut self) -> Result<bool, ScanError> {
        if self.done {
            return Ok(false);
        }
        loop {
            if let Some(active) = self.active.as_mut() {
                if active.has_next()? {
                    let record = active.next()?;
                    self.current = Some((active.key().clone(), record));
                    return Ok(true);
                }
                // Exhausted; discard, never reuse.
                self.active = None;
            }

            let scanner = match self.scanner.as_mut() {
                Some(scanner) => scanner,
                None => {
                    self.finish();
                    return Ok(false);
                }
            };
            if scanner.has_next()? {
                let columns = scanner.next()?;
                self.partitions_advanced += 1;
                self.active = Some(columns);
                // Loop again: a zero-column partition contributes nothing
                // but must not end the stream.
            } else {
                self.finish();
                return Ok(false);
            }
        }
    }

    /// Fraction of the scan completed, in `[0, 1]`.
    ///
    /// Derived from partitions fetched versus the estimated partition
    /// count. Because the denominator is an estimate, the value may reach
    /// 1.0 before the last partition when the estimate ran low; it never
    /// exceeds 1.0 and never decreases.
    pub fn progress(&self) -> f64 {
        let estimate = self.estimated_partitions.max(1);
        (self.partitions_advanced as f64 / estimate as f64).min(1.0)
    }

    /// How many partitions have been fetched from the scanner so far.
    pub fn partitions_advanced(&self) -> u64 {
        self.partitions_advanced
    }

    /// Key produced by the last successful [`ColumnRecordScan::advance`].
    /// Absent before the first record and after end of stream.
    pub fn current_key(&self) -> Option<&PartitionKey> {
        self.current.as_ref().map(|(key, _)| key)
    }

    /// Record produced by the last successful [`ColumnRecordScan::advance`].
    /// Absent before the first record and after end of stream.
    pub fn current_record(&self) -> Option<&ColumnRecord> {
        self.current.as_ref().map(|(_, record)| record)
    }

    /// Release the scanner and any active column iterator.
    ///
    /// Idempotent: safe to call at any point, any number of times,
    /// including before the first `advance()`. Nothing keeps running after
    /// this returns, and the current key/record become absent exactly as
    /// they do at a natural end of stream.
    pub fn shutdown(&mut self) {
        let had_resources = self.scanner.is_some() || self.active.is_some();
        self.active = None;
        self.scanner = None;
        self.current = None;
        self.done = true;
        if had_resources {
            scan_log!(
                log::Level::Debug,
                "scan_shutdown",
                "partitions_advanced={}",
                self.partitions_advanced,
            );
        }
    }

    /// Terminal transition: drop resources, clear the current pair.
    fn finish(&mut self) {
        self.done = true;
        self.current = None;
        self.active = None;
        self.scanner = None;
        scan_log!(
            log::Level::Debug,
            "scan_done",
            "partitions_advanced={} estimated={}",
            self.partitions_advanced,
            self.estimated_partitions,
        );
    }
}

impl ColumnRecordScan<SsTableScanner> {
    /// Stage, open, and wrap one split's table file.
    ///
    /// Resolves the schema from the context's named keys (fatal
    /// [`ScanError::UnsupportedSchema`] before anything is staged or
    /// opened), stages every component into the context's scratch
    /// directory, validates the staged set, and positions the engine before
    /// the first record.
    pub fn initialize(
        split: &SplitDescriptor,
        ctx: &ExecutionContext,
        stager: &dyn StageFiles,
    ) -> Result<Self, ScanError> {
        let schema = SchemaMeta::from_context(ctx)?;
        let descriptor = TableDescriptor::from_component_path(split.path())?;
        let staged = stager.stage(&descriptor, ctx.scratch_dir(), ctx)?;
        let reader = SsTableReader::open(&staged, schema)?;
        let estimated = reader.estimated_partition_count();
        scan_log!(
            log::Level::Info,
            "scan_initialized",
            "keyspace={} table={} generation={} estimated_partitions={}",
            staged.keyspace(),
            staged.table(),
            staged.generation(),
            estimated,
        );
        Ok(Self::new(reader.scan(), estimated))
    }
}
