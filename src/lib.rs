#![deny(missing_docs)]
//! Pull-based scanning of immutable, sorted on-disk tables (SSTables).
//!
//! The crate opens a staged local copy of one table's component files and
//! exposes its contents as a flat, ordered sequence of
//! (partition key, column record) pairs. Partitions are walked in on-disk
//! token order, columns within a partition in comparator order, and the
//! two-level structure is flattened by [`ColumnRecordScan`] into a single
//! `advance()`-driven stream with monotonic progress reporting.

mod logging;

/// Table identity and component file naming.
pub mod descriptor;

/// Crate-wide error type.
pub mod error;

/// Partitioner and comparator binding.
pub mod schema;

/// Execution context carrying configuration and scratch storage.
pub mod context;

/// Split descriptions handed to a processing unit.
pub mod split;

/// Staged file provider contract and the local-copy implementation.
pub mod fs;

/// On-disk format decoding: readers, scanners, column iterators.
pub mod ondisk;

/// The flattening record engine and the processing-unit boundary.
pub mod scan;

pub use crate::{
    context::ExecutionContext,
    descriptor::{Component, TableDescriptor},
    error::ScanError,
    fs::{LocalStager, StageFiles},
    ondisk::{
        format::{ColumnKind, ColumnRecord, PartitionDeletion, PartitionKey},
        scan::{PartitionColumns, SsTableScanner},
        sstable::SsTableReader,
    },
    scan::{ColumnRecordScan, ColumnSource, PartitionSource},
    schema::{ComparatorKind, PartitionerKind, SchemaMeta, Token},
    split::SplitDescriptor,
};

#[cfg(test)]
mod test_util;
