//! On-disk format decoding.
//!
//! `format` holds the wire-level framing shared by the reader and the test
//! fixture writer; `sstable` opens and validates a staged component set;
//! `scan` walks partitions and columns in physical order.

/// Wire framing of the data and statistics components.
pub mod format;

/// Partition scanner and per-partition column iterator.
pub mod scan;

/// Opening and validating a staged table.
pub mod sstable;
