//! Error type shared across staging, opening, and scanning.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors surfaced by the scanning engine and its collaborators.
///
/// All variants are fatal for the scan that raised them; the crate performs
/// no internal retry. Retry, if any, is a whole-split decision made by the
/// consumer.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Copying remote table components to local scratch storage failed.
    #[error("failed to stage table component: {0}")]
    Staging(String),

    /// A required component file was absent from the staged set.
    #[error("missing sstable component file: {}", .0.display())]
    MissingComponent(PathBuf),

    /// The declared partitioner or comparator kind is not recognized.
    #[error("unsupported schema: {0}")]
    UnsupportedSchema(String),

    /// `next()` was called on an exhausted iterator without a preceding
    /// positive `has_next()`. A contract violation, not a data condition.
    #[error("iterator advanced past exhaustion")]
    IteratorExhausted,

    /// The physical decoder hit malformed or truncated data.
    #[error("malformed sstable data: {0}")]
    Decode(String),

    /// The data component does not match the checksum recorded in the
    /// statistics component.
    #[error("data checksum mismatch: recorded {recorded:#010x}, computed {computed:#010x}")]
    Checksum {
        /// CRC32 recorded in the statistics component.
        recorded: u32,
        /// CRC32 computed over the staged data component.
        computed: u32,
    },

    /// A component path did not parse as a table descriptor.
    #[error("invalid sstable descriptor: {0}")]
    InvalidDescriptor(String),

    /// Underlying filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
