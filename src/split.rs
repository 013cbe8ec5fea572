//! Split descriptions handed to a processing unit.

use std::path::{Path, PathBuf};

/// Describes the table file one processing unit must scan.
///
/// One split maps to exactly one table-file identity; the engine never
/// subdivides a table by byte offset, so `length` is informational only
/// (schedulers size work with it).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitDescriptor {
    path: PathBuf,
    length: u64,
}

impl SplitDescriptor {
    /// Describe a split by the path of the table's data component.
    pub fn new(path: impl Into<PathBuf>, length: u64) -> Self {
        Self {
            path: path.into(),
            length,
        }
    }

    /// Path of the data component the split refers to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reported byte length of the data component.
    pub fn length(&self) -> u64 {
        self.length
    }
}
