//! Execution context handed to a processing unit.
//!
//! Carries the string-keyed configuration supplied by the surrounding
//! framework plus the scratch directory staged components are copied into.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

/// Configuration key naming the partitioner the table was written with.
pub const PARTITIONER_KEY: &str = "sstable.scan.partitioner";

/// Configuration key naming the column comparator of the table.
pub const COMPARATOR_KEY: &str = "sstable.scan.comparator";

/// Immutable bag of configuration values plus local scratch storage.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    options: HashMap<String, String>,
    scratch_dir: PathBuf,
}

impl ExecutionContext {
    /// Create a context rooted at the given scratch directory.
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            options: HashMap::new(),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Add or replace one configuration value.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Look up a configuration value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Directory staged component files are copied into.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}
