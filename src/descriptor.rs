//! Table identity and component file naming.
//!
//! A table file is a set of sibling component files sharing one name stem,
//! `<keyspace>-<table>-<version>-<generation>-<Component>.db`. The descriptor
//! captures the stem; [`Component`] enumerates the suffixes. Identity is
//! resolved once per processing unit and never mutated afterwards.

use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
};

use crate::error::ScanError;

/// Component files making up one table on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    /// Partition and column payload.
    Data,
    /// Primary index.
    Index,
    /// Bloom filter over partition keys.
    Filter,
    /// Statistics, including the partition count estimate and data CRC.
    Statistics,
    /// Compression chunk offsets.
    CompressionInfo,
    /// Index summary.
    Summary,
}

impl Component {
    /// Every component a complete staged set must contain.
    pub const ALL: [Component; 6] = [
        Component::Data,
        Component::Index,
        Component::Filter,
        Component::Statistics,
        Component::CompressionInfo,
        Component::Summary,
    ];
}

impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Component::Data => write!(f, "Data"),
            Component::Index => write!(f, "Index"),
            Component::Filter => write!(f, "Filter"),
            Component::Statistics => write!(f, "Statistics"),
            Component::CompressionInfo => write!(f, "CompressionInfo"),
            Component::Summary => write!(f, "Summary"),
        }
    }
}

/// Identity of one table file: directory prefix, keyspace/table name,
/// generation, and format version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDescriptor {
    dir: PathBuf,
    keyspace: String,
    table: String,
    version: String,
    generation: u64,
}

impl TableDescriptor {
    /// Build a descriptor from its parts.
    pub fn new(
        dir: impl Into<PathBuf>,
        keyspace: impl Into<String>,
        table: impl Into<String>,
        version: impl Into<String>,
        generation: u64,
    ) -> Self {
        Self {
            dir: dir.into(),
            keyspace: keyspace.into(),
            table: table.into(),
            version: version.into(),
            generation,
        }
    }

    /// Resolve a descriptor from the path of any component file.
    ///
    /// The filename must have the shape
    /// `<keyspace>-<table>-<version>-<generation>-<Component>.db`.
    pub fn from_component_path(path: &Path) -> Result<Self, ScanError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ScanError::InvalidDescriptor(format!("no filename in {}", path.display()))
            })?;
        let stem = file_name.strip_suffix(".db").ok_or_else(|| {
            ScanError::InvalidDescriptor(format!("missing .db suffix: {file_name}"))
        })?;
        let parts: Vec<&str> = stem.split('-').collect();
        if parts.len() != 5 {
            return Err(ScanError::InvalidDescriptor(format!(
                "expected keyspace-table-version-generation-component, got {file_name}"
            )));
        }
        let generation = parts[3].parse::<u64>().map_err(|_| {
            ScanError::InvalidDescriptor(format!("generation is not a number: {}", parts[3]))
        })?;
        Ok(Self {
            dir: path.parent().unwrap_or_else(|| Path::new("")).to_path_buf(),
            keyspace: parts[0].to_string(),
            table: parts[1].to_string(),
            version: parts[2].to_string(),
            generation,
        })
    }

    /// Directory holding the component files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keyspace name.
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    /// Table (column family) name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// File format version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Generation number of this table file.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Full path of one component file under this identity.
    pub fn component_path(&self, component: Component) -> PathBuf {
        self.dir.join(format!(
            "{}-{}-{}-{}-{}.db",
            self.keyspace, self.table, self.version, self.generation, component
        ))
    }

    /// The same identity rebased onto a different directory, as produced by
    /// staging components into scratch storage.
    pub fn rebased(&self, dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn parses_component_path() {
        let path = Path::new("/data/ks1/events-log-ka-12-Data.db");
        let descriptor = TableDescriptor::from_component_path(path).unwrap();
        assert_eq!(descriptor.keyspace(), "events");
        assert_eq!(descriptor.table(), "log");
        assert_eq!(descriptor.version(), "ka");
        assert_eq!(descriptor.generation(), 12);
        assert_eq!(descriptor.dir(), Path::new("/data/ks1"));
    }

    #[test]
    fn component_paths_share_the_stem() {
        let descriptor = TableDescriptor::new("/tmp/t", "ks", "cf", "ka", 3);
        assert_eq!(
            descriptor.component_path(Component::Data),
            Path::new("/tmp/t/ks-cf-ka-3-Data.db")
        );
        assert_eq!(
            descriptor.component_path(Component::CompressionInfo),
            Path::new("/tmp/t/ks-cf-ka-3-CompressionInfo.db")
        );
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in [
            "/tmp/Data.db",
            "/tmp/ks-cf-ka-3-Data",
            "/tmp/ks-cf-ka-x-Data.db",
            "/tmp/ks-cf-ka-3-4-Data.db",
        ] {
            let result = TableDescriptor::from_component_path(Path::new(bad));
            assert!(
                matches!(result, Err(ScanError::InvalidDescriptor(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn rebased_keeps_identity() {
        let descriptor = TableDescriptor::new("/remote", "ks", "cf", "ka", 9);
        let staged = descriptor.rebased("/scratch");
        assert_eq!(staged.generation(), 9);
        assert_eq!(staged.dir(), Path::new("/scratch"));
        assert_eq!(
            staged.component_path(Component::Summary),
            Path::new("/scratch/ks-cf-ka-9-Summary.db")
        );
    }
}
