//! Opening and validating a staged SSTable.
//!
//! [`SsTableReader`] owns the open data-file handle for one table identity.
//! Opening validates that the staged component set is complete, checks the
//! data component against the CRC recorded in the statistics component, and
//! reads the partition count estimate. The reader is exclusively owned:
//! [`SsTableReader::scan`] consumes it, so a fresh scan means reopening.

use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
};

use crate::{
    descriptor::{Component, TableDescriptor},
    error::ScanError,
    logging::scan_log,
    ondisk::{format::Statistics, scan::SsTableScanner},
    schema::SchemaMeta,
};

/// Read handle over one staged table file.
#[derive(Debug)]
pub struct SsTableReader {
    descriptor: TableDescriptor,
    schema: SchemaMeta,
    stats: Statistics,
    data: File,
    data_len: u64,
}

impl SsTableReader {
    /// Open a staged table, binding the given schema metadata to the decoder.
    ///
    /// Fails with [`ScanError::MissingComponent`] when any of the six
    /// component files is absent, and with [`ScanError::Checksum`] when the
    /// data component does not match the recorded CRC. The underlying files
    /// are never mutated.
    pub fn open(descriptor: &TableDescriptor, schema: SchemaMeta) -> Result<Self, ScanError> {
        for component in Component::ALL {
            let path = descriptor.component_path(component);
            if !path.is_file() {
                return Err(ScanError::MissingComponent(path));
            }
        }

        let stats_file = File::open(descriptor.component_path(Component::Statistics))?;
        let stats = Statistics::decode(&mut BufReader::new(stats_file))?;

        let mut data = File::open(descriptor.component_path(Component::Data))?;
        let data_len = data.metadata()?.len();
        let computed = data_crc(&data)?;
        if computed != stats.data_crc {
            return Err(ScanError::Checksum {
                recorded: stats.data_crc,
                computed,
            });
        }
        // Hashing read to EOF; scanning starts over.
        data.seek(SeekFrom::Start(0))?;

        scan_log!(
            log::Level::Debug,
            "table_opened",
            "keyspace={} table={} generation={} data_bytes={} estimated_partitions={}",
            descriptor.keyspace(),
            descriptor.table(),
            descriptor.generation(),
            data_len,
            stats.partition_count_estimate,
        );

        Ok(Self {
            descriptor: descriptor.clone(),
            schema,
            stats,
            data,
            data_len,
        })
    }

    /// Estimated number of partitions in the table. An estimate from the
    /// statistics component, not an exact count.
    pub fn estimated_partition_count(&self) -> u64 {
        self.stats.partition_count_estimate
    }

    /// Identity this reader is bound to.
    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    /// Turn the reader into a forward-only partition scanner.
    ///
    /// Consumes the reader; the scanner cannot be rewound once exhausted.
    pub fn scan(self) -> SsTableScanner {
        SsTableScanner::new(BufReader::new(self.data), self.data_len, self.schema)
    }
}

fn data_crc(mut file: &File) -> Result<u32, ScanError> {
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hasher.finalize())
}
