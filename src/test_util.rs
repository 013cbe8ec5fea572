//! Fixture tables for unit tests: an in-memory table description that can
//! be written out as a complete, checksummed component set.

use std::{fs, io::Write, path::Path};

use crate::{
    descriptor::{Component, TableDescriptor},
    error::ScanError,
    ondisk::format::{
        ColumnKind, ColumnRecord, PartitionDeletion, FLAG_COUNTER, FLAG_EXPIRING, FLAG_LIVE,
        FLAG_TOMBSTONE, STATS_MAGIC, STATS_VERSION,
    },
    schema::{ComparatorKind, PartitionerKind, SchemaMeta},
};

pub(crate) fn live_column(name: &[u8], value: &[u8], timestamp: i64) -> ColumnRecord {
    ColumnRecord {
        name: name.to_vec(),
        value: value.to_vec(),
        timestamp,
        kind: ColumnKind::Live,
    }
}

pub(crate) fn tombstone_column(
    name: &[u8],
    timestamp: i64,
    local_deletion_time: i32,
) -> ColumnRecord {
    ColumnRecord {
        name: name.to_vec(),
        value: Vec::new(),
        timestamp,
        kind: ColumnKind::Tombstone {
            local_deletion_time,
        },
    }
}

pub(crate) fn counter_column(name: &[u8], count: i64, timestamp: i64) -> ColumnRecord {
    ColumnRecord {
        name: name.to_vec(),
        value: count.to_be_bytes().to_vec(),
        timestamp,
        kind: ColumnKind::Counter {
            timestamp_of_last_delete: i64::MIN,
        },
    }
}

struct FixturePartition {
    key: Vec<u8>,
    deletion: PartitionDeletion,
    columns: Vec<ColumnRecord>,
}

/// Builder for an on-disk fixture table.
pub(crate) struct TableFixture {
    partitioner: PartitionerKind,
    comparator: ComparatorKind,
    generation: u64,
    partitions: Vec<FixturePartition>,
    estimate: Option<u64>,
}

impl TableFixture {
    pub(crate) fn new(partitioner: PartitionerKind, comparator: ComparatorKind) -> Self {
        Self {
            partitioner,
            comparator,
            generation: fastrand::u64(1..1000),
            partitions: Vec::new(),
            estimate: None,
        }
    }

    /// A small counter-cell table, the shape the scanner most often sees in
    /// batch jobs.
    pub(crate) fn counters() -> Self {
        Self::new(PartitionerKind::Murmur3, ComparatorKind::Bytes)
            .with_partition(b"row-a", vec![counter_column(b"hits", 123, 1000)])
            .with_partition(b"row-b", vec![counter_column(b"hits", 456, 1000)])
    }

    pub(crate) fn with_partition(mut self, key: &[u8], columns: Vec<ColumnRecord>) -> Self {
        self.partitions.push(FixturePartition {
            key: key.to_vec(),
            deletion: PartitionDeletion::LIVE,
            columns,
        });
        self
    }

    /// A row-tombstoned partition with zero live columns.
    pub(crate) fn with_deleted_partition(mut self, key: &[u8], deleted_at: i64) -> Self {
        self.partitions.push(FixturePartition {
            key: key.to_vec(),
            deletion: PartitionDeletion {
                marked_for_delete_at: deleted_at,
                local_deletion_time: 0,
            },
            columns: Vec::new(),
        });
        self
    }

    /// Override the recorded partition count estimate (defaults to the real
    /// partition count).
    pub(crate) fn with_estimate(mut self, estimate: u64) -> Self {
        self.estimate = Some(estimate);
        self
    }

    pub(crate) fn schema(&self) -> SchemaMeta {
        SchemaMeta::new(self.partitioner, self.comparator)
    }

    /// Write the complete component set into `dir` and return its
    /// descriptor. Partitions land in token order, columns in comparator
    /// order, as a real writer would emit them.
    pub(crate) fn write(&self, dir: &Path) -> Result<TableDescriptor, ScanError> {
        let descriptor = TableDescriptor::new(dir, "ks", "cf", "ka", self.generation);

        let mut ordered: Vec<&FixturePartition> = self.partitions.iter().collect();
        ordered.sort_by_key(|partition| {
            (self.partitioner.token(&partition.key), partition.key.clone())
        });

        let mut data = Vec::new();
        for partition in ordered {
            encode_partition(&mut data, partition, self.comparator)?;
        }

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&data);
        let data_crc = hasher.finalize();

        let estimate = self.estimate.unwrap_or(self.partitions.len() as u64);
        let mut stats = Vec::new();
        stats.extend_from_slice(&STATS_MAGIC.to_be_bytes());
        stats.extend_from_slice(&STATS_VERSION.to_be_bytes());
        stats.extend_from_slice(&estimate.to_be_bytes());
        stats.extend_from_slice(&data_crc.to_be_bytes());

        write_component(&descriptor, Component::Data, &data)?;
        write_component(&descriptor, Component::Statistics, &stats)?;
        // The scanner only requires these to exist; their content is owned
        // by components this crate does not decode.
        for component in [
            Component::Index,
            Component::Filter,
            Component::CompressionInfo,
            Component::Summary,
        ] {
            write_component(&descriptor, component, b"\0")?;
        }
        Ok(descriptor)
    }
}

fn write_component(
    descriptor: &TableDescriptor,
    component: Component,
    bytes: &[u8],
) -> Result<(), ScanError> {
    let mut file = fs::File::create(descriptor.component_path(component))?;
    file.write_all(bytes)?;
    Ok(())
}

fn encode_partition(
    out: &mut Vec<u8>,
    partition: &FixturePartition,
    comparator: ComparatorKind,
) -> Result<(), ScanError> {
    out.extend_from_slice(&(partition.key.len() as u16).to_be_bytes());
    out.extend_from_slice(&partition.key);
    out.extend_from_slice(&partition.deletion.local_deletion_time.to_be_bytes());
    out.extend_from_slice(&partition.deletion.marked_for_delete_at.to_be_bytes());

    let mut columns: Vec<&ColumnRecord> = partition.columns.iter().collect();
    let mut order_error = None;
    columns.sort_by(|a, b| match comparator.compare(&a.name, &b.name) {
        Ok(ordering) => ordering,
        Err(err) => {
            order_error.get_or_insert(err);
            std::cmp::Ordering::Equal
        }
    });
    if let Some(err) = order_error {
        return Err(err);
    }

    for column in columns {
        out.extend_from_slice(&(column.name.len() as u16).to_be_bytes());
        out.extend_from_slice(&column.name);
        match &column.kind {
            ColumnKind::Live => out.push(FLAG_LIVE),
            ColumnKind::Tombstone {
                local_deletion_time,
            } => {
                out.push(FLAG_TOMBSTONE);
                out.extend_from_slice(&local_deletion_time.to_be_bytes());
            }
            ColumnKind::Expiring {
                ttl,
                local_deletion_time,
            } => {
                out.push(FLAG_EXPIRING);
                out.extend_from_slice(&ttl.to_be_bytes());
                out.extend_from_slice(&local_deletion_time.to_be_bytes());
            }
            ColumnKind::Counter {
                timestamp_of_last_delete,
            } => {
                out.push(FLAG_COUNTER);
                out.extend_from_slice(&timestamp_of_last_delete.to_be_bytes());
            }
        }
        out.extend_from_slice(&column.timestamp.to_be_bytes());
        out.extend_from_slice(&(column.value.len() as u32).to_be_bytes());
        out.extend_from_slice(&column.value);
    }
    // End-of-partition sentinel.
    out.extend_from_slice(&0u16.to_be_bytes());
    Ok(())
}
