//! Staged file provider contract and the local-copy implementation.
//!
//! The scanner only ever reads from local, randomly accessible files. A
//! [`StageFiles`] implementation is responsible for making every component
//! of a table identity available under the scratch directory before the
//! table is opened. Retry policy lives with the provider; a failure here is
//! fatal for the scan.

use std::{fs, path::Path};

use crate::{
    context::ExecutionContext,
    descriptor::{Component, TableDescriptor},
    error::ScanError,
    logging::scan_log,
};

/// Copies the component files of one table identity into scratch storage.
pub trait StageFiles {
    /// Stage every component of `descriptor` (whose directory names the
    /// remote location) into `scratch_dir`, returning the identity rebased
    /// onto the scratch directory.
    fn stage(
        &self,
        descriptor: &TableDescriptor,
        scratch_dir: &Path,
        ctx: &ExecutionContext,
    ) -> Result<TableDescriptor, ScanError>;
}

/// Stages components with plain filesystem copies.
///
/// Suitable when the "remote" location is reachable through the local
/// filesystem (single-host jobs, network mounts, tests).
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStager;

impl StageFiles for LocalStager {
    fn stage(
        &self,
        descriptor: &TableDescriptor,
        scratch_dir: &Path,
        _ctx: &ExecutionContext,
    ) -> Result<TableDescriptor, ScanError> {
        fs::create_dir_all(scratch_dir)?;
        let staged = descriptor.rebased(scratch_dir);
        for component in Component::ALL {
            let source = descriptor.component_path(component);
            let target = staged.component_path(component);
            fs::copy(&source, &target).map_err(|err| {
                ScanError::Staging(format!("copy {} failed: {err}", source.display()))
            })?;
        }
        scan_log!(
            log::Level::Info,
            "staging_completed",
            "keyspace={} table={} generation={} scratch={}",
            staged.keyspace(),
            staged.table(),
            staged.generation(),
            scratch_dir.display(),
        );
        Ok(staged)
    }
}
