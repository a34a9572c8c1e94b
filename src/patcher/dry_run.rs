//! A patcher wrapper that never writes.

use super::{BinaryPatcher, PatchError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A mutation that [`DryRun`] held back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedWrite {
    ReplaceReference { old: String, new: String, path: PathBuf },
    SetIdentityName { name: String, path: PathBuf },
    SetRPath { value: String, path: PathBuf },
}

/// Forwards reads to the inner patcher and records writes instead of performing them.
#[derive(Debug)]
pub struct DryRun<P> {
    inner: P,
    planned: Vec<PlannedWrite>,
}

impl<P: BinaryPatcher> DryRun<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            planned: Vec::new(),
        }
    }

    pub fn planned(&self) -> &[PlannedWrite] {
        &self.planned
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    fn plan(&mut self, write: PlannedWrite) {
        debug!(?write, "dry run: skipping write");
        self.planned.push(write);
    }
}

impl<P: BinaryPatcher> BinaryPatcher for DryRun<P> {
    fn replace_reference(&mut self, old: &str, new: &str, path: &Path) -> Result<(), PatchError> {
        self.plan(PlannedWrite::ReplaceReference {
            old: old.to_string(),
            new: new.to_string(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn set_identity_name(&mut self, name: &str, path: &Path) -> Result<(), PatchError> {
        self.plan(PlannedWrite::SetIdentityName {
            name: name.to_string(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn rpath_len(&mut self, path: &Path) -> Result<usize, PatchError> {
        self.inner.rpath_len(path)
    }

    fn read_rpath(&mut self, path: &Path, buf: &mut [u8]) -> Result<(), PatchError> {
        self.inner.read_rpath(path, buf)
    }

    fn set_rpath(&mut self, value: &str, path: &Path) -> Result<(), PatchError> {
        self.plan(PlannedWrite::SetRPath {
            value: value.to_string(),
            path: path.to_path_buf(),
        });
        Ok(())
    }
}
