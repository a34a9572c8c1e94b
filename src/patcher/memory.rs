//! An in-memory stand-in for a binary.
//!
//! Holds dependency names, a soname and a raw rpath, and logs every call it
//! receives. Individual operations can be made to fail.

use super::{BinaryPatcher, PatchError};
use std::path::Path;

/// One call received by a [`MemoryPatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatcherCall {
    ReplaceReference { old: String, new: String },
    SetIdentityName { name: String },
    RPathLen,
    ReadRPath { len: usize },
    SetRPath { value: String },
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPatcher {
    needed: Vec<String>,
    soname: Option<String>,
    rpath: Vec<u8>,
    calls: Vec<PatcherCall>,
    failing: Vec<&'static str>,
}

impl MemoryPatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_needed<I, S>(mut self, needed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.needed = needed.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_soname(mut self, soname: impl Into<String>) -> Self {
        self.soname = Some(soname.into());
        self
    }

    pub fn with_rpath(self, rpath: &str) -> Self {
        self.with_raw_rpath(rpath.as_bytes().to_vec())
    }

    /// Store the rpath bytes verbatim, padding included.
    pub fn with_raw_rpath(mut self, rpath: Vec<u8>) -> Self {
        self.rpath = rpath;
        self
    }

    /// Make every call to `operation` fail.
    ///
    /// Names match the `operation` of [`PatchError::Failed`]: `replace_reference`,
    /// `set_identity_name`, `read_rpath`, `set_rpath`.
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing.push(operation);
        self
    }

    pub fn needed(&self) -> &[String] {
        &self.needed
    }

    pub fn soname(&self) -> Option<&str> {
        self.soname.as_deref()
    }

    pub fn rpath(&self) -> String {
        String::from_utf8_lossy(&self.rpath).into_owned()
    }

    pub fn calls(&self) -> &[PatcherCall] {
        &self.calls
    }

    fn check(&self, operation: &'static str, path: &Path) -> Result<(), PatchError> {
        if self.failing.contains(&operation) {
            return Err(PatchError::Failed {
                operation,
                path: path.to_path_buf(),
                status: "injected".to_string(),
                stderr: format!("{operation} configured to fail"),
            });
        }
        Ok(())
    }
}

impl BinaryPatcher for MemoryPatcher {
    fn replace_reference(&mut self, old: &str, new: &str, path: &Path) -> Result<(), PatchError> {
        self.calls.push(PatcherCall::ReplaceReference {
            old: old.to_string(),
            new: new.to_string(),
        });
        self.check("replace_reference", path)?;
        for entry in self.needed.iter_mut().filter(|n| n.as_str() == old) {
            *entry = new.to_string();
        }
        Ok(())
    }

    fn set_identity_name(&mut self, name: &str, path: &Path) -> Result<(), PatchError> {
        self.calls.push(PatcherCall::SetIdentityName {
            name: name.to_string(),
        });
        self.check("set_identity_name", path)?;
        self.soname = Some(name.to_string());
        Ok(())
    }

    fn rpath_len(&mut self, _path: &Path) -> Result<usize, PatchError> {
        self.calls.push(PatcherCall::RPathLen);
        Ok(self.rpath.len())
    }

    fn read_rpath(&mut self, path: &Path, buf: &mut [u8]) -> Result<(), PatchError> {
        self.calls.push(PatcherCall::ReadRPath { len: buf.len() });
        self.check("read_rpath", path)?;
        if buf.len() != self.rpath.len() {
            return Err(PatchError::BufferSize {
                expected: self.rpath.len(),
                actual: buf.len(),
            });
        }
        buf.copy_from_slice(&self.rpath);
        Ok(())
    }

    fn set_rpath(&mut self, value: &str, path: &Path) -> Result<(), PatchError> {
        self.calls.push(PatcherCall::SetRPath {
            value: value.to_string(),
        });
        self.check("set_rpath", path)?;
        self.rpath = value.as_bytes().to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_reference_rewrites_matching_entries() {
        let mut patcher = MemoryPatcher::new().with_needed(["libc.so.6", "libz.so.1"]);
        patcher
            .replace_reference("libz.so.1", "libz.so.2", Path::new("bin"))
            .unwrap();
        assert_eq!(patcher.needed(), ["libc.so.6", "libz.so.2"]);
    }

    #[test]
    fn test_injected_failure_is_logged() {
        let mut patcher = MemoryPatcher::new().failing_on("set_identity_name");
        let err = patcher
            .set_identity_name("libx.so", Path::new("bin"))
            .unwrap_err();
        assert!(matches!(err, PatchError::Failed { operation: "set_identity_name", .. }));
        assert_eq!(patcher.calls().len(), 1);
        assert_eq!(patcher.soname(), None);
    }

    #[test]
    fn test_read_rpath_checks_buffer_size() {
        let mut patcher = MemoryPatcher::new().with_rpath("/a");
        let mut buf = [0u8; 1];
        let err = patcher.read_rpath(Path::new("bin"), &mut buf).unwrap_err();
        assert!(matches!(err, PatchError::BufferSize { expected: 2, actual: 1 }));
    }
}
