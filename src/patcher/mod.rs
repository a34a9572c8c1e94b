//! The boundary to whatever rewrites the binary.
//!
//! Object-file rewriting lives behind [`BinaryPatcher`]. The rest of the crate
//! only decides *what* to ask for.

pub mod dry_run;
pub mod memory;
pub mod patchelf;

pub use dry_run::{DryRun, PlannedWrite};
pub use memory::{MemoryPatcher, PatcherCall};
pub use patchelf::Patchelf;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Operations a binary patcher must provide.
///
/// Reading the rpath is two calls: [`rpath_len`](Self::rpath_len) reports how
/// many bytes the value needs, then [`read_rpath`](Self::read_rpath) fills a
/// buffer of exactly that size. Use [`fetch_rpath`] rather than calling them
/// directly.
pub trait BinaryPatcher {
    /// Rewrite the dependency reference `old` to `new`.
    fn replace_reference(&mut self, old: &str, new: &str, path: &Path) -> Result<(), PatchError>;

    /// Rewrite the binary's own identity name.
    fn set_identity_name(&mut self, name: &str, path: &Path) -> Result<(), PatchError>;

    /// Byte length of the current rpath value.
    fn rpath_len(&mut self, path: &Path) -> Result<usize, PatchError>;

    /// Fill `buf` with the current rpath value.
    fn read_rpath(&mut self, path: &Path, buf: &mut [u8]) -> Result<(), PatchError>;

    /// Overwrite the rpath. An empty `value` clears it.
    fn set_rpath(&mut self, value: &str, path: &Path) -> Result<(), PatchError>;
}

impl<P: BinaryPatcher + ?Sized> BinaryPatcher for &mut P {
    fn replace_reference(&mut self, old: &str, new: &str, path: &Path) -> Result<(), PatchError> {
        (**self).replace_reference(old, new, path)
    }

    fn set_identity_name(&mut self, name: &str, path: &Path) -> Result<(), PatchError> {
        (**self).set_identity_name(name, path)
    }

    fn rpath_len(&mut self, path: &Path) -> Result<usize, PatchError> {
        (**self).rpath_len(path)
    }

    fn read_rpath(&mut self, path: &Path, buf: &mut [u8]) -> Result<(), PatchError> {
        (**self).read_rpath(path, buf)
    }

    fn set_rpath(&mut self, value: &str, path: &Path) -> Result<(), PatchError> {
        (**self).set_rpath(value, path)
    }
}

/// Failures reported by a patcher.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} failed on {} ({status}): {stderr}", .path.display())]
    Failed {
        operation: &'static str,
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("rpath buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("rpath of {} is not valid UTF-8", .path.display())]
    InvalidRPath {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read the current rpath using the size-then-fill protocol.
///
/// Trailing NUL and newline padding is stripped.
pub fn fetch_rpath<P: BinaryPatcher + ?Sized>(
    patcher: &mut P,
    path: &Path,
) -> Result<String, PatchError> {
    let len = patcher.rpath_len(path)?;
    let mut buf = vec![0u8; len];
    patcher.read_rpath(path, &mut buf)?;

    while matches!(buf.last(), Some(b'\0' | b'\n' | b'\r')) {
        buf.pop();
    }

    String::from_utf8(buf).map_err(|source| PatchError::InvalidRPath {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_rpath_strips_padding() {
        let mut patcher = MemoryPatcher::new().with_raw_rpath(b"/a:/b\0\0".to_vec());
        let rpath = fetch_rpath(&mut patcher, Path::new("bin")).unwrap();
        assert_eq!(rpath, "/a:/b");
        assert_eq!(
            patcher.calls(),
            &[PatcherCall::RPathLen, PatcherCall::ReadRPath { len: 7 }]
        );
    }

    #[test]
    fn test_fetch_rpath_empty() {
        let mut patcher = MemoryPatcher::new();
        assert_eq!(fetch_rpath(&mut patcher, Path::new("bin")).unwrap(), "");
    }

    #[test]
    fn test_fetch_rpath_rejects_invalid_utf8() {
        let mut patcher = MemoryPatcher::new().with_raw_rpath(vec![0xff, 0xfe]);
        let err = fetch_rpath(&mut patcher, Path::new("bin")).unwrap_err();
        assert!(matches!(err, PatchError::InvalidRPath { .. }));
    }
}
