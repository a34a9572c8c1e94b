//! Patcher backed by an external `patchelf` program.

use super::{BinaryPatcher, PatchError};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Default program name, looked up on `PATH`.
pub const DEFAULT_PROGRAM: &str = "patchelf";

/// Runs a program that understands the `patchelf` command line.
///
/// The value printed by the size query is kept until the following
/// [`read_rpath`](BinaryPatcher::read_rpath) so the program runs once per read.
#[derive(Debug, Clone)]
pub struct Patchelf {
    program: String,
    printed: Option<(PathBuf, Vec<u8>)>,
}

impl Default for Patchelf {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl Patchelf {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            printed: None,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run<I, S>(&self, operation: &'static str, path: &Path, args: I) -> Result<Vec<u8>, PatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if !path.is_file() {
            return Err(PatchError::InputNotFound(path.to_path_buf()));
        }

        let mut command = Command::new(&self.program);
        command.args(args).arg(path);
        debug!(
            program = %self.program,
            operation,
            args = ?command.get_args().collect::<Vec<_>>(),
            "running patcher"
        );

        let output = command.output().map_err(|source| PatchError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(PatchError::Failed {
                operation,
                path: path.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    fn print_rpath(&self, path: &Path) -> Result<Vec<u8>, PatchError> {
        let mut stdout = self.run("read_rpath", path, ["--print-rpath"])?;
        while matches!(stdout.last(), Some(b'\n' | b'\r')) {
            stdout.pop();
        }
        Ok(stdout)
    }
}

impl BinaryPatcher for Patchelf {
    fn replace_reference(&mut self, old: &str, new: &str, path: &Path) -> Result<(), PatchError> {
        self.run("replace_reference", path, ["--replace-needed", old, new])?;
        Ok(())
    }

    fn set_identity_name(&mut self, name: &str, path: &Path) -> Result<(), PatchError> {
        self.run("set_identity_name", path, ["--set-soname", name])?;
        Ok(())
    }

    fn rpath_len(&mut self, path: &Path) -> Result<usize, PatchError> {
        let value = self.print_rpath(path)?;
        let len = value.len();
        self.printed = Some((path.to_path_buf(), value));
        Ok(len)
    }

    fn read_rpath(&mut self, path: &Path, buf: &mut [u8]) -> Result<(), PatchError> {
        let value = match self.printed.take() {
            Some((printed_for, value)) if printed_for == path => value,
            _ => self.print_rpath(path)?,
        };
        if value.len() != buf.len() {
            return Err(PatchError::BufferSize {
                expected: value.len(),
                actual: buf.len(),
            });
        }
        buf.copy_from_slice(&value);
        Ok(())
    }

    fn set_rpath(&mut self, value: &str, path: &Path) -> Result<(), PatchError> {
        self.printed = None;
        self.run("set_rpath", path, ["--set-rpath", value])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_input_is_reported_before_spawning() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut patcher = Patchelf::new("definitely-not-a-real-patcher-program");
        let missing = temp_dir.path().join("missing.so");

        let err = patcher.rpath_len(&missing).unwrap_err();
        assert!(matches!(err, PatchError::InputNotFound(_)));
    }

    #[test]
    fn test_missing_program_is_a_spawn_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("lib.so");
        fs::write(&input, b"\x7fELF").unwrap();

        let mut patcher = Patchelf::new("definitely-not-a-real-patcher-program");
        let err = patcher.set_identity_name("lib.so.1", &input).unwrap_err();
        assert!(matches!(err, PatchError::Spawn { .. }));
    }

    #[test]
    fn test_default_program() {
        assert_eq!(Patchelf::default().program(), DEFAULT_PROGRAM);
    }
}
