//! Linkage Patcher: edit the shared-library linkage metadata of a binary
//!
//! Renames dependency references, sets a library's own identity name
//! (soname), and adds, renames or removes entries of the runtime search path
//! (rpath). Rewriting the object file itself is left to a [`BinaryPatcher`].
//!
//! # Architecture
//!
//! Requests flow through three stages:
//!
//! - [`RawRequests::validate`] rejects contradictory or duplicate requests.
//!   Nothing is touched until the whole set passes.
//! - [`apply_requests`] issues direct edits first, then reads the rpath once.
//! - [`edit_rpath`] edits the rpath by whole entries. The result is written
//!   back only if it changed.
//!
//! # Example
//!
//! ```
//! use linkage_patcher::{run, ApplyOptions, MemoryPatcher, RawRequests};
//!
//! let mut patcher = MemoryPatcher::new().with_rpath("/usr/lib:/old/lib");
//! let requests = RawRequests::new()
//!     .input("libfoo.so")
//!     .rpath("/old/lib", "/new/lib")
//!     .add_rpath("$ORIGIN");
//!
//! let report = run(requests, &mut patcher, &ApplyOptions::default()).unwrap();
//! assert_eq!(patcher.rpath(), "/usr/lib:/new/lib:$ORIGIN");
//! assert!(report.rpath.unwrap().written);
//! ```

pub mod applicator;
pub mod config;
pub mod patcher;
pub mod request;
pub mod rpath;
pub mod validate;

use thiserror::Error;

// Re-exports
pub use applicator::{
    apply_requests, run, ApplyOptions, ApplyReport, RPathOutcome, StepOutcome, StepReport,
};
pub use config::{load_settings, ConfigError, FailurePolicy, Settings};
pub use patcher::{fetch_rpath, BinaryPatcher, DryRun, MemoryPatcher, PatchError, Patchelf};
pub use request::{
    ChangeRequest, IdentityRequest, RPathAddition, RPathDeletion, RPathRename, RawRequests,
    RequestSet,
};
pub use rpath::{edit_rpath, normalize_rpath, RPathEdit, RPathList};
pub use validate::UsageError;

/// Any failure of a run.
#[derive(Error, Debug)]
pub enum Error {
    /// The request set was rejected. Nothing was modified.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// The patcher failed. Earlier edits of the same run may have been applied.
    #[error(transparent)]
    Patch(#[from] PatchError),
}
