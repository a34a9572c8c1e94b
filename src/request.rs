//! Edit requests collected from the command line.
//!
//! Requests are plain values. The only mutable state is the `matched` flag on
//! rpath renames and deletions, which the rpath editor sets while it runs.

use std::fmt;
use std::path::PathBuf;

/// Replace the dependency reference `old` with `new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    pub old: String,
    pub new: String,
}

impl ChangeRequest {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }
}

impl fmt::Display for ChangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-change {} {}", self.old, self.new)
    }
}

/// Set the binary's own identity name (soname).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRequest {
    pub name: String,
}

impl IdentityRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for IdentityRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-id {}", self.name)
    }
}

/// Rename every rpath entry equal to `old` to `new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RPathRename {
    pub old: String,
    pub new: String,
    /// Set by the editor when at least one entry equalled `old`.
    pub matched: bool,
}

impl RPathRename {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
            matched: false,
        }
    }

    /// True if `value` is either side of this rename.
    pub fn touches(&self, value: &str) -> bool {
        self.old == value || self.new == value
    }

    fn same_pair(&self, other: &RPathRename) -> bool {
        self.old == other.old && self.new == other.new
    }

    /// True if this rename and `other` share any value without being the same pair.
    pub(crate) fn overlaps(&self, other: &RPathRename) -> bool {
        !self.same_pair(other) && (other.touches(&self.old) || other.touches(&self.new))
    }
}

impl fmt::Display for RPathRename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-rpath {} {}", self.old, self.new)
    }
}

/// Append `new` to the rpath list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RPathAddition {
    pub new: String,
}

impl RPathAddition {
    pub fn new(new: impl Into<String>) -> Self {
        Self { new: new.into() }
    }
}

impl fmt::Display for RPathAddition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-add_rpath {}", self.new)
    }
}

/// Remove every rpath entry equal to `old`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RPathDeletion {
    pub old: String,
    /// Set by the editor when at least one entry was removed.
    pub matched: bool,
}

impl RPathDeletion {
    pub fn new(old: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            matched: false,
        }
    }
}

impl fmt::Display for RPathDeletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-delete_rpath {}", self.old)
    }
}

/// Everything the command line produced, before validation.
///
/// Each collection keeps command-line order. Positional inputs and `-id`
/// values are kept as lists so the validator can report "more than one".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRequests {
    pub inputs: Vec<PathBuf>,
    pub ids: Vec<String>,
    pub changes: Vec<ChangeRequest>,
    pub renames: Vec<RPathRename>,
    pub additions: Vec<RPathAddition>,
    pub deletions: Vec<RPathDeletion>,
}

impl RawRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    pub fn id(mut self, name: impl Into<String>) -> Self {
        self.ids.push(name.into());
        self
    }

    pub fn change(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.changes.push(ChangeRequest::new(old, new));
        self
    }

    pub fn rpath(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.renames.push(RPathRename::new(old, new));
        self
    }

    pub fn add_rpath(mut self, new: impl Into<String>) -> Self {
        self.additions.push(RPathAddition::new(new));
        self
    }

    pub fn delete_rpath(mut self, old: impl Into<String>) -> Self {
        self.deletions.push(RPathDeletion::new(old));
        self
    }
}

/// A validated request set. Built only by [`RawRequests::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSet {
    pub(crate) input: PathBuf,
    pub(crate) identity: Option<IdentityRequest>,
    pub(crate) changes: Vec<ChangeRequest>,
    pub(crate) renames: Vec<RPathRename>,
    pub(crate) additions: Vec<RPathAddition>,
    pub(crate) deletions: Vec<RPathDeletion>,
}

impl RequestSet {
    pub fn input(&self) -> &PathBuf {
        &self.input
    }

    pub fn identity(&self) -> Option<&IdentityRequest> {
        self.identity.as_ref()
    }

    pub fn changes(&self) -> &[ChangeRequest] {
        &self.changes
    }

    pub fn renames(&self) -> &[RPathRename] {
        &self.renames
    }

    pub fn additions(&self) -> &[RPathAddition] {
        &self.additions
    }

    pub fn deletions(&self) -> &[RPathDeletion] {
        &self.deletions
    }

    /// True if any request targets the rpath list.
    pub fn touches_rpath(&self) -> bool {
        !self.renames.is_empty() || !self.additions.is_empty() || !self.deletions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_legacy_flag_spelling() {
        assert_eq!(RPathRename::new("a", "b").to_string(), "-rpath a b");
        assert_eq!(RPathAddition::new("b").to_string(), "-add_rpath b");
        assert_eq!(RPathDeletion::new("c").to_string(), "-delete_rpath c");
        assert_eq!(ChangeRequest::new("x", "y").to_string(), "-change x y");
        assert_eq!(IdentityRequest::new("libz.so").to_string(), "-id libz.so");
    }

    #[test]
    fn test_rename_overlap() {
        let ab = RPathRename::new("a", "b");
        assert!(ab.overlaps(&RPathRename::new("b", "c")));
        assert!(ab.overlaps(&RPathRename::new("c", "a")));
        assert!(ab.overlaps(&RPathRename::new("a", "c")));
        assert!(!ab.overlaps(&RPathRename::new("c", "d")));
        assert!(!ab.overlaps(&RPathRename::new("a", "b")));
    }

    #[test]
    fn test_builder_keeps_order() {
        let raw = RawRequests::new()
            .add_rpath("one")
            .add_rpath("two")
            .input("bin");
        assert_eq!(raw.additions[0].new, "one");
        assert_eq!(raw.additions[1].new, "two");
        assert_eq!(raw.inputs, vec![PathBuf::from("bin")]);
    }
}
