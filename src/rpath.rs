//! Runtime search-path list editing.
//!
//! The rpath is a `:`-joined list of directories. All edits work on whole
//! entries: the list is split into tokens, tokens are replaced or removed by
//! value, and the result is joined again. A request for `b` never touches an
//! entry `ab`.
//!
//! Nothing here performs I/O.

use crate::request::{RPathAddition, RPathDeletion, RPathRename};
use std::fmt;

/// Separator between rpath entries.
pub const SEPARATOR: char = ':';

/// Entries whose edit distance to a missed name is at most this are offered as hints.
const MAX_HINT_DISTANCE: usize = 3;

/// An ordered list of non-empty rpath entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RPathList {
    entries: Vec<String>,
}

impl RPathList {
    /// Split `value` on the separator. Empty entries are dropped.
    pub fn parse(value: &str) -> Self {
        Self {
            entries: value
                .split(SEPARATOR)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e == entry)
    }

    /// Replace every entry equal to `old` with `new`, repeating until nothing
    /// changes. Returns true if any entry equalled `old`.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        let matched = self.contains(old);
        if old == new {
            return matched;
        }
        loop {
            let mut replaced = false;
            for entry in self.entries.iter_mut().filter(|e| e.as_str() == old) {
                *entry = new.to_string();
                replaced = true;
            }
            if !replaced {
                break;
            }
        }
        matched
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    /// Remove every entry equal to `old`. Returns true if anything was removed.
    pub fn remove(&mut self, old: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e != old);
        self.entries.len() != before
    }

    /// The entry closest to `name`, if any is near enough to be a likely typo.
    pub fn closest_entry(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .map(|entry| (strsim::levenshtein(entry, name), entry))
            .filter(|(distance, _)| *distance <= MAX_HINT_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, entry)| entry.as_str())
    }
}

impl fmt::Display for RPathList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, entry) in self.entries.iter().enumerate() {
            if idx > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(entry)?;
        }
        Ok(())
    }
}

/// Outcome of [`edit_rpath`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RPathEdit.dirty decides whether the rpath must be written back"]
pub struct RPathEdit {
    /// The new rpath string.
    pub value: String,
    /// True if `value` differs from the input.
    pub dirty: bool,
}

/// Apply renames, then additions, then deletions to `current`.
///
/// Sets `matched` on every rename and deletion that found an entry. If no
/// entry was renamed, added or removed the input comes back untouched and
/// `dirty` is false, even when the input was not in canonical form.
pub fn edit_rpath(
    current: &str,
    renames: &mut [RPathRename],
    additions: &[RPathAddition],
    deletions: &mut [RPathDeletion],
) -> RPathEdit {
    let mut list = RPathList::parse(current);
    let mut changed = false;

    for rename in renames.iter_mut() {
        rename.matched = list.rename(&rename.old, &rename.new);
        changed |= rename.matched && rename.old != rename.new;
    }

    for addition in additions {
        list.push(addition.new.as_str());
        changed = true;
    }

    for deletion in deletions.iter_mut() {
        deletion.matched = list.remove(&deletion.old);
        changed |= deletion.matched;
    }

    if !changed {
        return RPathEdit {
            value: current.to_string(),
            dirty: false,
        };
    }

    let value = normalize_rpath(&list.to_string());
    RPathEdit {
        dirty: value != current,
        value,
    }
}

/// Collapse runs of separators into one. A lone separator becomes the empty string.
pub fn normalize_rpath(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == SEPARATOR && out.ends_with(SEPARATOR) {
            continue;
        }
        out.push(ch);
    }
    if out.len() == SEPARATOR.len_utf8() && out.starts_with(SEPARATOR) {
        out.clear();
    }
    out
}
