//! Request validation.
//!
//! Every check runs over the full request set before anything touches the
//! binary. The first violation found is reported; a request set that passes
//! is moved unchanged into a [`RequestSet`].
//!
//! # Rules
//!
//! 1. A `-rpath old new` pair may not be given twice.
//! 2. No value may appear on either side of two different `-rpath` pairs.
//!    Chains such as `-rpath a b -rpath b c` are ambiguous in a single pass.
//! 3. An `-add_rpath` value may not be either side of a `-rpath`, and may not
//!    be given twice.
//! 4. A `-delete_rpath` value may not be either side of a `-rpath`, and may
//!    not be given twice.
//! 5. A value may not be both added and deleted.
//! 6. Exactly one input file, at most one `-id`, at least one modification.

use crate::request::{IdentityRequest, RawRequests, RequestSet};
use crate::rpath::SEPARATOR;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed or contradictory command input. Always raised before any mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("\"{request}\": {reason}")]
    InvalidEntry { request: String, reason: &'static str },

    #[error("\"{request}\" specified more than once")]
    Duplicate { request: String },

    #[error("can't specify both \"{first}\" and \"{second}\"")]
    RenameConflict { first: String, second: String },

    #[error("can't specify both \"{rename}\" and \"{addition}\"")]
    RenameAdditionConflict { rename: String, addition: String },

    #[error("can't specify both \"{rename}\" and \"{deletion}\"")]
    RenameDeletionConflict { rename: String, deletion: String },

    #[error("can't specify both \"{addition}\" and \"{deletion}\"")]
    AdditionDeletionConflict { addition: String, deletion: String },

    #[error("no input file specified")]
    MissingInput,

    #[error("more than one input file specified ({} and {})", .first.display(), .second.display())]
    MultipleInputs { first: PathBuf, second: PathBuf },

    #[error("more than one -id option specified")]
    MultipleIds,

    #[error("no modification requested (expected at least one of -change, -id, -rpath, -add_rpath, -delete_rpath)")]
    NoModifications,
}

impl RawRequests {
    /// Check the whole request set and turn it into a [`RequestSet`].
    pub fn validate(self) -> Result<RequestSet, UsageError> {
        check_entries(&self)?;
        check_renames(&self)?;
        check_additions(&self)?;
        check_deletions(&self)?;
        check_additions_against_deletions(&self)?;
        let input = check_shape(&self)?;

        let RawRequests {
            ids,
            changes,
            renames,
            additions,
            deletions,
            ..
        } = self;

        Ok(RequestSet {
            input,
            identity: ids.into_iter().next().map(IdentityRequest::new),
            changes,
            renames,
            additions,
            deletions,
        })
    }
}

fn entry_problem(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        Some("rpath entries cannot be empty")
    } else if value.contains(SEPARATOR) {
        Some("rpath entries cannot contain ':'")
    } else {
        None
    }
}

fn check_entries(raw: &RawRequests) -> Result<(), UsageError> {
    let invalid = |request: String, reason| UsageError::InvalidEntry { request, reason };

    for rename in &raw.renames {
        if let Some(reason) = entry_problem(&rename.old).or_else(|| entry_problem(&rename.new)) {
            return Err(invalid(rename.to_string(), reason));
        }
    }
    for addition in &raw.additions {
        if let Some(reason) = entry_problem(&addition.new) {
            return Err(invalid(addition.to_string(), reason));
        }
    }
    for deletion in &raw.deletions {
        if let Some(reason) = entry_problem(&deletion.old) {
            return Err(invalid(deletion.to_string(), reason));
        }
    }
    Ok(())
}

fn check_renames(raw: &RawRequests) -> Result<(), UsageError> {
    for (idx, first) in raw.renames.iter().enumerate() {
        for second in &raw.renames[idx + 1..] {
            if first.old == second.old && first.new == second.new {
                return Err(UsageError::Duplicate {
                    request: second.to_string(),
                });
            }
        }
    }

    for (idx, first) in raw.renames.iter().enumerate() {
        for second in &raw.renames[idx + 1..] {
            if first.overlaps(second) {
                return Err(UsageError::RenameConflict {
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_additions(raw: &RawRequests) -> Result<(), UsageError> {
    for (idx, addition) in raw.additions.iter().enumerate() {
        if raw.additions[..idx].iter().any(|a| a.new == addition.new) {
            return Err(UsageError::Duplicate {
                request: addition.to_string(),
            });
        }
        if let Some(rename) = raw.renames.iter().find(|r| r.touches(&addition.new)) {
            return Err(UsageError::RenameAdditionConflict {
                rename: rename.to_string(),
                addition: addition.to_string(),
            });
        }
    }
    Ok(())
}

fn check_deletions(raw: &RawRequests) -> Result<(), UsageError> {
    for (idx, deletion) in raw.deletions.iter().enumerate() {
        if raw.deletions[..idx].iter().any(|d| d.old == deletion.old) {
            return Err(UsageError::Duplicate {
                request: deletion.to_string(),
            });
        }
        if let Some(rename) = raw.renames.iter().find(|r| r.touches(&deletion.old)) {
            return Err(UsageError::RenameDeletionConflict {
                rename: rename.to_string(),
                deletion: deletion.to_string(),
            });
        }
    }
    Ok(())
}

fn check_additions_against_deletions(raw: &RawRequests) -> Result<(), UsageError> {
    for addition in &raw.additions {
        if let Some(deletion) = raw.deletions.iter().find(|d| d.old == addition.new) {
            return Err(UsageError::AdditionDeletionConflict {
                addition: addition.to_string(),
                deletion: deletion.to_string(),
            });
        }
    }
    Ok(())
}

fn check_shape(raw: &RawRequests) -> Result<PathBuf, UsageError> {
    let input = match raw.inputs.as_slice() {
        [] => return Err(UsageError::MissingInput),
        [input] => input.clone(),
        [first, second, ..] => {
            return Err(UsageError::MultipleInputs {
                first: first.clone(),
                second: second.clone(),
            })
        }
    };

    if raw.ids.len() > 1 {
        return Err(UsageError::MultipleIds);
    }

    if raw.ids.is_empty()
        && raw.changes.is_empty()
        && raw.renames.is_empty()
        && raw.additions.is_empty()
        && raw.deletions.is_empty()
    {
        return Err(UsageError::NoModifications);
    }

    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RawRequests {
        RawRequests::new().input("libfoo.so")
    }

    #[test]
    fn test_valid_set_passes_unchanged() {
        let set = base()
            .change("libold.so", "libnew.so")
            .id("libfoo.so.1")
            .rpath("/opt/a", "/opt/b")
            .add_rpath("/opt/c")
            .delete_rpath("/opt/d")
            .validate()
            .unwrap();

        assert_eq!(set.input(), &PathBuf::from("libfoo.so"));
        assert_eq!(set.identity().unwrap().name, "libfoo.so.1");
        assert_eq!(set.changes().len(), 1);
        assert_eq!(set.renames()[0].old, "/opt/a");
        assert_eq!(set.additions()[0].new, "/opt/c");
        assert_eq!(set.deletions()[0].old, "/opt/d");
        assert!(set.touches_rpath());
    }

    #[test]
    fn test_duplicate_rename_pair() {
        let err = base().rpath("a", "b").rpath("a", "b").validate().unwrap_err();
        assert_eq!(err.to_string(), "\"-rpath a b\" specified more than once");
    }

    #[test]
    fn test_duplicate_reported_before_overlap() {
        let err = base()
            .rpath("a", "b")
            .rpath("b", "c")
            .rpath("a", "b")
            .validate()
            .unwrap_err();
        assert!(matches!(err, UsageError::Duplicate { .. }));
    }

    #[test]
    fn test_rename_chain_rejected() {
        let err = base().rpath("a", "b").rpath("b", "c").validate().unwrap_err();
        assert_eq!(
            err,
            UsageError::RenameConflict {
                first: "-rpath a b".into(),
                second: "-rpath b c".into(),
            }
        );
        assert_eq!(
            err.to_string(),
            "can't specify both \"-rpath a b\" and \"-rpath b c\""
        );
    }

    #[test]
    fn test_rename_same_old_different_new_rejected() {
        let err = base().rpath("a", "b").rpath("a", "c").validate().unwrap_err();
        assert!(matches!(err, UsageError::RenameConflict { .. }));
    }

    #[test]
    fn test_rename_same_new_rejected() {
        let err = base().rpath("a", "x").rpath("b", "x").validate().unwrap_err();
        assert!(matches!(err, UsageError::RenameConflict { .. }));
    }

    #[test]
    fn test_addition_vs_rename() {
        let err = base().rpath("a", "b").add_rpath("b").validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "can't specify both \"-rpath a b\" and \"-add_rpath b\""
        );

        let err = base().add_rpath("a").rpath("a", "b").validate().unwrap_err();
        assert!(matches!(err, UsageError::RenameAdditionConflict { .. }));
    }

    #[test]
    fn test_duplicate_addition() {
        let err = base().add_rpath("x").add_rpath("x").validate().unwrap_err();
        assert_eq!(err.to_string(), "\"-add_rpath x\" specified more than once");
    }

    #[test]
    fn test_deletion_vs_rename() {
        let err = base().rpath("a", "b").delete_rpath("a").validate().unwrap_err();
        assert_eq!(
            err,
            UsageError::RenameDeletionConflict {
                rename: "-rpath a b".into(),
                deletion: "-delete_rpath a".into(),
            }
        );
    }

    #[test]
    fn test_duplicate_deletion() {
        let err = base().delete_rpath("x").delete_rpath("x").validate().unwrap_err();
        assert!(matches!(err, UsageError::Duplicate { .. }));
    }

    #[test]
    fn test_addition_vs_deletion() {
        let err = base().delete_rpath("x").add_rpath("x").validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "can't specify both \"-add_rpath x\" and \"-delete_rpath x\""
        );
    }

    #[test]
    fn test_invalid_entries() {
        let err = base().add_rpath("a:b").validate().unwrap_err();
        assert!(matches!(err, UsageError::InvalidEntry { .. }));

        let err = base().delete_rpath("").validate().unwrap_err();
        assert!(matches!(err, UsageError::InvalidEntry { .. }));

        let err = base().rpath("a", "").validate().unwrap_err();
        assert!(matches!(err, UsageError::InvalidEntry { .. }));
    }

    #[test]
    fn test_change_values_are_not_rpath_checked() {
        assert!(base().change("a:b", "").validate().is_ok());
    }

    #[test]
    fn test_input_count() {
        let err = RawRequests::new().id("x").validate().unwrap_err();
        assert_eq!(err, UsageError::MissingInput);

        let err = RawRequests::new()
            .input("a")
            .input("b")
            .id("x")
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "more than one input file specified (a and b)");
    }

    #[test]
    fn test_multiple_ids() {
        let err = base().id("x").id("y").validate().unwrap_err();
        assert_eq!(err, UsageError::MultipleIds);
    }

    #[test]
    fn test_no_modifications() {
        let err = base().validate().unwrap_err();
        assert_eq!(err, UsageError::NoModifications);
    }

    #[test]
    fn test_conflicts_reported_before_shape() {
        let err = RawRequests::new()
            .rpath("a", "b")
            .add_rpath("b")
            .validate()
            .unwrap_err();
        assert!(matches!(err, UsageError::RenameAdditionConflict { .. }));
    }
}
