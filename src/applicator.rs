//! Request application - drives a patcher through a validated request set
//!
//! Order is fixed:
//! 1. every `-change`, one patcher call each, in command-line order
//! 2. the `-id`, if present
//! 3. if any rpath request exists, one read of the current rpath, the edit,
//!    and a single write-back only when the edit produced a different value
//!
//! Nothing is rolled back. A failure in step 3 leaves steps 1 and 2 applied.

use crate::config::FailurePolicy;
use crate::patcher::{fetch_rpath, BinaryPatcher, PatchError};
use crate::request::{RPathDeletion, RPathRename, RawRequests, RequestSet};
use crate::rpath::{edit_rpath, RPathList};
use crate::Error;
use std::fmt;
use tracing::{debug, warn};

/// Knobs for [`apply_requests`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// What to do when a `-change` or `-id` edit fails.
    pub on_direct_failure: FailurePolicy,
}

/// Result of one direct edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    /// Recorded instead of aborting under [`FailurePolicy::Continue`].
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// The request as it was spelled on the command line.
    pub request: String,
    pub outcome: StepOutcome,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            StepOutcome::Applied => write!(f, "{}: applied", self.request),
            StepOutcome::Failed { reason } => write!(f, "{}: failed - {}", self.request, reason),
        }
    }
}

/// What happened to the rpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RPathOutcome {
    pub before: String,
    pub after: String,
    /// True if a write-back was issued.
    pub written: bool,
    pub unmatched_renames: Vec<RPathRename>,
    pub unmatched_deletions: Vec<RPathDeletion>,
}

impl RPathOutcome {
    /// The existing entry closest to `name`, for "did you mean" hints.
    pub fn hint_for(&self, name: &str) -> Option<String> {
        RPathList::parse(&self.before)
            .closest_entry(name)
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "ApplyReport may contain failures recorded under FailurePolicy::Continue"]
pub struct ApplyReport {
    /// Direct edits, in the order they were issued.
    pub steps: Vec<StepReport>,
    /// Present only when an rpath request was made.
    pub rpath: Option<RPathOutcome>,
}

impl ApplyReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|step| matches!(step.outcome, StepOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Validate `raw` and apply it.
///
/// A request set that fails validation never reaches the patcher.
pub fn run<P: BinaryPatcher + ?Sized>(
    raw: RawRequests,
    patcher: &mut P,
    options: &ApplyOptions,
) -> Result<ApplyReport, Error> {
    let mut requests = raw.validate()?;
    Ok(apply_requests(&mut requests, patcher, options)?)
}

/// Apply a validated request set.
///
/// Sets the `matched` flags of the rpath renames and deletions in `requests`.
pub fn apply_requests<P: BinaryPatcher + ?Sized>(
    requests: &mut RequestSet,
    patcher: &mut P,
    options: &ApplyOptions,
) -> Result<ApplyReport, PatchError> {
    let mut report = ApplyReport::default();
    let input = requests.input.clone();

    for change in &requests.changes {
        let result = patcher.replace_reference(&change.old, &change.new, &input);
        record_step(&mut report, change.to_string(), result, options)?;
    }

    if let Some(identity) = &requests.identity {
        let result = patcher.set_identity_name(&identity.name, &input);
        record_step(&mut report, identity.to_string(), result, options)?;
    }

    if !requests.touches_rpath() {
        return Ok(report);
    }

    let before = fetch_rpath(patcher, &input)?;
    let edit = edit_rpath(
        &before,
        &mut requests.renames,
        &requests.additions,
        &mut requests.deletions,
    );
    debug!(before = %before, after = %edit.value, dirty = edit.dirty, "edited rpath");

    if edit.dirty {
        patcher.set_rpath(&edit.value, &input)?;
    }

    report.rpath = Some(RPathOutcome {
        before,
        after: edit.value,
        written: edit.dirty,
        unmatched_renames: requests
            .renames
            .iter()
            .filter(|r| !r.matched)
            .cloned()
            .collect(),
        unmatched_deletions: requests
            .deletions
            .iter()
            .filter(|d| !d.matched)
            .cloned()
            .collect(),
    });

    Ok(report)
}

fn record_step(
    report: &mut ApplyReport,
    request: String,
    result: Result<(), PatchError>,
    options: &ApplyOptions,
) -> Result<(), PatchError> {
    let outcome = match result {
        Ok(()) => {
            debug!(%request, "applied");
            StepOutcome::Applied
        }
        Err(e) => match options.on_direct_failure {
            FailurePolicy::Abort => return Err(e),
            FailurePolicy::Continue => {
                warn!(%request, error = %e, "edit failed, continuing");
                StepOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        },
    };
    report.steps.push(StepReport { request, outcome });
    Ok(())
}
