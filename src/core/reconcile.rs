//! Diff reconciliation between tracked mirror elements and the index sets an
//! external algorithm reports.
//!
//! The external algorithms own the real segments and synapses; this crate only
//! mirrors them. Every mirror point follows the same protocol:
//! - an index reported for the first time gets a fresh tracked element,
//! - a tracked element whose index is no longer reported is flagged removed
//!   and stays visible (flagged) for the rest of the step,
//! - physical deletion happens on the owner's next rotation, never here.

use fxhash::FxHashSet;
use std::collections::BTreeMap;

/// Aligns `tracked` with the `reported` index set.
///
/// `make_new` builds the mirror element for a newly reported index;
/// `flag_removed` marks a tracked element the algorithm stopped reporting.
/// Returns `(created, flagged)` so callers can log reconciliation churn.
pub fn reconcile<T>(
    tracked: &mut BTreeMap<usize, T>,
    reported: &FxHashSet<usize>,
    mut make_new: impl FnMut(usize) -> T,
    mut flag_removed: impl FnMut(&mut T),
) -> (usize, usize) {
    let mut created = 0;
    for &index in reported {
        tracked.entry(index).or_insert_with(|| {
            created += 1;
            make_new(index)
        });
    }
    let mut flagged = 0;
    for (index, element) in tracked.iter_mut() {
        if !reported.contains(index) {
            flag_removed(element);
            flagged += 1;
        }
    }
    (created, flagged)
}
