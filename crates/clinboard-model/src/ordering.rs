//! Task display ordering
//!
//! Deterministic comparator: urgent tasks first; priority rank only
//! discriminates between two urgent tasks; then due date ascending with
//! missing dates last; then id ascending as the stable tie-break.

use crate::types::{priority_rank, Task};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Compare two tasks for display
///
/// Priority is a secondary signal only once urgency already groups items
/// together: a non-urgent pair is ordered purely by due date then id.
#[must_use]
pub fn compare_tasks(a: &Task, b: &Task, today: NaiveDate) -> Ordering {
    let a_urgent = a.is_urgent(today);
    let b_urgent = b.is_urgent(today);

    b_urgent
        .cmp(&a_urgent)
        .then_with(|| {
            if a_urgent && b_urgent {
                priority_rank(a.priority).cmp(&priority_rank(b.priority))
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| compare_due(a.due, b.due))
        .then_with(|| a.id.cmp(&b.id))
}

/// Due date ascending; no due date sorts last.
fn compare_due(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort tasks in place with the display comparator.
pub fn sort_for_display(tasks: &mut [Task], today: NaiveDate) {
    tasks.sort_by(|a, b| compare_tasks(a, b, today));
}
