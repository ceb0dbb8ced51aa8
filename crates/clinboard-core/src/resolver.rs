//! Context resolver
//!
//! Finds the single context-managed task group that ad-hoc "add task"
//! actions should target, or decides that none exists and a new one must
//! be provisioned.

use crate::loader::BoardData;
use chrono::NaiveDate;
use clinboard_model::{ClinicalContext, TaskGroup};

/// Resolve the managed group for a context
///
/// Candidates must match patient and episode, carry no template, match
/// the phase when an episode is present (phase is ignored without one)
/// and not be closed. An exact agenda-item match is preferred; a group
/// that was never linked to any agenda item may absorb work for any
/// agenda item in the same episode, but a group tied to a *different*
/// item is never reused. Ties go to the lowest id (oldest group).
#[must_use]
pub fn resolve_managed_group<'a>(
    context: &ClinicalContext,
    data: &'a BoardData,
    today: NaiveDate,
) -> Option<&'a TaskGroup> {
    let patient_id = context.patient_id?;

    let candidates: Vec<&TaskGroup> = data
        .groups
        .iter()
        .filter(|g| {
            g.patient_id == patient_id
                && g.is_context_managed()
                && g.episode_id == context.episode_id
                && (context.episode_id.is_none() || g.phase_id == context.phase_id)
                && !data.group_state(g.id, today).is_closed()
        })
        .collect();

    let exact = candidates
        .iter()
        .copied()
        .filter(|g| g.agenda_item_id == context.agenda_item_id)
        .min_by_key(|g| g.id);
    if exact.is_some() {
        return exact;
    }

    candidates
        .into_iter()
        .filter(|g| g.agenda_item_id.is_none())
        .min_by_key(|g| g.id)
}
