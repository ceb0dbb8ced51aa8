//! Group provisioning and recovery
//!
//! The write-side half of context resolution: attaching a missing
//! agenda link to a reused group, creating a group when none is
//! reusable, and recovering from the two backend validation races.
//! Every recovery path is an explicit attempt / attempt-with-resolved-
//! link pair, so "retry exactly once" is visible in the control flow
//! rather than buried in a loop.

use crate::backend::{ClinicalBackend, NewTaskGroup, TaskGroupPatch};
use crate::error::{BoardError, GroupWriteError};
use clinboard_model::{AgendaItemId, ClinicalContext, PatientId, TaskGroup, TaskGroupId};

/// Attach an agenda-item link to a group that never had one
///
/// A rejected link is re-resolved against the current agenda once; a
/// second rejection propagates.
pub(crate) async fn attach_agenda_item(
    backend: &dyn ClinicalBackend,
    group_id: TaskGroupId,
    agenda_item_id: AgendaItemId,
    context: &ClinicalContext,
) -> Result<TaskGroup, BoardError> {
    match backend
        .update_task_group(group_id, TaskGroupPatch::agenda_item(agenda_item_id))
        .await
    {
        Ok(group) => Ok(group),
        Err(GroupWriteError::StaleAgendaLink) => {
            tracing::warn!(%group_id, %agenda_item_id, "agenda link rejected; re-resolving");
            let current = resolve_current_agenda_item(backend, context).await?;
            backend
                .update_task_group(group_id, TaskGroupPatch::agenda_item(current))
                .await
                .map_err(BoardError::from)
        }
        Err(other) => Err(other.into()),
    }
}

/// Create a task group scoped to the full context
///
/// Same single re-resolved retry as [`attach_agenda_item`] when the
/// agenda link is rejected. Any other failure propagates.
pub(crate) async fn create_group_for_context(
    backend: &dyn ClinicalBackend,
    patient_id: PatientId,
    context: &ClinicalContext,
) -> Result<TaskGroup, BoardError> {
    let request = NewTaskGroup::for_context(patient_id, context, default_group_name(patient_id));
    match backend.create_task_group(request.clone()).await {
        Ok(group) => Ok(group),
        Err(GroupWriteError::StaleAgendaLink) => {
            tracing::warn!(%patient_id, "group creation rejected over agenda link; re-resolving");
            let current = resolve_current_agenda_item(backend, context).await?;
            backend
                .create_task_group(request.with_agenda_item(Some(current)))
                .await
                .map_err(BoardError::from)
        }
        Err(other) => Err(other.into()),
    }
}

/// Resolve the current agenda-item id for the context's meeting
///
/// Lists the episode's agenda items and picks the lowest id among those
/// belonging to the context's meeting.
pub(crate) async fn resolve_current_agenda_item(
    backend: &dyn ClinicalBackend,
    context: &ClinicalContext,
) -> Result<AgendaItemId, BoardError> {
    let (Some(episode_id), Some(meeting_id)) = (context.episode_id, context.meeting_id) else {
        return Err(BoardError::AgendaLinkConflict);
    };
    let items = backend.list_agenda_items(episode_id).await?;
    items
        .iter()
        .filter(|item| item.meeting_id == meeting_id)
        .map(|item| item.id)
        .min()
        .ok_or(BoardError::AgendaLinkConflict)
}

/// Display name for a provisioned group.
pub(crate) fn default_group_name(patient_id: PatientId) -> String {
    format!("Tasks for {patient_id}")
}

/// Generated description of an auto-provisioned first task.
#[must_use]
pub fn default_task_description(
    patient_id: PatientId,
    context: &ClinicalContext,
    phase_name: Option<&str>,
) -> String {
    let mut description = format!("New task for {patient_id}");
    if let Some(episode_id) = context.episode_id {
        description.push_str(&format!(" · {episode_id}"));
    }
    if let Some(phase_name) = phase_name {
        description.push_str(&format!(" · {phase_name}"));
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinboard_model::EpisodeId;

    #[test]
    fn description_for_patient_only() {
        let ctx = ClinicalContext::for_patient(PatientId(7));
        assert_eq!(
            default_task_description(PatientId(7), &ctx, None),
            "New task for P#7"
        );
    }

    #[test]
    fn description_includes_episode_and_phase() {
        let ctx = ClinicalContext::for_patient(PatientId(7)).with_episode(EpisodeId(3));
        assert_eq!(
            default_task_description(PatientId(7), &ctx, Some("Induction")),
            "New task for P#7 · E#3 · Induction"
        );
    }

    #[test]
    fn description_skips_missing_phase() {
        let ctx = ClinicalContext::for_patient(PatientId(7)).with_episode(EpisodeId(3));
        assert_eq!(
            default_task_description(PatientId(7), &ctx, None),
            "New task for P#7 · E#3"
        );
    }
}
