//! Data loader
//!
//! Fetches task groups, their tasks and the supporting reference data
//! for one clinical context. Sibling fetches (per-group tasks, the
//! vocabularies) run concurrently and are joined before the result is
//! handed back; the controller decides at commit time whether the load
//! has been superseded.

use crate::backend::ClinicalBackend;
use crate::error::BackendError;
use chrono::NaiveDate;
use clinboard_model::{
    group_state, AgendaItemId, ClinicalContext, Code, CodeKind, Episode, EpisodeId, GroupState,
    PatientId, PhaseId, StatusKey, Task, TaskGroup, TaskGroupId, UserRef,
};
use futures::future::try_join_all;
use indexmap::IndexMap;
use std::collections::HashMap;

/// One loaded snapshot of the board
///
/// Owned by the controller; replaced wholesale on commit, never patched
/// piecemeal by concurrent loads.
#[derive(Debug, Clone, Default)]
pub struct BoardData {
    /// Groups surviving the context filters, ordered by id
    pub groups: Vec<TaskGroup>,
    /// Tasks per group, in group order
    pub tasks: IndexMap<TaskGroupId, Vec<Task>>,
    /// Episode lookup for the patients referenced by the groups
    pub episodes: HashMap<EpisodeId, Episode>,
    /// User vocabulary
    pub users: Vec<UserRef>,
    /// Organ codes
    pub organs: Vec<Code>,
    /// Priority codes
    pub priorities: Vec<Code>,
    /// Status codes
    pub status_codes: Vec<Code>,
    /// Treatment phase codes
    pub phases: Vec<Code>,
}

impl BoardData {
    /// Tasks of one group; empty when unknown.
    #[inline]
    #[must_use]
    pub fn tasks_of(&self, group_id: TaskGroupId) -> &[Task] {
        self.tasks.get(&group_id).map_or(&[], Vec::as_slice)
    }

    /// Derived state of one group.
    #[inline]
    #[must_use]
    pub fn group_state(&self, group_id: TaskGroupId, today: NaiveDate) -> GroupState {
        group_state(self.tasks_of(group_id), today)
    }

    /// Display label of a treatment phase, if the vocabulary knows it.
    #[must_use]
    pub fn phase_label(&self, phase_id: PhaseId) -> Option<&str> {
        let key = phase_id.0.to_string();
        self.phases
            .iter()
            .find(|code| code.key == key)
            .map(|code| code.label.as_str())
    }
}

/// Load a full board snapshot for one context
///
/// A context without a patient yields an empty snapshot. Any failing
/// step aborts the whole load; the caller keeps its previous data.
pub async fn load_board(
    backend: &dyn ClinicalBackend,
    context: &ClinicalContext,
    statuses: &[StatusKey],
) -> Result<BoardData, BackendError> {
    let Some(patient_id) = context.patient_id else {
        return Ok(BoardData::default());
    };

    let mut groups = backend
        .list_task_groups(patient_id, context.episode_id)
        .await?;
    tracing::debug!(count = groups.len(), "fetched task groups");

    if let Some(phase_id) = context.phase_id {
        groups.retain(|g| g.phase_id == Some(phase_id));
    }
    if let Some(agenda_item_id) = context.agenda_item_id {
        groups = narrow_to_agenda_item(groups, agenda_item_id);
    }
    groups.sort_by_key(|g| g.id);

    let episodes = episode_lookup(backend, &groups).await?;

    let per_group = try_join_all(groups.iter().map(|group| async move {
        let tasks = backend.list_tasks(group.id, statuses).await?;
        Ok::<_, BackendError>((group.id, tasks))
    }))
    .await?;
    let tasks: IndexMap<TaskGroupId, Vec<Task>> = per_group.into_iter().collect();

    let (users, organs, priorities, status_codes, phases) = tokio::try_join!(
        backend.list_users(),
        backend.list_codes(CodeKind::Organ),
        backend.list_codes(CodeKind::Priority),
        backend.list_codes(CodeKind::TaskStatus),
        backend.list_codes(CodeKind::Phase),
    )?;

    Ok(BoardData {
        groups,
        tasks,
        episodes,
        users,
        organs,
        priorities,
        status_codes,
        phases,
    })
}

/// Narrow groups to one agenda item, with the legacy fallback
///
/// Records created before agenda linkage existed have no link at all;
/// when nothing matches exactly, those unlinked, untemplated groups are
/// shown instead of an empty board.
fn narrow_to_agenda_item(groups: Vec<TaskGroup>, agenda_item_id: AgendaItemId) -> Vec<TaskGroup> {
    let exact: Vec<TaskGroup> = groups
        .iter()
        .filter(|g| g.agenda_item_id == Some(agenda_item_id))
        .cloned()
        .collect();
    if !exact.is_empty() {
        return exact;
    }
    groups
        .into_iter()
        .filter(|g| g.agenda_item_id.is_none() && g.template_id.is_none())
        .collect()
}

/// Fetch the episodes of every patient the groups reference.
async fn episode_lookup(
    backend: &dyn ClinicalBackend,
    groups: &[TaskGroup],
) -> Result<HashMap<EpisodeId, Episode>, BackendError> {
    let mut patient_ids: Vec<PatientId> = groups.iter().map(|g| g.patient_id).collect();
    patient_ids.sort_unstable();
    patient_ids.dedup();

    let patients = try_join_all(
        patient_ids
            .into_iter()
            .map(|id| backend.get_patient(id)),
    )
    .await?;

    Ok(patients
        .into_iter()
        .flat_map(|p| p.episodes)
        .map(|e| (e.id, e))
        .collect())
}
