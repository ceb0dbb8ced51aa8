//! Backend collaborator contract
//!
//! The abstract interface the board core consumes. Exact transport is
//! out of scope; implementations sit in front of the REST layer (or an
//! in-memory store in tests). Validation races surface as typed error
//! variants, never as message text.

use crate::error::{BackendError, CreateTaskError, GroupWriteError};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use clinboard_model::{
    AgendaItem, AgendaItemId, ClinicalContext, Code, CodeKind, EpisodeId, Patient, PatientId,
    PhaseId, PriorityKey, StatusKey, Task, TaskGroup, TaskGroupId, TaskId, UserId, UserRef,
};

/// Request to create a task group scoped to a clinical context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaskGroup {
    /// Display name
    pub name: String,
    /// Owning patient
    pub patient_id: PatientId,
    /// Optional episode scope
    pub episode_id: Option<EpisodeId>,
    /// Optional agenda-item link
    pub agenda_item_id: Option<AgendaItemId>,
    /// Optional treatment-phase scope
    pub phase_id: Option<PhaseId>,
}

impl NewTaskGroup {
    /// Request scoped to the full clinical context
    #[inline]
    #[must_use]
    pub fn for_context(
        patient_id: PatientId,
        context: &ClinicalContext,
        name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            patient_id,
            episode_id: context.episode_id,
            agenda_item_id: context.agenda_item_id,
            phase_id: context.phase_id,
        }
    }

    /// Replace the agenda-item link (used by the re-resolved retry)
    #[inline]
    #[must_use]
    pub fn with_agenda_item(mut self, agenda_item_id: Option<AgendaItemId>) -> Self {
        self.agenda_item_id = agenda_item_id;
        self
    }
}

/// Partial update of a task group
///
/// `Some(None)` in a nested option clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGroupPatch {
    /// New display name
    pub name: Option<String>,
    /// New agenda-item link
    pub agenda_item_id: Option<Option<AgendaItemId>>,
}

impl TaskGroupPatch {
    /// Patch that renames the group
    #[inline]
    #[must_use]
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Patch that attaches an agenda-item link
    #[inline]
    #[must_use]
    pub fn agenda_item(agenda_item_id: AgendaItemId) -> Self {
        Self {
            agenda_item_id: Some(Some(agenda_item_id)),
            ..Self::default()
        }
    }
}

/// Request to create a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Target group
    pub group_id: TaskGroupId,
    /// Free-text description
    pub description: String,
    /// Optional due date
    pub due: Option<NaiveDate>,
    /// Optional priority
    pub priority: Option<PriorityKey>,
    /// Optional assignee
    pub assignee: Option<UserId>,
    /// Free-text comment
    pub comment: String,
}

impl NewTask {
    /// New pending task with empty comment
    #[inline]
    #[must_use]
    pub fn new(group_id: TaskGroupId, description: impl Into<String>) -> Self {
        Self {
            group_id,
            description: description.into(),
            due: None,
            priority: None,
            assignee: None,
            comment: String::new(),
        }
    }

    /// With due date
    #[inline]
    #[must_use]
    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }
}

/// Partial update of a task
///
/// Status transitions to COMPLETED/CANCELLED set the closing metadata on
/// the backend side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New description
    pub description: Option<String>,
    /// New priority (`Some(None)` clears)
    pub priority: Option<Option<PriorityKey>>,
    /// New assignee (`Some(None)` clears)
    pub assignee: Option<Option<UserId>>,
    /// New due date (`Some(None)` clears)
    pub due: Option<Option<NaiveDate>>,
    /// New status key
    pub status: Option<StatusKey>,
    /// New comment
    pub comment: Option<String>,
}

impl TaskPatch {
    /// Patch that transitions the status
    #[inline]
    #[must_use]
    pub fn status(status: StatusKey) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch that replaces the description
    #[inline]
    #[must_use]
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }
}

/// The CRUD collaborator the board core calls into
#[async_trait]
pub trait ClinicalBackend: Send + Sync {
    /// Task groups scoped to a patient, optionally narrowed to an episode.
    async fn list_task_groups(
        &self,
        patient_id: PatientId,
        episode_id: Option<EpisodeId>,
    ) -> Result<Vec<TaskGroup>, BackendError>;

    /// Tasks of a group, restricted to the given status keys.
    async fn list_tasks(
        &self,
        group_id: TaskGroupId,
        statuses: &[StatusKey],
    ) -> Result<Vec<Task>, BackendError>;

    /// Create a task group; fails with [`GroupWriteError::StaleAgendaLink`]
    /// when the agenda-item reference is unknown or mismatched.
    async fn create_task_group(&self, request: NewTaskGroup) -> Result<TaskGroup, GroupWriteError>;

    /// Update a task group; same agenda-link failure mode as creation.
    async fn update_task_group(
        &self,
        group_id: TaskGroupId,
        patch: TaskGroupPatch,
    ) -> Result<TaskGroup, GroupWriteError>;

    /// Create a task; fails with [`CreateTaskError::ClosedGroup`] when the
    /// target group is completed or discarded.
    async fn create_task(&self, request: NewTask) -> Result<Task, CreateTaskError>;

    /// Update a task.
    async fn update_task(&self, task_id: TaskId, patch: TaskPatch) -> Result<Task, BackendError>;

    /// Agenda items of an episode.
    async fn list_agenda_items(
        &self,
        episode_id: EpisodeId,
    ) -> Result<Vec<AgendaItem>, BackendError>;

    /// User vocabulary.
    async fn list_users(&self) -> Result<Vec<UserRef>, BackendError>;

    /// Code vocabulary of one kind.
    async fn list_codes(&self, kind: CodeKind) -> Result<Vec<Code>, BackendError>;

    /// Patient record, including its episodes.
    async fn get_patient(&self, patient_id: PatientId) -> Result<Patient, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinboard_model::{AgendaItemId, MeetingId};

    #[test]
    fn new_task_group_mirrors_context() {
        let ctx = ClinicalContext::for_patient(PatientId(7))
            .with_episode(EpisodeId(3))
            .with_agenda_item(AgendaItemId(9), MeetingId(2));
        let request = NewTaskGroup::for_context(PatientId(7), &ctx, "Tasks");

        assert_eq!(request.patient_id, PatientId(7));
        assert_eq!(request.episode_id, Some(EpisodeId(3)));
        assert_eq!(request.agenda_item_id, Some(AgendaItemId(9)));
        assert_eq!(request.phase_id, None);
    }

    #[test]
    fn with_agenda_item_replaces_link() {
        let ctx = ClinicalContext::for_patient(PatientId(7))
            .with_episode(EpisodeId(3))
            .with_agenda_item(AgendaItemId(9), MeetingId(2));
        let request = NewTaskGroup::for_context(PatientId(7), &ctx, "Tasks")
            .with_agenda_item(Some(AgendaItemId(12)));

        assert_eq!(request.agenda_item_id, Some(AgendaItemId(12)));
    }

    #[test]
    fn status_patch_only_sets_status() {
        let patch = TaskPatch::status(StatusKey::Cancelled);
        assert_eq!(patch.status, Some(StatusKey::Cancelled));
        assert_eq!(patch.description, None);
        assert_eq!(patch.due, None);
    }

    #[test]
    fn requests_serialize_with_wire_keys() {
        let due = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let request = NewTask::new(TaskGroupId(4), "Order labs").with_due(due);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["group_id"], 4);
        assert_eq!(json["description"], "Order labs");
        assert_eq!(json["due"], "2024-06-15");

        let patch = TaskPatch::status(StatusKey::Cancelled);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["status"], "CANCELLED");
        assert!(json["description"].is_null());
    }
}
