//! Testing utilities for the clinboard workspace
//!
//! An in-memory [`ClinicalBackend`] with scriptable failure injection:
//! stale agenda links fall out of the data (an unknown or mismatched
//! reference is rejected the way the real backend rejects it), and the
//! closed-group race and transport failures can be armed explicitly.
//! Every call yields once before touching the store so cooperative
//! interleavings are exercisable from a current-thread runtime.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{Local, Utc};
use clinboard_core::backend::{
    ClinicalBackend, NewTask, NewTaskGroup, TaskGroupPatch, TaskPatch,
};
use clinboard_core::error::{BackendError, CreateTaskError, GroupWriteError};
use clinboard_model::{
    group_state, AgendaItem, AgendaItemId, Code, CodeKind, Episode, EpisodeId, Patient, PatientId,
    StatusKey, Task, TaskClosure, TaskGroup, TaskGroupId, TaskId, UserId, UserRef,
};
use std::sync::Mutex;

/// Actor recorded on closures written by the fake backend.
pub const BACKEND_ACTOR: UserId = UserId(0);

#[derive(Debug, Default)]
struct Store {
    groups: Vec<TaskGroup>,
    tasks: Vec<Task>,
    agenda_items: Vec<AgendaItem>,
    patients: Vec<Patient>,
    users: Vec<UserRef>,
    codes: Vec<Code>,
    next_group_id: u64,
    next_task_id: u64,
    created_tasks: u64,
}

#[derive(Debug, Default)]
struct Faults {
    fail_next_list_task_groups: bool,
    close_on_create_task: Vec<TaskGroupId>,
    reject_valid_agenda_links: u32,
}

/// In-memory clinical backend for tests
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    store: Mutex<Store>,
    faults: Mutex<Faults>,
}

impl InMemoryBackend {
    /// Empty backend; seed it before use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_patient(&self, patient: Patient) {
        self.store.lock().unwrap().patients.push(patient);
    }

    pub fn seed_group(&self, group: TaskGroup) {
        let mut store = self.store.lock().unwrap();
        store.next_group_id = store.next_group_id.max(group.id.0 + 1);
        store.groups.push(group);
    }

    pub fn seed_task(&self, task: Task) {
        let mut store = self.store.lock().unwrap();
        store.next_task_id = store.next_task_id.max(task.id.0 + 1);
        store.tasks.push(task);
    }

    pub fn seed_agenda_item(&self, item: AgendaItem) {
        self.store.lock().unwrap().agenda_items.push(item);
    }

    pub fn seed_user(&self, user: UserRef) {
        self.store.lock().unwrap().users.push(user);
    }

    pub fn seed_code(&self, code: Code) {
        self.store.lock().unwrap().codes.push(code);
    }

    /// The next `list_task_groups` call fails with a transport error.
    pub fn fail_next_list_task_groups(&self) {
        self.faults.lock().unwrap().fail_next_list_task_groups = true;
    }

    /// The next `create_task` against this group closes it first and
    /// reports the closed-group race, exactly once per armed id.
    pub fn close_group_on_next_create_task(&self, group_id: TaskGroupId) {
        self.faults.lock().unwrap().close_on_create_task.push(group_id);
    }

    /// The next `count` group writes carrying an otherwise-valid agenda
    /// link are rejected anyway, as if the agenda moved between
    /// resolution and write.
    pub fn reject_valid_agenda_links(&self, count: u32) {
        self.faults.lock().unwrap().reject_valid_agenda_links = count;
    }

    /// All stored tasks, in creation order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.store.lock().unwrap().tasks.clone()
    }

    /// All stored groups, in creation order.
    #[must_use]
    pub fn groups(&self) -> Vec<TaskGroup> {
        self.store.lock().unwrap().groups.clone()
    }

    /// One stored task.
    #[must_use]
    pub fn task(&self, task_id: TaskId) -> Option<Task> {
        self.store
            .lock()
            .unwrap()
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
    }

    /// One stored group.
    #[must_use]
    pub fn group(&self, group_id: TaskGroupId) -> Option<TaskGroup> {
        self.store
            .lock()
            .unwrap()
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .cloned()
    }

    /// Number of tasks successfully created through the trait.
    #[must_use]
    pub fn created_task_count(&self) -> u64 {
        self.store.lock().unwrap().created_tasks
    }

    fn validate_agenda_link(
        store: &Store,
        agenda_item_id: AgendaItemId,
        episode_id: Option<EpisodeId>,
    ) -> Result<(), GroupWriteError> {
        let known = store
            .agenda_items
            .iter()
            .find(|item| item.id == agenda_item_id);
        match known {
            Some(item) if Some(item.episode_id) == episode_id => Ok(()),
            _ => Err(GroupWriteError::StaleAgendaLink),
        }
    }

    fn take_forced_link_rejection(&self) -> Result<(), GroupWriteError> {
        let mut faults = self.faults.lock().unwrap();
        if faults.reject_valid_agenda_links > 0 {
            faults.reject_valid_agenda_links -= 1;
            return Err(GroupWriteError::StaleAgendaLink);
        }
        Ok(())
    }

    fn cancel_all_tasks_of(store: &mut Store, group_id: TaskGroupId) {
        for task in store
            .tasks
            .iter_mut()
            .filter(|t| t.group_id == group_id && !t.is_done() && !t.is_cancelled())
        {
            task.status = StatusKey::Cancelled;
            task.closure = Some(TaskClosure {
                at: Utc::now(),
                by: BACKEND_ACTOR,
            });
        }
    }
}

#[async_trait]
impl ClinicalBackend for InMemoryBackend {
    async fn list_task_groups(
        &self,
        patient_id: PatientId,
        episode_id: Option<EpisodeId>,
    ) -> Result<Vec<TaskGroup>, BackendError> {
        tokio::task::yield_now().await;
        if std::mem::take(&mut self.faults.lock().unwrap().fail_next_list_task_groups) {
            return Err(BackendError::Request("injected failure".to_string()));
        }
        let store = self.store.lock().unwrap();
        Ok(store
            .groups
            .iter()
            .filter(|g| {
                g.patient_id == patient_id
                    && episode_id.map_or(true, |e| g.episode_id == Some(e))
            })
            .cloned()
            .collect())
    }

    async fn list_tasks(
        &self,
        group_id: TaskGroupId,
        statuses: &[StatusKey],
    ) -> Result<Vec<Task>, BackendError> {
        tokio::task::yield_now().await;
        let store = self.store.lock().unwrap();
        Ok(store
            .tasks
            .iter()
            .filter(|t| t.group_id == group_id && statuses.contains(&t.status))
            .cloned()
            .collect())
    }

    async fn create_task_group(&self, request: NewTaskGroup) -> Result<TaskGroup, GroupWriteError> {
        tokio::task::yield_now().await;
        let mut store = self.store.lock().unwrap();
        if let Some(agenda_item_id) = request.agenda_item_id {
            Self::validate_agenda_link(&store, agenda_item_id, request.episode_id)?;
            self.take_forced_link_rejection()?;
        }
        let id = TaskGroupId(store.next_group_id.max(1));
        store.next_group_id = id.0 + 1;
        let mut group = TaskGroup::new(id, request.name, request.patient_id);
        group.episode_id = request.episode_id;
        group.phase_id = request.phase_id;
        group.agenda_item_id = request.agenda_item_id;
        store.groups.push(group.clone());
        Ok(group)
    }

    async fn update_task_group(
        &self,
        group_id: TaskGroupId,
        patch: TaskGroupPatch,
    ) -> Result<TaskGroup, GroupWriteError> {
        tokio::task::yield_now().await;
        let mut store = self.store.lock().unwrap();
        if let Some(Some(agenda_item_id)) = patch.agenda_item_id {
            let episode_id = store
                .groups
                .iter()
                .find(|g| g.id == group_id)
                .and_then(|g| g.episode_id);
            Self::validate_agenda_link(&store, agenda_item_id, episode_id)?;
            self.take_forced_link_rejection()?;
        }
        let group = store
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| BackendError::NotFound(group_id.to_string()))?;
        if let Some(name) = patch.name {
            group.name = name;
        }
        if let Some(agenda_item_id) = patch.agenda_item_id {
            group.agenda_item_id = agenda_item_id;
        }
        Ok(group.clone())
    }

    async fn create_task(&self, request: NewTask) -> Result<Task, CreateTaskError> {
        tokio::task::yield_now().await;
        let mut store = self.store.lock().unwrap();
        {
            let mut faults = self.faults.lock().unwrap();
            if let Some(idx) = faults
                .close_on_create_task
                .iter()
                .position(|&g| g == request.group_id)
            {
                faults.close_on_create_task.remove(idx);
                Self::cancel_all_tasks_of(&mut store, request.group_id);
                return Err(CreateTaskError::ClosedGroup(request.group_id));
            }
        }
        let today = Local::now().date_naive();
        let existing: Vec<Task> = store
            .tasks
            .iter()
            .filter(|t| t.group_id == request.group_id)
            .cloned()
            .collect();
        if group_state(&existing, today).is_closed() {
            return Err(CreateTaskError::ClosedGroup(request.group_id));
        }
        let id = TaskId(store.next_task_id.max(1));
        store.next_task_id = id.0 + 1;
        let mut task = Task::new(id, request.group_id, request.description);
        task.due = request.due;
        task.priority = request.priority;
        task.assignee = request.assignee;
        task.comment = request.comment;
        store.tasks.push(task.clone());
        store.created_tasks += 1;
        Ok(task)
    }

    async fn update_task(&self, task_id: TaskId, patch: TaskPatch) -> Result<Task, BackendError> {
        tokio::task::yield_now().await;
        let mut store = self.store.lock().unwrap();
        let task = store
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| BackendError::NotFound(task_id.to_string()))?;
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(assignee) = patch.assignee {
            task.assignee = assignee;
        }
        if let Some(due) = patch.due {
            task.due = due;
        }
        if let Some(comment) = patch.comment {
            task.comment = comment;
        }
        if let Some(status) = patch.status {
            task.status = status;
            task.closure = match status {
                StatusKey::Pending => None,
                StatusKey::Completed | StatusKey::Cancelled => Some(TaskClosure {
                    at: Utc::now(),
                    by: BACKEND_ACTOR,
                }),
            };
        }
        Ok(task.clone())
    }

    async fn list_agenda_items(
        &self,
        episode_id: EpisodeId,
    ) -> Result<Vec<AgendaItem>, BackendError> {
        tokio::task::yield_now().await;
        let store = self.store.lock().unwrap();
        Ok(store
            .agenda_items
            .iter()
            .filter(|item| item.episode_id == episode_id)
            .copied()
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<UserRef>, BackendError> {
        tokio::task::yield_now().await;
        Ok(self.store.lock().unwrap().users.clone())
    }

    async fn list_codes(&self, kind: CodeKind) -> Result<Vec<Code>, BackendError> {
        tokio::task::yield_now().await;
        let store = self.store.lock().unwrap();
        Ok(store
            .codes
            .iter()
            .filter(|code| code.kind == kind)
            .cloned()
            .collect())
    }

    async fn get_patient(&self, patient_id: PatientId) -> Result<Patient, BackendError> {
        tokio::task::yield_now().await;
        let store = self.store.lock().unwrap();
        store
            .patients
            .iter()
            .find(|p| p.id == patient_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(patient_id.to_string()))
    }
}

/// Backend seeded with patient 7 / episode 3 and a small vocabulary.
#[must_use]
pub fn backend_with_patient() -> InMemoryBackend {
    let backend = InMemoryBackend::new();
    backend.seed_patient(Patient {
        id: PatientId(7),
        name: "Test Patient".to_string(),
        episodes: vec![Episode {
            id: EpisodeId(3),
            patient_id: PatientId(7),
            organ: Some("LIVER".to_string()),
        }],
    });
    backend.seed_user(UserRef {
        id: UserId(5),
        name: "Dr. Example".to_string(),
    });
    backend.seed_code(Code {
        kind: CodeKind::Organ,
        key: "LIVER".to_string(),
        label: "Liver".to_string(),
    });
    backend.seed_code(Code {
        kind: CodeKind::Phase,
        key: "4".to_string(),
        label: "Induction".to_string(),
    });
    backend
}
