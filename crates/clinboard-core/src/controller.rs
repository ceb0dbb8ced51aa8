//! Board controller
//!
//! One `TaskBoard` instance backs one board screen. It owns the loaded
//! snapshot, the superseded-load generation counter, the provisioning
//! in-flight guard and the edit/close/rename interaction state, all as
//! explicit fields, never ambient globals. The snapshot is written only
//! by the loader's commit step and by the mandatory reload after a
//! provisioning action.

use crate::backend::{ClinicalBackend, NewTask, TaskGroupPatch, TaskPatch};
use crate::error::{BoardError, CreateTaskError};
use crate::loader::{load_board, BoardData};
use crate::provision::{
    attach_agenda_item, create_group_for_context, default_task_description,
};
use crate::resolver::resolve_managed_group;
use crate::rows::{assemble_rows, BoardFilter, BoardRow};
use chrono::{Local, NaiveDate};
use clinboard_model::{
    ClinicalContext, Code, StatusKey, TaskGroupId, TaskId, UserRef,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-instance board configuration
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Initial filter settings
    pub filter: BoardFilter,
    /// Auto-create token value at mount; this value never triggers
    pub initial_auto_token: u64,
}

impl BoardConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With initial filter
    #[inline]
    #[must_use]
    pub fn with_filter(mut self, filter: BoardFilter) -> Self {
        self.filter = filter;
        self
    }

    /// With the externally owned auto-create token's mount value
    #[inline]
    #[must_use]
    pub fn with_auto_token(mut self, token: u64) -> Self {
        self.initial_auto_token = token;
        self
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            filter: BoardFilter::default(),
            initial_auto_token: 0,
        }
    }
}

/// What triggered a provisioning attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProvisionTrigger {
    /// The manual "add task" button
    Manual,
    /// The externally owned auto-create token changed
    AutoCreate,
}

/// Which terminal status a close prompt will write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Transition to COMPLETED
    Complete,
    /// Transition to CANCELLED
    Discard,
}

impl CloseKind {
    fn status(self) -> StatusKey {
        match self {
            CloseKind::Complete => StatusKey::Completed,
            CloseKind::Discard => StatusKey::Cancelled,
        }
    }
}

/// Pending complete-or-discard confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClosePrompt {
    task_id: TaskId,
    kind: CloseKind,
}

/// Reactive snapshot handed to the surrounding UI
#[derive(Debug, Clone)]
pub struct BoardView {
    /// A load is in flight
    pub loading: bool,
    /// Banner-level load error; prior rows are retained
    pub load_error: Option<String>,
    /// Error of the last failed action
    pub action_error: Option<String>,
    /// Render-ready rows
    pub rows: Vec<BoardRow>,
    /// Assignee filter options
    pub users: Vec<UserRef>,
    /// Organ filter options
    pub organs: Vec<Code>,
    /// Task currently in edit mode
    pub editing: Option<TaskId>,
    /// Group currently being renamed
    pub renaming: Option<TaskGroupId>,
}

/// Mutable board state behind the controller's lock
#[derive(Debug)]
struct BoardState {
    context: ClinicalContext,
    filter: BoardFilter,
    data: BoardData,
    loading: bool,
    load_error: Option<String>,
    action_error: Option<String>,
    preferred_group: Option<TaskGroupId>,
    editing: Option<TaskId>,
    close_prompt: Option<ClosePrompt>,
    renaming: Option<TaskGroupId>,
    /// Auto-created and not yet confirmed task
    auto_created: Option<TaskId>,
    auto_token: u64,
}

/// Stateful controller for one board instance
pub struct TaskBoard {
    backend: Arc<dyn ClinicalBackend>,
    state: Mutex<BoardState>,
    /// Bumped per load; a load commits only if unchanged since its start
    generation: AtomicU64,
    /// Serializes provisioning; concurrent triggers collapse to one
    provisioning: AtomicBool,
}

impl TaskBoard {
    /// Create a board for one clinical context
    #[must_use]
    pub fn new(
        backend: Arc<dyn ClinicalBackend>,
        context: ClinicalContext,
        config: BoardConfig,
    ) -> Self {
        Self {
            backend,
            state: Mutex::new(BoardState {
                context,
                filter: config.filter,
                data: BoardData::default(),
                loading: false,
                load_error: None,
                action_error: None,
                preferred_group: None,
                editing: None,
                close_prompt: None,
                renaming: None,
                auto_created: None,
                auto_token: config.initial_auto_token,
            }),
            generation: AtomicU64::new(0),
            provisioning: AtomicBool::new(false),
        }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Current reactive snapshot for the surrounding UI.
    pub async fn view(&self) -> BoardView {
        let state = self.state.lock().await;
        BoardView {
            loading: state.loading,
            load_error: state.load_error.clone(),
            action_error: state.action_error.clone(),
            rows: assemble_rows(
                &state.data,
                &state.filter,
                state.preferred_group,
                Self::today(),
            ),
            users: state.data.users.clone(),
            organs: state.data.organs.clone(),
            editing: state.editing,
            renaming: state.renaming,
        }
    }

    /// Reload the snapshot for the current context
    ///
    /// A load that finishes after a newer one has started discards its
    /// result; staleness is advisory, never an abort.
    pub async fn reload(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (context, statuses) = {
            let mut state = self.state.lock().await;
            state.loading = true;
            (state.context, state.filter.statuses())
        };

        let result = load_board(self.backend.as_ref(), &context, &statuses).await;

        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "discarding superseded load");
            return;
        }
        state.loading = false;
        match result {
            Ok(data) => {
                tracing::info!(groups = data.groups.len(), "board loaded");
                state.data = data;
                state.load_error = None;
            }
            Err(error) => {
                tracing::error!(%error, "board load failed");
                state.load_error = Some(BoardError::Load(error).to_string());
            }
        }
    }

    /// Switch to a new clinical context and reload.
    pub async fn set_context(&self, context: ClinicalContext) {
        {
            let mut state = self.state.lock().await;
            state.context = context;
            state.preferred_group = None;
        }
        self.reload().await;
    }

    /// Replace the filter settings, reloading when the fetched status
    /// set changes.
    pub async fn set_filter(&self, filter: BoardFilter) {
        let needs_reload = {
            let mut state = self.state.lock().await;
            let changed = filter.statuses() != state.filter.statuses();
            state.filter = filter;
            changed
        };
        if needs_reload {
            self.reload().await;
        }
    }

    /// Manual "add task": provision a group for the context and create
    /// the first task in it.
    pub async fn add_task(&self) {
        self.provision(ProvisionTrigger::Manual).await;
    }

    /// Observe the externally owned auto-create token
    ///
    /// Every distinct value triggers exactly one provisioning attempt;
    /// the mount value never triggers, and a repeated value is ignored.
    pub async fn observe_auto_token(&self, token: u64) {
        let changed = {
            let mut state = self.state.lock().await;
            if state.auto_token == token {
                false
            } else {
                state.auto_token = token;
                true
            }
        };
        if changed {
            self.provision(ProvisionTrigger::AutoCreate).await;
        }
    }

    async fn provision(&self, trigger: ProvisionTrigger) {
        if self.provisioning.swap(true, Ordering::SeqCst) {
            tracing::debug!(?trigger, "provisioning already in flight; trigger collapsed");
            return;
        }
        let result = self.provision_inner(trigger).await;
        self.provisioning.store(false, Ordering::SeqCst);

        match result {
            Ok(Some(task_id)) => {
                tracing::info!(%task_id, "task provisioned");
                self.reload().await;
            }
            Ok(None) => {
                // No patient in context: silently a no-op.
            }
            Err(error) => {
                tracing::error!(%error, "provisioning failed");
                self.state.lock().await.action_error = Some(error.to_string());
            }
        }
    }

    /// The provisioning algorithm proper
    ///
    /// Resolve a reusable group (repairing a missing agenda link), else
    /// create one; then create the first task, falling back to a fresh
    /// group exactly once when the target was closed concurrently.
    async fn provision_inner(
        &self,
        trigger: ProvisionTrigger,
    ) -> Result<Option<TaskId>, BoardError> {
        let today = Self::today();
        let (context, data) = {
            let state = self.state.lock().await;
            (state.context, state.data.clone())
        };
        let Some(patient_id) = context.patient_id else {
            return Ok(None);
        };

        let resolved = resolve_managed_group(&context, &data, today).cloned();
        let group = match resolved {
            Some(group) => match (group.agenda_item_id, context.agenda_item_id) {
                (None, Some(agenda_item_id)) => {
                    attach_agenda_item(self.backend.as_ref(), group.id, agenda_item_id, &context)
                        .await?
                }
                _ => group,
            },
            None => create_group_for_context(self.backend.as_ref(), patient_id, &context).await?,
        };
        self.state.lock().await.preferred_group = Some(group.id);

        let phase_name = context
            .phase_id
            .and_then(|id| data.phase_label(id))
            .map(str::to_owned);
        let request = NewTask::new(
            group.id,
            default_task_description(patient_id, &context, phase_name.as_deref()),
        )
        .with_due(today);

        let task = match self.backend.create_task(request.clone()).await {
            Ok(task) => task,
            Err(CreateTaskError::ClosedGroup(group_id)) => {
                tracing::warn!(%group_id, "target group closed concurrently; provisioning a fresh group");
                let fresh =
                    create_group_for_context(self.backend.as_ref(), patient_id, &context).await?;
                self.state.lock().await.preferred_group = Some(fresh.id);
                self.backend
                    .create_task(NewTask {
                        group_id: fresh.id,
                        ..request
                    })
                    .await
                    .map_err(BoardError::from)?
            }
            Err(other) => return Err(other.into()),
        };

        let mut state = self.state.lock().await;
        state.editing = Some(task.id);
        if trigger == ProvisionTrigger::AutoCreate {
            state.auto_created = Some(task.id);
        }
        state.action_error = None;
        Ok(Some(task.id))
    }

    /// Enter edit mode on a task.
    pub async fn start_edit(&self, task_id: TaskId) {
        self.state.lock().await.editing = Some(task_id);
    }

    /// Save the edited task and reload.
    pub async fn save_edit(&self, patch: TaskPatch) {
        let Some(task_id) = ({ self.state.lock().await.editing }) else {
            return;
        };
        match self.backend.update_task(task_id, patch).await {
            Ok(_) => {
                {
                    let mut state = self.state.lock().await;
                    state.editing = None;
                    if state.auto_created == Some(task_id) {
                        // Confirmed: no longer subject to cancel-on-dismiss.
                        state.auto_created = None;
                    }
                    state.action_error = None;
                }
                self.reload().await;
            }
            Err(error) => {
                self.state.lock().await.action_error = Some(error.to_string());
            }
        }
    }

    /// Dismiss the edit
    ///
    /// An auto-created task dismissed without saving is transitioned to
    /// CANCELLED rather than left as an orphaned pending item.
    pub async fn cancel_edit(&self) {
        let cancel_target = {
            let mut state = self.state.lock().await;
            let Some(task_id) = state.editing.take() else {
                return;
            };
            if state.auto_created == Some(task_id) {
                state.auto_created = None;
                Some(task_id)
            } else {
                None
            }
        };
        if let Some(task_id) = cancel_target {
            tracing::info!(%task_id, "cancelling dismissed auto-created task");
            match self
                .backend
                .update_task(task_id, TaskPatch::status(StatusKey::Cancelled))
                .await
            {
                Ok(_) => self.reload().await,
                Err(error) => {
                    self.state.lock().await.action_error = Some(error.to_string());
                }
            }
        }
    }

    /// Open the complete-or-discard confirmation for a task.
    pub async fn start_close(&self, task_id: TaskId, kind: CloseKind) {
        self.state.lock().await.close_prompt = Some(ClosePrompt { task_id, kind });
    }

    /// Confirm the pending complete-or-discard and reload.
    pub async fn confirm_close(&self) {
        let Some(prompt) = ({ self.state.lock().await.close_prompt.take() }) else {
            return;
        };
        match self
            .backend
            .update_task(prompt.task_id, TaskPatch::status(prompt.kind.status()))
            .await
        {
            Ok(_) => {
                self.state.lock().await.action_error = None;
                self.reload().await;
            }
            Err(error) => {
                self.state.lock().await.action_error = Some(error.to_string());
            }
        }
    }

    /// Dismiss the complete-or-discard confirmation.
    pub async fn cancel_close(&self) {
        self.state.lock().await.close_prompt = None;
    }

    /// Enter rename mode on a group.
    pub async fn start_rename(&self, group_id: TaskGroupId) {
        self.state.lock().await.renaming = Some(group_id);
    }

    /// Save the group rename and reload.
    pub async fn save_rename(&self, name: String) {
        let Some(group_id) = ({ self.state.lock().await.renaming.take() }) else {
            return;
        };
        match self
            .backend
            .update_task_group(group_id, TaskGroupPatch::rename(name))
            .await
        {
            Ok(_) => {
                self.state.lock().await.action_error = None;
                self.reload().await;
            }
            Err(error) => {
                self.state.lock().await.action_error =
                    Some(BoardError::from(error).to_string());
            }
        }
    }

    /// Dismiss the rename.
    pub async fn cancel_rename(&self) {
        self.state.lock().await.renaming = None;
    }
}

impl std::fmt::Debug for TaskBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBoard")
            .field("generation", &self.generation)
            .field("provisioning", &self.provisioning)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = BoardConfig::new()
            .with_auto_token(5)
            .with_filter(BoardFilter {
                show_completed: true,
                ..BoardFilter::default()
            });
        assert_eq!(config.initial_auto_token, 5);
        assert!(config.filter.show_completed);
    }

    #[test]
    fn close_kind_maps_to_status() {
        assert_eq!(CloseKind::Complete.status(), StatusKey::Completed);
        assert_eq!(CloseKind::Discard.status(), StatusKey::Cancelled);
    }
}
