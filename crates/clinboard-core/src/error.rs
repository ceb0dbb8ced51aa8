//! Error types for the board core
//!
//! Backend validation races carry typed variants rather than message
//! text, so the recover-once paths in provisioning can match on them
//! exhaustively.

use clinboard_model::TaskGroupId;

/// Transport-level backend failure
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// Network or server error
    #[error("backend request failed: {0}")]
    Request(String),

    /// Referenced record does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

/// Failure creating or updating a task group
#[derive(Debug, Clone, thiserror::Error)]
pub enum GroupWriteError {
    /// The agenda-item reference is unknown or mismatched with the
    /// episode. Recovered once by re-resolving the current agenda item.
    #[error("agenda item link rejected")]
    StaleAgendaLink,

    /// Any other backend failure
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Failure creating a task
#[derive(Debug, Clone, thiserror::Error)]
pub enum CreateTaskError {
    /// The target group was completed or discarded concurrently.
    /// Recovered once by provisioning a fresh group.
    #[error("task group {0} is closed")]
    ClosedGroup(TaskGroupId),

    /// The group's agenda-item link was rejected
    #[error("agenda item link rejected")]
    StaleAgendaLink,

    /// Any other backend failure
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Action-scoped error surfaced by the board controller
#[derive(Debug, Clone, thiserror::Error)]
pub enum BoardError {
    /// A load step failed; prior data is retained
    #[error("board load failed: {0}")]
    Load(#[source] BackendError),

    /// The agenda item could not be resolved for the current meeting,
    /// or was rejected a second time
    #[error("agenda item could not be resolved for the current meeting")]
    AgendaLinkConflict,

    /// The task group was closed again after the fresh-group retry
    #[error("task group was closed while adding the task")]
    GroupClosed,

    /// Any other backend failure
    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for BoardError {
    fn from(value: BackendError) -> Self {
        BoardError::Backend(value)
    }
}

impl From<GroupWriteError> for BoardError {
    fn from(value: GroupWriteError) -> Self {
        match value {
            GroupWriteError::StaleAgendaLink => BoardError::AgendaLinkConflict,
            GroupWriteError::Backend(e) => BoardError::Backend(e),
        }
    }
}

impl From<CreateTaskError> for BoardError {
    fn from(value: CreateTaskError) -> Self {
        match value {
            CreateTaskError::ClosedGroup(_) => BoardError::GroupClosed,
            CreateTaskError::StaleAgendaLink => BoardError::AgendaLinkConflict,
            CreateTaskError::Backend(e) => BoardError::Backend(e),
        }
    }
}
