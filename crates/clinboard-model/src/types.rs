//! Core types for the clinical task board
//!
//! Defines the persistent entities owned by the backend:
//! - Tasks and task groups
//! - The clinical context used to locate or create groups
//! - Reference vocabularies (users, codes, patients, agenda items)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Backend-assigned task identifier; lower ids are older.
    TaskId, "T#"
);
numeric_id!(
    /// Backend-assigned task group identifier; lower ids are older.
    TaskGroupId, "G#"
);
numeric_id!(
    /// Patient identifier.
    PatientId, "P#"
);
numeric_id!(
    /// Episode (care period) identifier.
    EpisodeId, "E#"
);
numeric_id!(
    /// Meeting agenda item identifier.
    AgendaItemId, "A#"
);
numeric_id!(
    /// Colloquium meeting identifier.
    MeetingId, "M#"
);
numeric_id!(
    /// Treatment phase identifier.
    PhaseId, "PH#"
);
numeric_id!(
    /// User (clinician) identifier.
    UserId, "U#"
);
numeric_id!(
    /// Task group template identifier.
    TemplateId, "TPL#"
);

/// Task status, identified by a stable key
///
/// Display labels live in the status-code vocabulary, never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusKey {
    /// Open work
    Pending,
    /// Finished work
    Completed,
    /// Abandoned work (a status transition, never a deletion)
    Cancelled,
}

impl StatusKey {
    /// All defined status keys, in display order.
    pub const ALL: [StatusKey; 3] = [StatusKey::Pending, StatusKey::Completed, StatusKey::Cancelled];
}

/// Task priority key, ranked HIGH > NORMAL > LOW
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityKey {
    /// Highest priority; makes an open task urgent
    High,
    /// Default priority
    Normal,
    /// Lowest priority
    Low,
}

impl PriorityKey {
    /// Sort rank: HIGH=0, NORMAL=1, LOW=2.
    #[inline]
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            PriorityKey::High => 0,
            PriorityKey::Normal => 1,
            PriorityKey::Low => 2,
        }
    }
}

/// Sort rank of an optional priority; unset ranks after LOW.
#[inline]
#[must_use]
pub fn priority_rank(priority: Option<PriorityKey>) -> u8 {
    priority.map_or(3, PriorityKey::rank)
}

/// Closing metadata, set only on transition to COMPLETED/CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskClosure {
    /// When the task was closed
    pub at: DateTime<Utc>,
    /// Who closed it
    pub by: UserId,
}

/// An atomic unit of work inside a task group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier
    pub id: TaskId,
    /// Owning group
    pub group_id: TaskGroupId,
    /// Free-text description
    pub description: String,
    /// Optional priority
    pub priority: Option<PriorityKey>,
    /// Optional assignee
    pub assignee: Option<UserId>,
    /// Optional due date (date-only)
    pub due: Option<NaiveDate>,
    /// Status key
    pub status: StatusKey,
    /// Free-text comment
    pub comment: String,
    /// Closing metadata; present iff status is COMPLETED or CANCELLED
    pub closure: Option<TaskClosure>,
}

impl Task {
    /// Create a new pending task
    #[inline]
    #[must_use]
    pub fn new(id: TaskId, group_id: TaskGroupId, description: impl Into<String>) -> Self {
        Self {
            id,
            group_id,
            description: description.into(),
            priority: None,
            assignee: None,
            due: None,
            status: StatusKey::Pending,
            comment: String::new(),
            closure: None,
        }
    }

    /// With priority
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: PriorityKey) -> Self {
        self.priority = Some(priority);
        self
    }

    /// With assignee
    #[inline]
    #[must_use]
    pub fn with_assignee(mut self, assignee: UserId) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// With due date
    #[inline]
    #[must_use]
    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }

    /// With status and matching closure
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: StatusKey, closure: Option<TaskClosure>) -> Self {
        self.status = status;
        self.closure = closure;
        self
    }

    /// With comment
    #[inline]
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Closing metadata must be present iff the task is closed.
    #[inline]
    #[must_use]
    pub fn closing_metadata_consistent(&self) -> bool {
        let closed = matches!(self.status, StatusKey::Completed | StatusKey::Cancelled);
        closed == self.closure.is_some()
    }
}

/// A named bucket of tasks scoped to a clinical context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGroup {
    /// Group identifier
    pub id: TaskGroupId,
    /// Display name
    pub name: String,
    /// Owning patient
    pub patient_id: PatientId,
    /// Optional episode reference
    pub episode_id: Option<EpisodeId>,
    /// Optional treatment-phase reference; meaningful only with an episode
    pub phase_id: Option<PhaseId>,
    /// Optional link to a meeting agenda item
    pub agenda_item_id: Option<AgendaItemId>,
    /// Optional template; `None` marks the group context-managed
    pub template_id: Option<TemplateId>,
}

impl TaskGroup {
    /// Create a new ad-hoc group for a patient
    #[inline]
    #[must_use]
    pub fn new(id: TaskGroupId, name: impl Into<String>, patient_id: PatientId) -> Self {
        Self {
            id,
            name: name.into(),
            patient_id,
            episode_id: None,
            phase_id: None,
            agenda_item_id: None,
            template_id: None,
        }
    }

    /// With episode reference
    #[inline]
    #[must_use]
    pub fn with_episode(mut self, episode_id: EpisodeId) -> Self {
        self.episode_id = Some(episode_id);
        self
    }

    /// With treatment-phase reference
    #[inline]
    #[must_use]
    pub fn with_phase(mut self, phase_id: PhaseId) -> Self {
        self.phase_id = Some(phase_id);
        self
    }

    /// With agenda-item link
    #[inline]
    #[must_use]
    pub fn with_agenda_item(mut self, agenda_item_id: AgendaItemId) -> Self {
        self.agenda_item_id = Some(agenda_item_id);
        self
    }

    /// With template reference
    #[inline]
    #[must_use]
    pub fn with_template(mut self, template_id: TemplateId) -> Self {
        self.template_id = Some(template_id);
        self
    }

    /// A group with no template is eligible for ad-hoc task insertion.
    #[inline]
    #[must_use]
    pub fn is_context_managed(&self) -> bool {
        self.template_id.is_none()
    }
}

/// The (patient, episode, agenda item, phase) tuple used to locate or
/// create a task group
///
/// Not a persisted entity. The meeting reference is carried so a rejected
/// agenda link can be re-resolved against the current agenda.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClinicalContext {
    /// Patient; provisioning is a no-op without one
    pub patient_id: Option<PatientId>,
    /// Optional episode
    pub episode_id: Option<EpisodeId>,
    /// Optional meeting agenda item
    pub agenda_item_id: Option<AgendaItemId>,
    /// Meeting the agenda item belongs to
    pub meeting_id: Option<MeetingId>,
    /// Optional treatment phase; valid only with an episode
    pub phase_id: Option<PhaseId>,
}

impl ClinicalContext {
    /// Context with only a patient set
    #[inline]
    #[must_use]
    pub fn for_patient(patient_id: PatientId) -> Self {
        Self {
            patient_id: Some(patient_id),
            ..Self::default()
        }
    }

    /// With episode
    #[inline]
    #[must_use]
    pub fn with_episode(mut self, episode_id: EpisodeId) -> Self {
        self.episode_id = Some(episode_id);
        self
    }

    /// With agenda item and its meeting
    #[inline]
    #[must_use]
    pub fn with_agenda_item(mut self, agenda_item_id: AgendaItemId, meeting_id: MeetingId) -> Self {
        self.agenda_item_id = Some(agenda_item_id);
        self.meeting_id = Some(meeting_id);
        self
    }

    /// With treatment phase
    #[inline]
    #[must_use]
    pub fn with_phase(mut self, phase_id: PhaseId) -> Self {
        self.phase_id = Some(phase_id);
        self
    }
}

/// Reference entry for a user (clinician)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// User identifier
    pub id: UserId,
    /// Display name
    pub name: String,
}

/// Vocabulary kinds served by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeKind {
    /// Organ codes (episode classification, board filter)
    Organ,
    /// Priority display labels
    Priority,
    /// Task status display labels
    TaskStatus,
    /// Treatment phase display names
    Phase,
}

/// A coded vocabulary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    /// Vocabulary this entry belongs to
    pub kind: CodeKind,
    /// Stable key
    pub key: String,
    /// Display label
    pub label: String,
}

/// An episode (care period) of a patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Episode identifier
    pub id: EpisodeId,
    /// Owning patient
    pub patient_id: PatientId,
    /// Organ code key, if classified
    pub organ: Option<String>,
}

/// A patient record, with its episodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Patient identifier
    pub id: PatientId,
    /// Display name
    pub name: String,
    /// Episodes of this patient
    pub episodes: Vec<Episode>,
}

/// A meeting agenda item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaItem {
    /// Agenda item identifier
    pub id: AgendaItemId,
    /// Episode the item is scoped to
    pub episode_id: EpisodeId,
    /// Meeting the item belongs to
    pub meeting_id: MeetingId,
}
