//! Status/urgency classifier
//!
//! Pure functions deciding whether a task is done, cancelled, overdue or
//! urgent, and the derived state of a whole group. `today` is always an
//! explicit parameter; callers supply the local date once per operation.

use crate::types::{PriorityKey, StatusKey, Task};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Derived state of a task group, computed from its tasks
///
/// Never stored; recomputed from the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupState {
    /// No tasks, or the defensive fallback
    None,
    /// At least one urgent task
    HighOpen,
    /// Open but nothing urgent
    Pending,
    /// All tasks closed, at least one done
    Completed,
    /// All tasks cancelled
    Discarded,
}

impl GroupState {
    /// Closed groups must never receive new tasks.
    #[inline]
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, GroupState::Completed | GroupState::Discarded)
    }
}

impl Task {
    /// True iff the status key is COMPLETED.
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status == StatusKey::Completed
    }

    /// True iff the status key is CANCELLED.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == StatusKey::Cancelled
    }

    /// Date-only comparison: strictly before `today`. No due date is
    /// never overdue.
    #[inline]
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due.is_some_and(|due| due < today)
    }

    /// Open and either high priority or overdue.
    #[inline]
    #[must_use]
    pub fn is_urgent(&self, today: NaiveDate) -> bool {
        if self.is_done() || self.is_cancelled() {
            return false;
        }
        self.priority == Some(PriorityKey::High) || self.is_overdue(today)
    }
}

/// Derive the state of a group from its tasks
///
/// Rule order is significant: urgency dominates pending, which dominates
/// the terminal states.
#[must_use]
pub fn group_state(tasks: &[Task], today: NaiveDate) -> GroupState {
    if tasks.is_empty() {
        return GroupState::None;
    }
    if tasks.iter().any(|t| t.is_urgent(today)) {
        return GroupState::HighOpen;
    }
    if tasks.iter().any(|t| !t.is_done() && !t.is_cancelled()) {
        return GroupState::Pending;
    }
    if tasks.iter().all(Task::is_cancelled) {
        return GroupState::Discarded;
    }
    if tasks.iter().any(Task::is_done) {
        return GroupState::Completed;
    }
    // Unreachable given the ladder above.
    GroupState::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskClosure, TaskGroupId, TaskId, UserId};
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn task(id: u64) -> Task {
        Task::new(TaskId(id), TaskGroupId(1), "task")
    }

    fn closure() -> Option<TaskClosure> {
        Some(TaskClosure {
            at: Utc::now(),
            by: UserId(1),
        })
    }

    #[test]
    fn no_due_date_is_never_overdue() {
        assert!(!task(1).is_overdue(today()));
    }

    #[test]
    fn overdue_is_strictly_before_today() {
        let yesterday = today().pred_opt().unwrap();
        assert!(task(1).with_due(yesterday).is_overdue(today()));
        assert!(!task(2).with_due(today()).is_overdue(today()));
    }

    #[test]
    fn closed_tasks_are_never_urgent() {
        let yesterday = today().pred_opt().unwrap();
        let done = task(1)
            .with_priority(PriorityKey::High)
            .with_due(yesterday)
            .with_status(StatusKey::Completed, closure());
        assert!(!done.is_urgent(today()));

        let cancelled = task(2)
            .with_priority(PriorityKey::High)
            .with_status(StatusKey::Cancelled, closure());
        assert!(!cancelled.is_urgent(today()));
    }

    #[test]
    fn urgent_by_priority_or_overdue() {
        assert!(task(1).with_priority(PriorityKey::High).is_urgent(today()));
        let yesterday = today().pred_opt().unwrap();
        assert!(task(2).with_due(yesterday).is_urgent(today()));
        assert!(!task(3).with_priority(PriorityKey::Normal).is_urgent(today()));
    }

    #[test]
    fn empty_group_is_none() {
        assert_eq!(group_state(&[], today()), GroupState::None);
    }

    #[test]
    fn urgency_dominates_everything() {
        let tasks = vec![
            task(1)
                .with_status(StatusKey::Completed, closure()),
            task(2).with_priority(PriorityKey::High),
            task(3),
        ];
        assert_eq!(group_state(&tasks, today()), GroupState::HighOpen);
    }

    #[test]
    fn open_non_urgent_group_is_pending() {
        let tasks = vec![
            task(1).with_status(StatusKey::Completed, closure()),
            task(2),
        ];
        assert_eq!(group_state(&tasks, today()), GroupState::Pending);
    }

    #[test]
    fn all_cancelled_is_discarded() {
        let tasks = vec![
            task(1).with_status(StatusKey::Cancelled, closure()),
            task(2).with_status(StatusKey::Cancelled, closure()),
        ];
        assert_eq!(group_state(&tasks, today()), GroupState::Discarded);
    }

    #[test]
    fn closed_with_at_least_one_done_is_completed() {
        let tasks = vec![
            task(1).with_status(StatusKey::Completed, closure()),
            task(2).with_status(StatusKey::Cancelled, closure()),
        ];
        assert_eq!(group_state(&tasks, today()), GroupState::Completed);
    }

    #[test]
    fn closed_states_are_closed() {
        assert!(GroupState::Completed.is_closed());
        assert!(GroupState::Discarded.is_closed());
        assert!(!GroupState::HighOpen.is_closed());
        assert!(!GroupState::Pending.is_closed());
        assert!(!GroupState::None.is_closed());
    }
}
