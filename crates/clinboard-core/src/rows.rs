//! Board assembly
//!
//! Merges the loaded snapshot with the filter settings into a flat,
//! render-ready row sequence. Groups are independent sections: an
//! optional heading row followed by the group's surviving tasks, with
//! empty sections dropped entirely.

use crate::loader::BoardData;
use chrono::NaiveDate;
use clinboard_model::{
    sort_for_display, GroupState, StatusKey, Task, TaskGroup, TaskGroupId, UserId,
};

/// Board filter settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardFilter {
    /// Only show groups whose episode carries this organ code
    pub organ: Option<String>,
    /// Only show tasks assigned to this user
    pub assignee: Option<UserId>,
    /// Only show tasks due on or before this date
    pub due_before: Option<NaiveDate>,
    /// Include completed tasks
    pub show_completed: bool,
    /// Include cancelled tasks
    pub show_cancelled: bool,
    /// Emit a heading row per group
    pub show_group_headings: bool,
}

impl Default for BoardFilter {
    fn default() -> Self {
        Self {
            organ: None,
            assignee: None,
            due_before: None,
            show_completed: false,
            show_cancelled: false,
            show_group_headings: true,
        }
    }
}

impl BoardFilter {
    /// Status keys the loader should fetch under this filter
    ///
    /// Hidden terminal statuses are not fetched at all.
    #[must_use]
    pub fn statuses(&self) -> Vec<StatusKey> {
        let mut statuses = vec![StatusKey::Pending];
        if self.show_completed {
            statuses.push(StatusKey::Completed);
        }
        if self.show_cancelled {
            statuses.push(StatusKey::Cancelled);
        }
        statuses
    }

    /// Task-level visibility under this filter.
    fn is_visible(&self, task: &Task) -> bool {
        if task.is_done() && !self.show_completed {
            return false;
        }
        if task.is_cancelled() && !self.show_cancelled {
            return false;
        }
        if let Some(assignee) = self.assignee {
            if task.assignee != Some(assignee) {
                return false;
            }
        }
        if let Some(limit) = self.due_before {
            match task.due {
                Some(due) if due <= limit => {}
                _ => return false,
            }
        }
        true
    }
}

/// One render-ready row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardRow {
    /// Heading of a group section
    GroupHeading {
        /// The group
        group: TaskGroup,
        /// Its derived state
        state: GroupState,
    },
    /// One task of the preceding group
    Task(Task),
}

/// Assemble the flat row sequence
///
/// The preferred group (the one provisioning last targeted) sorts
/// first; everything else follows by id ascending.
#[must_use]
pub fn assemble_rows(
    data: &BoardData,
    filter: &BoardFilter,
    preferred: Option<TaskGroupId>,
    today: NaiveDate,
) -> Vec<BoardRow> {
    let mut groups: Vec<&TaskGroup> = data.groups.iter().collect();
    groups.sort_by_key(|g| (Some(g.id) != preferred, g.id));

    let mut rows = Vec::new();
    for group in groups {
        if let Some(organ) = filter.organ.as_deref() {
            let matches = group
                .episode_id
                .and_then(|id| data.episodes.get(&id))
                .and_then(|episode| episode.organ.as_deref())
                .is_some_and(|code| code == organ);
            if !matches {
                continue;
            }
        }

        let mut tasks: Vec<Task> = data
            .tasks_of(group.id)
            .iter()
            .filter(|task| filter.is_visible(task))
            .cloned()
            .collect();
        if tasks.is_empty() {
            // No empty group headers.
            continue;
        }
        sort_for_display(&mut tasks, today);

        if filter.show_group_headings {
            rows.push(BoardRow::GroupHeading {
                group: group.clone(),
                state: data.group_state(group.id, today),
            });
        }
        rows.extend(tasks.into_iter().map(BoardRow::Task));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinboard_model::{
        Episode, EpisodeId, PatientId, PriorityKey, StatusKey, TaskClosure, TaskId, UserId,
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn group(id: u64) -> TaskGroup {
        TaskGroup::new(TaskGroupId(id), "g", PatientId(7)).with_episode(EpisodeId(3))
    }

    fn task(id: u64, group: u64) -> Task {
        Task::new(TaskId(id), TaskGroupId(group), "t")
    }

    fn data_with(groups: Vec<TaskGroup>, tasks: Vec<Task>) -> BoardData {
        let mut data = BoardData {
            groups,
            ..BoardData::default()
        };
        for task in tasks {
            data.tasks.entry(task.group_id).or_default().push(task);
        }
        data
    }

    fn task_ids(rows: &[BoardRow]) -> Vec<TaskId> {
        rows.iter()
            .filter_map(|row| match row {
                BoardRow::Task(task) => Some(task.id),
                BoardRow::GroupHeading { .. } => None,
            })
            .collect()
    }

    #[test]
    fn heading_then_tasks_per_group() {
        let data = data_with(vec![group(1)], vec![task(1, 1), task(2, 1)]);
        let rows = assemble_rows(&data, &BoardFilter::default(), None, today());
        assert_eq!(rows.len(), 3);
        assert!(matches!(rows[0], BoardRow::GroupHeading { .. }));
        assert_eq!(task_ids(&rows), vec![TaskId(1), TaskId(2)]);
    }

    #[test]
    fn headings_can_be_disabled() {
        let data = data_with(vec![group(1)], vec![task(1, 1)]);
        let filter = BoardFilter {
            show_group_headings: false,
            ..BoardFilter::default()
        };
        let rows = assemble_rows(&data, &filter, None, today());
        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0], BoardRow::Task(_)));
    }

    #[test]
    fn empty_groups_emit_nothing() {
        let data = data_with(vec![group(1), group(2)], vec![task(1, 2)]);
        let rows = assemble_rows(&data, &BoardFilter::default(), None, today());
        assert_eq!(rows.len(), 2);
        assert_eq!(task_ids(&rows), vec![TaskId(1)]);
    }

    #[test]
    fn preferred_group_sorts_first() {
        let data = data_with(
            vec![group(1), group(2)],
            vec![task(1, 1), task(2, 2)],
        );
        let rows = assemble_rows(
            &data,
            &BoardFilter::default(),
            Some(TaskGroupId(2)),
            today(),
        );
        assert_eq!(task_ids(&rows), vec![TaskId(2), TaskId(1)]);
    }

    #[test]
    fn organ_filter_skips_whole_groups() {
        let mut data = data_with(vec![group(1), group(2)], vec![task(1, 1), task(2, 2)]);
        data.episodes.insert(
            EpisodeId(3),
            Episode {
                id: EpisodeId(3),
                patient_id: PatientId(7),
                organ: Some("LIVER".to_string()),
            },
        );
        // Group 2 points at an episode missing from the lookup.
        data.groups[1].episode_id = Some(EpisodeId(4));

        let filter = BoardFilter {
            organ: Some("LIVER".to_string()),
            ..BoardFilter::default()
        };
        let rows = assemble_rows(&data, &filter, None, today());
        assert_eq!(task_ids(&rows), vec![TaskId(1)]);
    }

    #[test]
    fn terminal_statuses_hidden_by_default() {
        let closure = Some(TaskClosure {
            at: chrono::Utc::now(),
            by: UserId(1),
        });
        let data = data_with(
            vec![group(1)],
            vec![
                task(1, 1),
                task(2, 1).with_status(StatusKey::Completed, closure.clone()),
                task(3, 1).with_status(StatusKey::Cancelled, closure),
            ],
        );
        let rows = assemble_rows(&data, &BoardFilter::default(), None, today());
        assert_eq!(task_ids(&rows), vec![TaskId(1)]);

        let show_all = BoardFilter {
            show_completed: true,
            show_cancelled: true,
            ..BoardFilter::default()
        };
        assert_eq!(task_ids(&assemble_rows(&data, &show_all, None, today())).len(), 3);
    }

    #[test]
    fn assignee_and_due_before_filters() {
        let data = data_with(
            vec![group(1)],
            vec![
                task(1, 1)
                    .with_assignee(UserId(5))
                    .with_due(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()),
                task(2, 1).with_assignee(UserId(6)),
                task(3, 1).with_assignee(UserId(5)),
            ],
        );
        let filter = BoardFilter {
            assignee: Some(UserId(5)),
            due_before: Some(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()),
            ..BoardFilter::default()
        };
        // Undated tasks never pass a due-before filter.
        let rows = assemble_rows(&data, &filter, None, today());
        assert_eq!(task_ids(&rows), vec![TaskId(1)]);
    }

    #[test]
    fn tasks_sorted_within_group() {
        let data = data_with(
            vec![group(1)],
            vec![
                task(2, 1),
                task(1, 1).with_priority(PriorityKey::High),
            ],
        );
        let rows = assemble_rows(&data, &BoardFilter::default(), None, today());
        assert_eq!(task_ids(&rows), vec![TaskId(1), TaskId(2)]);
    }

    #[test]
    fn statuses_follow_visibility_flags() {
        let filter = BoardFilter::default();
        assert_eq!(filter.statuses(), vec![StatusKey::Pending]);

        let all = BoardFilter {
            show_completed: true,
            show_cancelled: true,
            ..BoardFilter::default()
        };
        assert_eq!(
            all.statuses(),
            vec![StatusKey::Pending, StatusKey::Completed, StatusKey::Cancelled]
        );
    }
}
