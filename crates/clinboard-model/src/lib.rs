//! Clinboard Model - clinical task-board domain model
//!
//! The pure domain layer:
//! - Tasks, task groups and the clinical context that scopes them
//! - Reference vocabularies (users, codes, patients, agenda items)
//! - The status/urgency classifier and derived group state
//! - The deterministic display ordering
//!
//! No I/O and no async: everything here is computed from values, with the
//! current date passed in explicitly.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod ordering;
pub mod status;
pub mod types;

// Re-exports for convenience
pub use ordering::{compare_tasks, sort_for_display};
pub use status::{group_state, GroupState};
pub use types::{
    priority_rank, AgendaItem, AgendaItemId, ClinicalContext, Code, CodeKind, Episode, EpisodeId,
    MeetingId, Patient, PatientId, PhaseId, PriorityKey, StatusKey, Task, TaskClosure, TaskGroup,
    TaskGroupId, TaskId, TemplateId, UserId, UserRef,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};
    use proptest::prelude::*;

    fn base_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn arb_priority() -> impl Strategy<Value = Option<PriorityKey>> {
        prop_oneof![
            Just(None),
            Just(Some(PriorityKey::High)),
            Just(Some(PriorityKey::Normal)),
            Just(Some(PriorityKey::Low)),
        ]
    }

    fn arb_status() -> impl Strategy<Value = StatusKey> {
        prop_oneof![
            Just(StatusKey::Pending),
            Just(StatusKey::Completed),
            Just(StatusKey::Cancelled),
        ]
    }

    fn arb_task() -> impl Strategy<Value = Task> {
        (
            0u64..64,
            arb_priority(),
            proptest::option::of(-30i64..30),
            arb_status(),
        )
            .prop_map(|(id, priority, due_offset, status)| {
                let mut task = Task::new(TaskId(id), TaskGroupId(1), "generated");
                task.priority = priority;
                task.due = due_offset.map(|days| base_day() + Duration::days(days));
                task.status = status;
                if matches!(status, StatusKey::Completed | StatusKey::Cancelled) {
                    task.closure = Some(TaskClosure {
                        at: Utc::now(),
                        by: UserId(1),
                    });
                }
                task
            })
    }

    proptest! {
        #[test]
        fn urgency_dominates_group_state(tasks in proptest::collection::vec(arb_task(), 0..12)) {
            let state = group_state(&tasks, base_day());
            let any_urgent = tasks.iter().any(|t| t.is_urgent(base_day()));
            if any_urgent {
                prop_assert_eq!(state, GroupState::HighOpen);
            } else {
                prop_assert_ne!(state, GroupState::HighOpen);
            }
        }

        #[test]
        fn tasks_without_due_date_are_never_overdue(mut task in arb_task()) {
            task.due = None;
            prop_assert!(!task.is_overdue(base_day()));
        }

        #[test]
        fn sorting_is_idempotent(mut tasks in proptest::collection::vec(arb_task(), 0..16)) {
            sort_for_display(&mut tasks, base_day());
            let once = tasks.clone();
            sort_for_display(&mut tasks, base_day());
            prop_assert_eq!(tasks, once);
        }

        #[test]
        fn comparator_is_a_total_order(
            tasks in proptest::collection::vec(arb_task(), 3)
        ) {
            // Antisymmetry and transitivity over a sampled triple.
            let (a, b, c) = (&tasks[0], &tasks[1], &tasks[2]);
            let today = base_day();
            prop_assert_eq!(
                compare_tasks(a, b, today),
                compare_tasks(b, a, today).reverse()
            );
            if compare_tasks(a, b, today).is_le() && compare_tasks(b, c, today).is_le() {
                prop_assert!(compare_tasks(a, c, today).is_le());
            }
        }
    }
}
