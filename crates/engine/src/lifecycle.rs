//! The lifecycle orchestrator of `spec.md` §4.6: completing and reopening
//! tasks, each as a single store transaction.

use chrono::{DateTime, Datelike, Timelike, Utc};
use taskcurve_core::{Error, Result};

use crate::dependency;
use crate::model::{CompletionId, CompletionRecord, TaskId, TaskRecord, TaskStatus};
use crate::recurrence;
use crate::store::{self, Store};

#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub task: TaskRecord,
    pub completion_id: CompletionId,
    pub unblocked: Vec<TaskId>,
}

/// Completes `task_id` at `at` (defaulting to now). Non-recurring tasks
/// terminate into `Completed`; recurring tasks advance `next_due_at` and
/// remain `Open` (I4). Runs as a single store transaction, including the
/// dependents cascade.
pub fn complete(store: &Store, task_id: TaskId, at: Option<DateTime<Utc>>) -> Result<CompletionOutcome> {
    store.transaction(|data| {
        let mut task = data
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
        let completed_at = at.unwrap_or_else(Utc::now);

        let completion = store::insert_completion(
            data,
            CompletionRecord {
                id: CompletionId::new(1),
                task_id,
                completed_at,
                actual_minutes: None,
                scheduled_minutes: task.estimate_minutes,
                day_of_week: completed_at.weekday().num_days_from_sunday() as u8,
                hour_of_day: completed_at.hour() as u8,
            },
        )?;

        if let Some(pattern) = task.recurrence_pattern.clone() {
            let next_due = recurrence::next_due(&pattern, Some(completed_at), task.created_at, completed_at);
            task.last_completed_at = Some(completed_at);
            task.next_due_at = Some(next_due);
            task.status = TaskStatus::Open;
            tracing::debug!(task_id = %task_id, next_due = %next_due, "task advanced to next occurrence");
        } else {
            task.status = TaskStatus::Completed;
            task.last_completed_at = Some(completed_at);
            tracing::debug!(task_id = %task_id, "task completed");
        }
        task.updated_at = Utc::now();
        data.tasks.insert(task_id, task.clone());

        let graph = data
            .tasks
            .iter()
            .map(|(id, t)| (*id, t.dependencies.clone()))
            .collect();
        let unblocked = dependency::cascade_on_complete(task_id, &graph, |id| {
            data.tasks.get(&id).map(|t| t.status)
        });
        for id in &unblocked {
            if let Some(dependent) = data.tasks.get_mut(id) {
                dependent.status = TaskStatus::Open;
                dependent.updated_at = Utc::now();
            }
        }
        if !unblocked.is_empty() {
            tracing::debug!(task_id = %task_id, ?unblocked, "cascade unblocked dependents");
        }

        Ok(CompletionOutcome {
            task,
            completion_id: completion.id,
            unblocked,
        })
    })
}

/// Reopens a completed task, then re-resolves Blocked/Open per I3.
pub fn reopen(store: &Store, task_id: TaskId) -> Result<TaskRecord> {
    store.transaction(|data| {
        let mut task = data
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
        task.status = TaskStatus::Open;
        task.status = dependency::resolved_status(&task, |dep| data.tasks.get(&dep).map(|t| t.status));
        task.updated_at = Utc::now();
        data.tasks.insert(task_id, task.clone());
        tracing::debug!(task_id = %task_id, status = %task.status, "task reopened");
        Ok(task)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CurveConfig, TaskId};
    use indexmap::IndexSet;

    fn new_task() -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            id: TaskId::new(1),
            title: "water plants".into(),
            project: None,
            bucket_id: None,
            tags: IndexSet::new(),
            deadline: None,
            estimate_minutes: Some(10),
            recurrence_pattern: None,
            window_start: None,
            window_end: None,
            dependencies: Vec::new(),
            curve_config: CurveConfig::linear_default(now, None),
            status: TaskStatus::Open,
            last_completed_at: None,
            next_due_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn completing_nonrecurring_task_terminates_it() {
        let store = Store::new();
        let task = store.create_task(new_task()).unwrap();
        let outcome = complete(&store, task.id, None).unwrap();
        assert_eq!(outcome.task.status, TaskStatus::Completed);
    }

    #[test]
    fn completing_recurring_task_stays_open_with_new_due_date() {
        let store = Store::new();
        let mut task = new_task();
        task.recurrence_pattern = Some(crate::model::RecurrencePattern {
            mode: crate::model::RecurrenceMode::Calendar,
            kind: crate::model::RecurrenceKind::Daily,
            interval: None,
            unit: None,
            day_of_week: None,
            days_of_week: None,
            time_of_day: None,
            anchor: None,
        });
        let task = store.create_task(task).unwrap();
        let outcome = complete(&store, task.id, None).unwrap();
        assert_eq!(outcome.task.status, TaskStatus::Open);
        assert!(outcome.task.next_due_at.is_some());
    }

    #[test]
    fn completing_last_dependency_unblocks_dependent_in_same_transaction() {
        let store = Store::new();
        let dep = store.create_task(new_task()).unwrap();
        let mut dependent = new_task();
        dependent.title = "mow lawn".into();
        dependent.dependencies.push(dep.id);
        let dependent = store.create_task(dependent).unwrap();
        assert_eq!(dependent.status, TaskStatus::Blocked);

        let outcome = complete(&store, dep.id, None).unwrap();
        assert_eq!(outcome.unblocked, vec![dependent.id]);
        let refreshed = store.get_task(dependent.id).unwrap();
        assert_eq!(refreshed.status, TaskStatus::Open);
    }

    #[test]
    fn reopen_restores_blocked_status_when_dependency_incomplete() {
        let store = Store::new();
        let dep = store.create_task(new_task()).unwrap();
        complete(&store, dep.id, None).unwrap();
        let mut dependent = new_task();
        dependent.title = "second".into();
        dependent.dependencies.push(dep.id);
        let dependent = store.create_task(dependent).unwrap();
        assert_eq!(dependent.status, TaskStatus::Open);

        reopen(&store, dep.id).unwrap();
        let refreshed_dependent = store.get_task(dependent.id).unwrap();
        assert_eq!(refreshed_dependent.status, TaskStatus::Open);
    }
}
