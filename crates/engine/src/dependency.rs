//! The dependency resolver of `spec.md` §4.4: cycle detection on proposed
//! dependency sets, and the two cascades that keep `status = Blocked`
//! consistent with I3 after completions and create/update operations.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graphmap::DiGraphMap;
use taskcurve_core::{Error, Result};

use crate::model::{TaskId, TaskRecord, TaskStatus};

/// Validates a proposed dependency set for `task_id` against the existing
/// graph described by `all_tasks` (a lookup from task id to its current
/// dependency list). Does not mutate anything; callers commit afterward.
pub fn validate(task_id: TaskId, proposed_deps: &[TaskId], all_tasks: &HashMap<TaskId, Vec<TaskId>>) -> Result<()> {
    if proposed_deps.contains(&task_id) {
        return Err(Error::Validation(format!(
            "task {task_id} cannot depend on itself"
        )));
    }
    for dep in proposed_deps {
        if !all_tasks.contains_key(dep) {
            return Err(Error::Validation(format!(
                "dependency references nonexistent task {dep}"
            )));
        }
    }

    // BFS from the proposed dependencies, following each successor's own
    // dependencies; if the frontier ever reaches task_id, committing the
    // proposed set would close a cycle back to the task itself.
    let mut visited: HashSet<TaskId> = HashSet::new();
    let mut frontier: VecDeque<TaskId> = proposed_deps.iter().copied().collect();
    while let Some(current) = frontier.pop_front() {
        if current == task_id {
            tracing::warn!(task_id = %task_id, through = %current, "rejected dependency set: would create a cycle");
            return Err(Error::CircularDependency(format!(
                "adding dependency would create a cycle through task {current}"
            )));
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(successors) = all_tasks.get(&current) {
            for next in successors {
                frontier.push_back(*next);
            }
        }
    }
    Ok(())
}

/// Builds a `DiGraphMap` view of the dependency graph (task -> dependency
/// edges) for callers that want general graph queries beyond the two
/// cascades below, e.g. tracing the full chain of blockers behind a task.
pub fn graph_of(all_tasks: &HashMap<TaskId, Vec<TaskId>>) -> DiGraphMap<TaskId, ()> {
    let mut graph = DiGraphMap::new();
    for (task, deps) in all_tasks {
        graph.add_node(*task);
        for dep in deps {
            graph.add_edge(*task, *dep, ());
        }
    }
    graph
}

/// Finds every task that lists `target` in its `dependencies`.
fn dependents_of(target: TaskId, all_tasks: &HashMap<TaskId, Vec<TaskId>>) -> Vec<TaskId> {
    all_tasks
        .iter()
        .filter(|(_, deps)| deps.contains(&target))
        .map(|(id, _)| *id)
        .collect()
}

/// After `completed_id` is marked Completed, unblocks every dependent task
/// whose dependencies are now all Completed. Returns the ids that were
/// transitioned from Blocked to Open, for the caller to persist.
pub fn cascade_on_complete(
    completed_id: TaskId,
    all_tasks: &HashMap<TaskId, Vec<TaskId>>,
    status_of: impl Fn(TaskId) -> Option<TaskStatus>,
) -> Vec<TaskId> {
    let mut unblocked = Vec::new();
    for dependent in dependents_of(completed_id, all_tasks) {
        if status_of(dependent) != Some(TaskStatus::Blocked) {
            continue;
        }
        let deps = all_tasks.get(&dependent).cloned().unwrap_or_default();
        let all_completed = deps
            .iter()
            .all(|dep| status_of(*dep) == Some(TaskStatus::Completed));
        if all_completed {
            unblocked.push(dependent);
        }
    }
    unblocked
}

/// Recomputes the status a task should have given its current dependencies
/// (I3). Leaves `Completed`/`InProgress` tasks untouched; only toggles
/// between `Open` and `Blocked`.
pub fn resolved_status(task: &TaskRecord, status_of: impl Fn(TaskId) -> Option<TaskStatus>) -> TaskStatus {
    if matches!(task.status, TaskStatus::Completed | TaskStatus::InProgress) {
        return task.status;
    }
    let blocked = !task.dependencies.is_empty()
        && task
            .dependencies
            .iter()
            .any(|dep| status_of(*dep) != Some(TaskStatus::Completed));
    if blocked {
        TaskStatus::Blocked
    } else {
        TaskStatus::Open
    }
}

/// Refuses to report a task deletable if anything still depends on it,
/// unless `force` is set. Returns the offending dependent ids either way;
/// the caller surfaces them in the error or re-resolves after a forced
/// delete.
pub fn dependents_blocking_delete(target: TaskId, all_tasks: &HashMap<TaskId, Vec<TaskId>>) -> Vec<TaskId> {
    dependents_of(target, all_tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(pairs: &[(u64, &[u64])]) -> HashMap<TaskId, Vec<TaskId>> {
        pairs
            .iter()
            .map(|(id, deps)| {
                (
                    TaskId::new(*id),
                    deps.iter().map(|d| TaskId::new(*d)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn rejects_self_loop() {
        let all = graph(&[(1, &[])]);
        let err = validate(TaskId::new(1), &[TaskId::new(1)], &all).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn rejects_cycle() {
        // A(1) -> B(2), attempt to set B's deps to [A] closes a cycle.
        let all = graph(&[(1, &[2]), (2, &[])]);
        let err = validate(TaskId::new(2), &[TaskId::new(1)], &all).unwrap_err();
        assert!(matches!(err, Error::CircularDependency(_)));
    }

    #[test]
    fn accepts_acyclic_dependency() {
        let all = graph(&[(1, &[]), (2, &[])]);
        assert!(validate(TaskId::new(2), &[TaskId::new(1)], &all).is_ok());
    }

    #[test]
    fn cascade_unblocks_when_last_dependency_completes() {
        let all = graph(&[(1, &[2]), (2, &[])]);
        let unblocked = cascade_on_complete(TaskId::new(2), &all, |id| {
            if id == TaskId::new(1) {
                Some(TaskStatus::Blocked)
            } else {
                Some(TaskStatus::Completed)
            }
        });
        assert_eq!(unblocked, vec![TaskId::new(1)]);
    }

    #[test]
    fn cascade_leaves_partially_satisfied_tasks_blocked() {
        let all = graph(&[(1, &[2, 3]), (2, &[]), (3, &[])]);
        let unblocked = cascade_on_complete(TaskId::new(2), &all, |id| {
            if id == TaskId::new(1) {
                Some(TaskStatus::Blocked)
            } else if id == TaskId::new(2) {
                Some(TaskStatus::Completed)
            } else {
                Some(TaskStatus::Open)
            }
        });
        assert!(unblocked.is_empty());
    }
}
