//! The daily planner of `spec.md` §4.5: greedily packs candidate tasks into
//! a working-hours window in descending priority order.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;

use crate::model::{TaskId, TaskRecord, TaskStatus};

#[derive(Debug, Clone, Copy)]
pub struct PlannerOptions {
    pub limit: usize,
    pub include_time_blocks: bool,
    pub work_hours_start: NaiveTime,
    pub work_hours_end: NaiveTime,
    pub default_estimate_minutes: u32,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            limit: 20,
            include_time_blocks: true,
            work_hours_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            work_hours_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            default_estimate_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledEntry {
    pub task_id: TaskId,
    pub slot: TimeSlot,
    pub estimate_minutes: u32,
    pub is_default_estimate: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnscheduledEntry {
    pub task_id: TaskId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    pub scheduled: Vec<ScheduledEntry>,
    pub unscheduled: Vec<UnscheduledEntry>,
    pub work_hours_start: NaiveTime,
    pub work_hours_end: NaiveTime,
    pub total_scheduled_minutes: u32,
    pub remaining_minutes: u32,
}

/// Builds a plan for `date` out of `candidates`: tasks already filtered to
/// Open, non-Blocked, priority > 0 at `at` (the caller, typically
/// `Store::tasks_by_priority`, is responsible for that filtering and for
/// supplying each candidate's priority).
pub fn plan(candidates: &[(TaskRecord, f64)], at: DateTime<Utc>, options: &PlannerOptions) -> PlanResult {
    let mut sorted: Vec<&(TaskRecord, f64)> = candidates
        .iter()
        .filter(|(t, p)| t.status == TaskStatus::Open && *p > 0.0)
        .collect();
    sorted.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.id.cmp(&b.0.id))
    });
    sorted.truncate(options.limit);

    let window_start = at.date_naive().and_time(options.work_hours_start);
    let window_end = at.date_naive().and_time(options.work_hours_end);
    let window_start = chrono::Utc.from_utc_datetime(&window_start);
    let window_end = chrono::Utc.from_utc_datetime(&window_end);
    let working_window_minutes = (window_end - window_start).num_minutes().max(0) as u32;

    let mut scheduled = Vec::new();
    let mut unscheduled = Vec::new();
    let mut cursor = window_start;

    if !options.include_time_blocks {
        return PlanResult {
            scheduled,
            unscheduled: sorted
                .into_iter()
                .map(|(t, _)| UnscheduledEntry {
                    task_id: t.id,
                    reason: "time blocks not requested".into(),
                })
                .collect(),
            work_hours_start: options.work_hours_start,
            work_hours_end: options.work_hours_end,
            total_scheduled_minutes: 0,
            remaining_minutes: working_window_minutes,
        };
    }

    for (task, _priority) in sorted {
        let is_default_estimate = task.estimate_minutes.is_none();
        let estimate = task
            .estimate_minutes
            .unwrap_or(options.default_estimate_minutes);
        let estimate_duration = Duration::minutes(estimate as i64);

        let (slot_start, slot_end) = match overlap_window(task, window_start, window_end) {
            Some(bounds) => bounds,
            None => {
                tracing::debug!(task_id = %task.id, "planner: no fitting slot for task's time window");
                unscheduled.push(UnscheduledEntry {
                    task_id: task.id,
                    reason: "no fitting slot".into(),
                });
                continue;
            }
        };

        let candidate_start = cursor.max(slot_start);
        let candidate_end = candidate_start + estimate_duration;
        if candidate_end > slot_end || candidate_end > window_end {
            tracing::debug!(task_id = %task.id, estimate, "planner: insufficient time remaining in window");
            unscheduled.push(UnscheduledEntry {
                task_id: task.id,
                reason: "insufficient time".into(),
            });
            continue;
        }

        scheduled.push(ScheduledEntry {
            task_id: task.id,
            slot: TimeSlot {
                start: candidate_start,
                end: candidate_end,
            },
            estimate_minutes: estimate,
            is_default_estimate,
        });
        cursor = candidate_end;
    }

    let total_scheduled_minutes: u32 = scheduled.iter().map(|s| s.estimate_minutes).sum();
    let remaining_minutes = working_window_minutes.saturating_sub(total_scheduled_minutes);

    tracing::info!(
        scheduled = scheduled.len(),
        unscheduled = unscheduled.len(),
        total_scheduled_minutes,
        "planner packed candidates into working window"
    );

    PlanResult {
        scheduled,
        unscheduled,
        work_hours_start: options.work_hours_start,
        work_hours_end: options.work_hours_end,
        total_scheduled_minutes,
        remaining_minutes,
    }
}

/// A task whose own time window overlaps the working day is only placed
/// during the overlap. Returns `None` if the task's window doesn't
/// intersect the working window at all.
fn overlap_window(
    task: &TaskRecord,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    match (task.window_start, task.window_end) {
        (Some(start), Some(end)) if start != end => {
            let day = window_start.date_naive();
            let task_start = chrono::Utc.from_utc_datetime(&day.and_time(start));
            let task_end = if start <= end {
                chrono::Utc.from_utc_datetime(&day.and_time(end))
            } else {
                chrono::Utc.from_utc_datetime(&(day + chrono::Duration::days(1)).and_time(end))
            };
            let overlap_start = task_start.max(window_start);
            let overlap_end = task_end.min(window_end);
            if overlap_start < overlap_end {
                Some((overlap_start, overlap_end))
            } else {
                None
            }
        }
        _ => Some((window_start, window_end)),
    }
}

use chrono::TimeZone;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CurveConfig, TaskId};
    use indexmap::IndexSet;

    fn task(id: u64, estimate: Option<u32>) -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            id: TaskId::new(id),
            title: format!("task {id}"),
            project: None,
            bucket_id: None,
            tags: IndexSet::new(),
            deadline: None,
            estimate_minutes: estimate,
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
    fn packs_tasks_until_work_hours_exhausted() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let options = PlannerOptions {
            limit: 20,
            include_time_blocks: true,
            work_hours_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            work_hours_end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            default_estimate_minutes: 30,
        };
        let candidates: Vec<(TaskRecord, f64)> = (1..=20)
            .map(|id| (task(id, Some(60)), 20.0 - id as f64))
            .collect();
        let result = plan(&candidates, at, &options);
        assert!(result.scheduled.len() <= 3);
        assert!(result.total_scheduled_minutes <= 180);
        assert!(!result.unscheduled.is_empty());
    }

    #[test]
    fn completed_and_blocked_tasks_never_appear() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let mut completed = task(1, Some(30));
        completed.status = TaskStatus::Completed;
        let mut blocked = task(2, Some(30));
        blocked.status = TaskStatus::Blocked;
        let open = task(3, Some(30));
        let candidates = vec![(completed, 1.0), (blocked, 1.0), (open, 1.0)];
        let result = plan(&candidates, at, &PlannerOptions::default());
        assert_eq!(result.scheduled.len(), 1);
        assert_eq!(result.scheduled[0].task_id, TaskId::new(3));
    }
}
