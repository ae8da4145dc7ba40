//! The priority evaluator of `spec.md` §4.2: a pure function of a task, an
//! evaluation instant, and the completion status of its dependencies.
//!
//! `priority` never touches the store; callers supply whatever dependency
//! snapshot they already have (the store, during `getByPriority`; the
//! lifecycle orchestrator, during cascade checks).

use crate::model::{CurveConfig, RecurrenceKind, RecurrenceMode, TaskRecord, TaskStatus};
use chrono::{DateTime, NaiveTime, Utc};

const DEFAULT_EXPONENT: f64 = 2.0;
const DEFAULT_HARD_WINDOW_PRIORITY: f64 = 1.0;
const DEFAULT_BUILDUP_RATE: f64 = 0.1;

/// Evaluates `task`'s priority at `t`. `dependency_status` is consulted once
/// per entry in `task.dependencies`; callers typically close over a store
/// snapshot or an `IndexMap` lookup.
pub fn priority(
    task: &TaskRecord,
    t: DateTime<Utc>,
    dependency_status: impl Fn(crate::model::TaskId) -> Option<TaskStatus>,
) -> f64 {
    if !within_window(task.window_start, task.window_end, t) {
        return 0.0;
    }
    if task
        .dependencies
        .iter()
        .any(|dep| dependency_status(*dep) != Some(TaskStatus::Completed))
    {
        return 0.0;
    }
    evaluate_curve(&task.curve_config, task, t)
}

fn evaluate_curve(curve: &CurveConfig, task: &TaskRecord, t: DateTime<Utc>) -> f64 {
    match curve {
        CurveConfig::Linear {
            start_date,
            deadline,
        } => linear(*start_date, *deadline, t),
        CurveConfig::Exponential {
            start_date,
            deadline,
            exponent,
        } => exponential(*start_date, *deadline, *exponent, t),
        CurveConfig::HardWindow {
            window_start,
            window_end,
            priority,
        } => {
            if t >= *window_start && t <= *window_end {
                *priority
            } else {
                0.0
            }
        }
        // The block gate above already zeroed out unmet task-level
        // dependencies; by the time we get here all deps are Completed,
        // so Blocked just delegates to its wrapped curve.
        CurveConfig::Blocked { then_curve } => evaluate_curve(then_curve, task, t),
        CurveConfig::Accumulator { buildup_rate } => accumulator(task, *buildup_rate, t),
    }
}

fn linear(start: DateTime<Utc>, deadline: DateTime<Utc>, t: DateTime<Utc>) -> f64 {
    let span = (deadline - start).num_milliseconds() as f64;
    if t < start {
        return 0.0;
    }
    let elapsed = (t - start).num_milliseconds() as f64;
    if t > deadline {
        let overdue = (t - deadline).num_milliseconds() as f64;
        1.0 + overdue / span
    } else {
        elapsed / span
    }
}

fn exponential(start: DateTime<Utc>, deadline: DateTime<Utc>, exponent: f64, t: DateTime<Utc>) -> f64 {
    if t > deadline {
        return linear(start, deadline, t);
    }
    if t < start {
        return 0.0;
    }
    let span = (deadline - start).num_milliseconds() as f64;
    let elapsed = (t - start).num_milliseconds() as f64;
    (elapsed / span).powf(exponent)
}

/// `Daily=1d, Weekly=7d, Monthly=30d, Interval=interval*unit`, per §4.2's
/// Accumulator row. This intentionally diverges from `recurrence::next_due`'s
/// exact calendar-month arithmetic: the ramp only needs an approximate
/// interval length, while `next_due` needs the exact next instant.
pub fn expected_interval_duration(pattern: &crate::model::RecurrencePattern) -> chrono::Duration {
    use crate::model::IntervalUnit;
    match pattern.kind {
        RecurrenceKind::Daily => chrono::Duration::days(1),
        RecurrenceKind::Weekly => chrono::Duration::days(7),
        RecurrenceKind::Monthly => chrono::Duration::days(30),
        RecurrenceKind::Interval => {
            let n = pattern.interval.unwrap_or(1) as i64;
            match pattern.unit {
                Some(IntervalUnit::Days) | None => chrono::Duration::days(n),
                Some(IntervalUnit::Weeks) => chrono::Duration::days(n * 7),
                Some(IntervalUnit::Months) => chrono::Duration::days(n * 30),
            }
        }
    }
}

fn accumulator(task: &TaskRecord, buildup_rate: f64, t: DateTime<Utc>) -> f64 {
    let Some(pattern) = &task.recurrence_pattern else {
        return 0.0;
    };
    let expected = expected_interval_duration(pattern);
    match pattern.mode {
        RecurrenceMode::Completion => {
            let Some(last) = task.last_completed_at else {
                return 0.0;
            };
            let elapsed = (t - last).num_milliseconds() as f64;
            let expected_ms = expected.num_milliseconds() as f64;
            let ratio = elapsed / expected_ms;
            accumulator_completion_step(ratio)
        }
        RecurrenceMode::Calendar => {
            let Some(next_due) = task.next_due_at else {
                return 0.0;
            };
            let days_until = (next_due - t).num_milliseconds() as f64 / 86_400_000.0;
            let expected_days = expected.num_milliseconds() as f64 / 86_400_000.0;
            accumulator_calendar_ramp(days_until, expected_days, buildup_rate)
        }
    }
}

fn accumulator_completion_step(ratio: f64) -> f64 {
    if ratio < 0.5 {
        0.1
    } else if ratio < 0.8 {
        0.3
    } else if ratio < 1.0 {
        0.6
    } else if ratio < 1.2 {
        0.9
    } else {
        1.0
    }
}

fn accumulator_calendar_ramp(days_until: f64, expected_days: f64, _buildup_rate: f64) -> f64 {
    let half = expected_days / 2.0;
    if days_until > half {
        0.2
    } else if days_until < 0.0 {
        (1.0 + 0.1 * days_until.abs()).min(1.5)
    } else {
        // Linear ramp 0.2 -> 1.0 across the second half of the interval,
        // i.e. as days_until goes from `half` down to 0.
        let progressed = (half - days_until) / half;
        0.2 + progressed * 0.8
    }
}

/// Evaluates the time-window gate with midnight-crossing semantics (I5):
/// `start > end` is interpreted as a window spanning into the next day.
fn within_window(start: Option<NaiveTime>, end: Option<NaiveTime>, t: DateTime<Utc>) -> bool {
    let (Some(start), Some(end)) = (start, end) else {
        return true;
    };
    let local = t.time();
    if start <= end {
        local >= start && local < end
    } else {
        local >= start || local < end
    }
}

/// Chooses a curve for a task created without an explicit one (§4.2
/// Defaults/inference): HardWindow if a time window is set; Blocked
/// (wrapping Linear) if dependencies exist; Accumulator if recurring;
/// Linear(now, now+7d) otherwise.
pub fn infer_default_curve(
    window_start: Option<NaiveTime>,
    window_end: Option<NaiveTime>,
    has_dependencies: bool,
    is_recurring: bool,
    now: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
) -> CurveConfig {
    if window_start.is_some() && window_end.is_some() {
        return CurveConfig::HardWindow {
            window_start: now,
            window_end: deadline.unwrap_or(now + chrono::Duration::days(7)),
            priority: DEFAULT_HARD_WINDOW_PRIORITY,
        };
    }
    if has_dependencies {
        return CurveConfig::Blocked {
            then_curve: Box::new(CurveConfig::linear_default(now, deadline)),
        };
    }
    if is_recurring {
        return CurveConfig::Accumulator {
            buildup_rate: DEFAULT_BUILDUP_RATE,
        };
    }
    CurveConfig::linear_default(now, deadline)
}

pub fn default_exponent() -> f64 {
    DEFAULT_EXPONENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CurveConfig, TaskId, TaskStatus};
    use chrono::TimeZone;
    use indexmap::IndexSet;

    fn task_with_curve(curve: CurveConfig) -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            id: TaskId::new(1),
            title: "t".into(),
            project: None,
            bucket_id: None,
            tags: IndexSet::new(),
            deadline: None,
            estimate_minutes: None,
            recurrence_pattern: None,
            window_start: None,
            window_end: None,
            dependencies: Vec::new(),
            curve_config: curve,
            status: TaskStatus::Open,
            last_completed_at: None,
            next_due_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn linear_midpoint_is_approximately_half() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let deadline = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let t = Utc.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
        let task = task_with_curve(CurveConfig::Linear {
            start_date: start,
            deadline,
        });
        let p = priority(&task, t, |_| None);
        assert!((p - 0.5).abs() < 0.01, "expected ~0.5, got {p}");
    }

    #[test]
    fn linear_before_start_is_zero() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let deadline = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let task = task_with_curve(CurveConfig::Linear {
            start_date: start,
            deadline,
        });
        let before = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(priority(&task, before, |_| None), 0.0);
    }

    #[test]
    fn linear_overdue_exceeds_one() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let deadline = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let task = task_with_curve(CurveConfig::Linear {
            start_date: start,
            deadline,
        });
        let after = Utc.with_ymd_and_hms(2025, 1, 19, 0, 0, 0).unwrap();
        assert!((priority(&task, after, |_| None) - 2.0).abs() < 0.01);
    }

    #[test]
    fn block_gate_zeroes_priority_until_dependency_completes() {
        let now = Utc::now();
        let mut task = task_with_curve(CurveConfig::linear_default(now, None));
        task.dependencies.push(TaskId::new(2));
        assert_eq!(priority(&task, now, |_| Some(TaskStatus::Open)), 0.0);
        assert!(priority(&task, now, |_| Some(TaskStatus::Completed)) >= 0.0);
    }

    #[test]
    fn window_gate_spans_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 23, 0, 0).unwrap();
        let mut task = task_with_curve(CurveConfig::linear_default(now, None));
        task.window_start = Some(NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        task.window_end = Some(NaiveTime::from_hms_opt(2, 0, 0).unwrap());
        // 23:00 is within [22:00, 02:00) crossing midnight.
        assert!(priority(&task, now, |_| None) >= 0.0);
        let outside = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(priority(&task, outside, |_| None), 0.0);
    }

    #[test]
    fn hard_window_zero_outside_range() {
        let window_start = Utc.with_ymd_and_hms(2025, 1, 1, 18, 0, 0).unwrap();
        let window_end = Utc.with_ymd_and_hms(2025, 1, 1, 22, 0, 0).unwrap();
        let task = task_with_curve(CurveConfig::HardWindow {
            window_start,
            window_end,
            priority: 1.0,
        });
        let before = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let inside = Utc.with_ymd_and_hms(2025, 1, 1, 20, 0, 0).unwrap();
        assert_eq!(priority(&task, before, |_| None), 0.0);
        assert_eq!(priority(&task, inside, |_| None), 1.0);
    }
}
