//! The data model of `spec.md` §3: `Task`, `Bucket`, `Completion`, the
//! recurrence pattern and curve configuration sum types, and the per-entity
//! invariant checks the store enforces on every write.

use chrono::{DateTime, NaiveTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use taskcurve_core::{Entity, Error, Id, Result};

/// Marker types so `Id<Task>`, `Id<Bucket>`, `Id<Completion>` can't be
/// confused with one another at the type level.
pub struct Task;
pub struct Bucket;
pub struct Completion;

pub type TaskId = Id<Task>;
pub type BucketId = Id<Bucket>;
pub type CompletionId = Id<Completion>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Open,
    InProgress,
    Completed,
    Blocked,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Open => write!(f, "Open"),
            TaskStatus::InProgress => write!(f, "In Progress"),
            TaskStatus::Completed => write!(f, "Completed"),
            TaskStatus::Blocked => write!(f, "Blocked"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketType {
    Project,
    Category,
    Context,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub title: String,
    pub project: Option<String>,
    pub bucket_id: Option<BucketId>,
    /// Insertion-ordered, duplicate-free tag set: ordered for display,
    /// set semantics for the `tags` filter's intersection requirement.
    pub tags: IndexSet<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub estimate_minutes: Option<u32>,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub window_start: Option<NaiveTime>,
    pub window_end: Option<NaiveTime>,
    /// Ordered, duplicate-free; the dependency resolver is what rejects
    /// duplicates and self-references, not this type.
    pub dependencies: Vec<TaskId>,
    pub curve_config: CurveConfig,
    pub status: TaskStatus,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub next_due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for TaskRecord {
    type Id = TaskId;

    fn id(&self) -> TaskId {
        self.id
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("task title cannot be empty".into()));
        }
        if self.title.chars().count() > 500 {
            return Err(Error::Validation(
                "task title cannot exceed 500 characters".into(),
            ));
        }
        if let Some(minutes) = self.estimate_minutes {
            if minutes == 0 {
                return Err(Error::Validation(
                    "estimate_minutes must be greater than zero".into(),
                ));
            }
        }
        if self.dependencies.contains(&self.id) {
            return Err(Error::Validation(format!(
                "task {} cannot depend on itself",
                self.id
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for dep in &self.dependencies {
            if !seen.insert(*dep) {
                return Err(Error::Validation(format!(
                    "duplicate dependency on task {}",
                    dep
                )));
            }
        }
        if let (Some(s), Some(e)) = (self.window_start, self.window_end) {
            if s == e {
                return Err(Error::Validation(
                    "window_start and window_end cannot be equal".into(),
                ));
            }
        }
        if let Some(pattern) = &self.recurrence_pattern {
            pattern.validate()?;
        }
        self.curve_config.validate()?;
        Ok(())
    }
}

impl TaskRecord {
    pub fn is_recurring(&self) -> bool {
        self.recurrence_pattern.is_some()
    }

    pub fn has_deadline(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_overdue(&self, at: DateTime<Utc>) -> bool {
        self.deadline.map(|d| d < at).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRecord {
    pub id: BucketId,
    pub name: String,
    pub kind: BucketType,
    pub config: IndexMap<String, String>,
}

impl Entity for BucketRecord {
    type Id = BucketId;

    fn id(&self) -> BucketId {
        self.id
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("bucket name cannot be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: CompletionId,
    pub task_id: TaskId,
    pub completed_at: DateTime<Utc>,
    pub actual_minutes: Option<u32>,
    pub scheduled_minutes: Option<u32>,
    pub day_of_week: u8,
    pub hour_of_day: u8,
}

impl Entity for CompletionRecord {
    type Id = CompletionId;

    fn id(&self) -> CompletionId {
        self.id
    }

    fn validate(&self) -> Result<()> {
        if self.day_of_week > 6 {
            return Err(Error::Validation("day_of_week must be 0..=6".into()));
        }
        if self.hour_of_day > 23 {
            return Err(Error::Validation("hour_of_day must be 0..=23".into()));
        }
        Ok(())
    }
}

// --- Recurrence pattern -----------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrenceMode {
    Calendar,
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Monthly,
    Interval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalUnit {
    Days,
    Weeks,
    Months,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub mode: RecurrenceMode,
    pub kind: RecurrenceKind,
    pub interval: Option<u32>,
    pub unit: Option<IntervalUnit>,
    pub day_of_week: Option<u8>,
    pub days_of_week: Option<IndexSet<u8>>,
    pub time_of_day: Option<NaiveTime>,
    pub anchor: Option<DateTime<Utc>>,
}

impl RecurrencePattern {
    pub fn validate(&self) -> Result<()> {
        if self.kind == RecurrenceKind::Interval {
            match self.interval {
                Some(0) | None => {
                    return Err(Error::Validation(
                        "interval recurrence requires a positive interval".into(),
                    ))
                }
                _ => {}
            }
            if self.unit.is_none() {
                return Err(Error::Validation(
                    "interval recurrence requires a unit".into(),
                ));
            }
        }
        if let Some(d) = self.day_of_week {
            if d > 6 {
                return Err(Error::Validation("dayOfWeek must be 0..=6".into()));
            }
        }
        if let Some(days) = &self.days_of_week {
            if days.is_empty() {
                return Err(Error::Validation(
                    "daysOfWeek must be a nonempty subset of 0..=6".into(),
                ));
            }
            if days.iter().any(|d| *d > 6) {
                return Err(Error::Validation("daysOfWeek must be 0..=6".into()));
            }
        }
        Ok(())
    }
}

// --- Curve configuration ------------------------------------------------

/// A closed tagged union of priority curves (`spec.md` §4.2). Dispatch in
/// `crate::curve` is exhaustive: adding a variant here forces every match
/// arm that handles curves to be updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CurveConfig {
    Linear {
        start_date: DateTime<Utc>,
        deadline: DateTime<Utc>,
    },
    Exponential {
        start_date: DateTime<Utc>,
        deadline: DateTime<Utc>,
        exponent: f64,
    },
    HardWindow {
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        priority: f64,
    },
    /// Wraps another curve and gates it entirely on dependency completion.
    /// Deliberately carries no `dependencies` of its own (see DESIGN.md's
    /// resolution of the curve/task dependency-duplication open question):
    /// the task's own `dependencies` list is always authoritative.
    Blocked {
        then_curve: Box<CurveConfig>,
    },
    Accumulator {
        buildup_rate: f64,
    },
}

impl CurveConfig {
    pub fn linear_default(now: DateTime<Utc>, deadline: Option<DateTime<Utc>>) -> Self {
        CurveConfig::Linear {
            start_date: now,
            deadline: deadline.unwrap_or(now + chrono::Duration::days(7)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            CurveConfig::Linear {
                start_date,
                deadline,
            } => {
                if deadline <= start_date {
                    return Err(Error::Validation(
                        "Linear curve requires deadline > start_date".into(),
                    ));
                }
            }
            CurveConfig::Exponential {
                start_date,
                deadline,
                exponent,
            } => {
                if deadline <= start_date {
                    return Err(Error::Validation(
                        "Exponential curve requires deadline > start_date".into(),
                    ));
                }
                if !(1.0..=5.0).contains(exponent) {
                    return Err(Error::Validation(
                        "Exponential curve exponent must be in [1, 5]".into(),
                    ));
                }
            }
            CurveConfig::HardWindow {
                window_start,
                window_end,
                priority,
            } => {
                if window_start == window_end {
                    return Err(Error::Validation(
                        "HardWindow curve requires window_end != window_start".into(),
                    ));
                }
                if !(0.0..=2.0).contains(priority) {
                    return Err(Error::Validation(
                        "HardWindow curve priority must be in [0, 2]".into(),
                    ));
                }
            }
            CurveConfig::Blocked { then_curve } => then_curve.validate()?,
            CurveConfig::Accumulator { buildup_rate } => {
                if *buildup_rate < 0.0 {
                    return Err(Error::Validation(
                        "Accumulator buildup_rate cannot be negative".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Default for CurveConfig {
    fn default() -> Self {
        let now = Utc::now();
        CurveConfig::linear_default(now, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_task() -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            id: TaskId::new(1),
            title: "write report".into(),
            project: None,
            bucket_id: None,
            tags: IndexSet::new(),
            deadline: None,
            estimate_minutes: Some(30),
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
    fn rejects_empty_title() {
        let mut task = base_task();
        task.title = "   ".into();
        assert!(task.validate().is_err());
    }

    #[test]
    fn rejects_self_dependency() {
        let mut task = base_task();
        task.dependencies.push(task.id);
        assert!(task.validate().is_err());
    }

    #[test]
    fn rejects_zero_estimate() {
        let mut task = base_task();
        task.estimate_minutes = Some(0);
        assert!(task.validate().is_err());
    }

    #[test]
    fn rejects_exponential_exponent_out_of_range() {
        let now = Utc::now();
        let curve = CurveConfig::Exponential {
            start_date: now,
            deadline: now + chrono::Duration::days(3),
            exponent: 9.0,
        };
        assert!(curve.validate().is_err());
    }

    #[test]
    fn rejects_interval_recurrence_without_unit() {
        let pattern = RecurrencePattern {
            mode: RecurrenceMode::Calendar,
            kind: RecurrenceKind::Interval,
            interval: Some(3),
            unit: None,
            day_of_week: None,
            days_of_week: None,
            time_of_day: None,
            anchor: None,
        };
        assert!(pattern.validate().is_err());
    }
}
