pub mod config;
pub mod curve;
pub mod dependency;
pub mod intake;
pub mod lifecycle;
pub mod model;
pub mod planner;
pub mod recurrence;
pub mod store;
pub mod transfer;

pub use model::{
    BucketId, BucketRecord, BucketType, CompletionId, CompletionRecord, CurveConfig,
    IntervalUnit, RecurrenceKind, RecurrenceMode, RecurrencePattern, TaskId, TaskRecord,
    TaskStatus,
};
pub use store::{Store, StoreData, TaskFilter};
