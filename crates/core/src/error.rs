use thiserror::Error;

/// Error taxonomy for the task corpus. Each variant names a condition, not
/// an exception type — every public operation returns a `Result` rather
/// than panicking, and invariant violations are never recovered from
/// locally.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON serialization error: {0}")]
    RonSerialization(#[from] ron::Error),

    #[error("RON deserialization error: {0}")]
    RonDeserialization(#[from] ron::error::SpannedError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("circular dependency: {0}")]
    CircularDependency(String),

    #[error("has dependents: {0:?}")]
    HasDependents(Vec<u64>),

    #[error("store failure: {0}")]
    StoreFailure(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;
