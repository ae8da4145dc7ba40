//! The parser collaborator boundary of `spec.md` §6. The actual parser is
//! out of scope; this module only consumes its output, resolving a
//! free-text `bucket_name` against the store's buckets.

use serde::{Deserialize, Serialize};

use crate::model::{BucketId, BucketType, RecurrencePattern};
use crate::store::Store;

/// What an external parser is expected to hand the core after interpreting
/// a natural-language task entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTask {
    pub title: String,
    pub project: Option<String>,
    pub tags: Vec<String>,
    pub deadline: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_minutes: Option<u32>,
    pub bucket_name: Option<String>,
    pub recurrence: Option<RecurrencePattern>,
    pub window_start: Option<chrono::NaiveTime>,
    pub window_end: Option<chrono::NaiveTime>,
    pub dependencies: Vec<u64>,
}

/// A warning surfaced without failing the overall creation; currently only
/// "the bucket name in the input didn't match anything".
#[derive(Debug, Clone, Serialize)]
pub struct BucketResolutionWarning {
    pub requested_name: String,
}

/// Resolves `bucket_name` to a bucket id by exact, case-insensitive match.
/// An unresolved name downgrades to "no bucket" plus a warning rather than
/// failing the whole creation (§7's one "soft" error).
pub fn resolve_bucket_name(
    store: &Store,
    bucket_name: Option<&str>,
) -> taskcurve_core::Result<(Option<BucketId>, Option<BucketResolutionWarning>)> {
    let Some(name) = bucket_name else {
        return Ok((None, None));
    };
    let buckets = store.list_buckets()?;
    let found = buckets
        .iter()
        .find(|b| b.name.eq_ignore_ascii_case(name))
        .map(|b| b.id);
    match found {
        Some(id) => Ok((Some(id), None)),
        None => Ok((
            None,
            Some(BucketResolutionWarning {
                requested_name: name.to_string(),
            }),
        )),
    }
}

pub fn default_bucket_type() -> BucketType {
    BucketType::Project
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn unresolved_bucket_name_warns_instead_of_failing() {
        let store = Store::new();
        let (bucket_id, warning) = resolve_bucket_name(&store, Some("nonexistent")).unwrap();
        assert_eq!(bucket_id, None);
        assert!(warning.is_some());
    }

    #[test]
    fn resolves_bucket_case_insensitively() {
        let store = Store::new();
        let bucket = store
            .create_bucket(crate::model::BucketRecord {
                id: BucketId::new(1),
                name: "Home".into(),
                kind: BucketType::Context,
                config: IndexMap::new(),
            })
            .unwrap();
        let (resolved, warning) = resolve_bucket_name(&store, Some("home")).unwrap();
        assert_eq!(resolved, Some(bucket.id));
        assert!(warning.is_none());
    }
}
