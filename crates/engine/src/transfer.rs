//! Export/import framing of `spec.md` §6. The engine produces and consumes
//! `ExportSnapshot`/`ImportSnapshot` values; turning those into an
//! on-disk JSON file is an external collaborator's job (the CLI).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskcurve_core::{IdSequence, Result};

use crate::model::{BucketId, BucketRecord, CompletionRecord, TaskId, TaskRecord};
use crate::store::Store;

const SNAPSHOT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub tasks: Vec<TaskRecord>,
    pub buckets: Vec<BucketRecord>,
    pub completions: Vec<CompletionRecord>,
}

pub type ImportSnapshot = ExportSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    Replace,
    Merge,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportCounts {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub tasks: ImportCounts,
    pub buckets: ImportCounts,
    pub completions: ImportCounts,
}

pub fn export(store: &Store, exported_at: DateTime<Utc>) -> Result<ExportSnapshot> {
    let data = store.snapshot()?;
    let snapshot = ExportSnapshot {
        version: SNAPSHOT_VERSION.to_string(),
        exported_at,
        tasks: data.tasks.values().cloned().collect(),
        buckets: data.buckets.values().cloned().collect(),
        completions: data.completions.values().cloned().collect(),
    };
    tracing::info!(
        tasks = snapshot.tasks.len(),
        buckets = snapshot.buckets.len(),
        completions = snapshot.completions.len(),
        "exported store snapshot"
    );
    Ok(snapshot)
}

/// Imports `snapshot` into `store` as a single transaction. `replace` wipes
/// the store first; `merge` re-allocates incoming ids and remaps
/// dependency references within the import, preserving existing data.
pub fn import(store: &Store, snapshot: &ImportSnapshot, mode: ImportMode) -> Result<ImportReport> {
    let report = match mode {
        ImportMode::Replace => import_replace(store, snapshot),
        ImportMode::Merge => import_merge(store, snapshot),
    }?;
    tracing::info!(
        ?mode,
        tasks_imported = report.tasks.imported,
        buckets_imported = report.buckets.imported,
        completions_imported = report.completions.imported,
        completions_skipped = report.completions.skipped,
        "imported snapshot"
    );
    Ok(report)
}

fn import_replace(store: &Store, snapshot: &ImportSnapshot) -> Result<ImportReport> {
    store.transaction(|data| {
        data.tasks.clear();
        data.buckets.clear();
        data.completions.clear();
        for bucket in &snapshot.buckets {
            data.buckets.insert(bucket.id, bucket.clone());
        }
        for task in &snapshot.tasks {
            data.tasks.insert(task.id, task.clone());
        }
        for completion in &snapshot.completions {
            data.completions.insert(completion.id, completion.clone());
        }
        *data.task_ids_mut() = IdSequence::starting_after(
            data.tasks.keys().map(|id| id.get()).max().unwrap_or(0),
        );
        *data.bucket_ids_mut() = IdSequence::starting_after(
            data.buckets.keys().map(|id| id.get()).max().unwrap_or(0),
        );
        *data.completion_ids_mut() = IdSequence::starting_after(
            data.completions.keys().map(|id| id.get()).max().unwrap_or(0),
        );
        Ok(ImportReport {
            tasks: ImportCounts {
                imported: snapshot.tasks.len(),
                skipped: 0,
            },
            buckets: ImportCounts {
                imported: snapshot.buckets.len(),
                skipped: 0,
            },
            completions: ImportCounts {
                imported: snapshot.completions.len(),
                skipped: 0,
            },
        })
    })
}

fn import_merge(store: &Store, snapshot: &ImportSnapshot) -> Result<ImportReport> {
    store.transaction(|data| {
        let mut bucket_id_map: HashMap<BucketId, BucketId> = HashMap::new();
        let mut bucket_imported = 0usize;
        for bucket in &snapshot.buckets {
            let new_id = data.bucket_ids_mut().next_id();
            bucket_id_map.insert(bucket.id, new_id);
            let mut remapped = bucket.clone();
            remapped.id = new_id;
            data.buckets.insert(new_id, remapped);
            bucket_imported += 1;
        }

        let mut task_id_map: HashMap<TaskId, TaskId> = HashMap::new();
        for task in &snapshot.tasks {
            let new_id = data.task_ids_mut().next_id();
            task_id_map.insert(task.id, new_id);
        }

        let mut task_imported = 0usize;
        for task in &snapshot.tasks {
            let new_id = task_id_map[&task.id];
            let mut remapped = task.clone();
            remapped.id = new_id;
            remapped.bucket_id = remapped.bucket_id.and_then(|b| bucket_id_map.get(&b).copied());
            remapped.dependencies = remapped
                .dependencies
                .iter()
                .filter_map(|dep| task_id_map.get(dep).copied())
                .collect();
            data.tasks.insert(new_id, remapped);
            task_imported += 1;
        }

        let mut completion_imported = 0usize;
        let mut completion_skipped = 0usize;
        for completion in &snapshot.completions {
            match task_id_map.get(&completion.task_id) {
                Some(new_task_id) => {
                    let new_id = data.completion_ids_mut().next_id();
                    let mut remapped = completion.clone();
                    remapped.id = new_id;
                    remapped.task_id = *new_task_id;
                    data.completions.insert(new_id, remapped);
                    completion_imported += 1;
                }
                None => completion_skipped += 1,
            }
        }

        Ok(ImportReport {
            tasks: ImportCounts {
                imported: task_imported,
                skipped: 0,
            },
            buckets: ImportCounts {
                imported: bucket_imported,
                skipped: 0,
            },
            completions: ImportCounts {
                imported: completion_imported,
                skipped: completion_skipped,
            },
        })
    })
}
