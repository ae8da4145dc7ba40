//! The store contract of `spec.md` §4.1: transactional CRUD for tasks,
//! buckets, completions, and a key/value config map, plus full-text search
//! and filtered list queries.
//!
//! Grounded in the teacher's `ProjectRepository` (in-memory entity lists
//! with RON load/save), extended with the transaction primitive the spec
//! requires: a transaction clones the current state, runs the caller's
//! closure against the clone, and only swaps it in on success, giving true
//! rollback semantics rather than best-effort undo.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use taskcurve_core::{ensure_directory, format_ron_pretty, Entity, Error, IdSequence, Result};

use crate::model::{
    Bucket, BucketId, BucketRecord, Completion, CompletionId, CompletionRecord, Task, TaskId,
    TaskRecord, TaskStatus,
};
use crate::{curve, dependency};

const CONFIG_VERSION_KEY: &str = "version";
const CURRENT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StoreData {
    pub tasks: IndexMap<TaskId, TaskRecord>,
    pub buckets: IndexMap<BucketId, BucketRecord>,
    pub completions: IndexMap<CompletionId, CompletionRecord>,
    pub config: IndexMap<String, String>,
    task_ids: IdSequence<Task>,
    bucket_ids: IdSequence<Bucket>,
    completion_ids: IdSequence<Completion>,
}

impl StoreData {
    pub(crate) fn task_ids_mut(&mut self) -> &mut IdSequence<Task> {
        &mut self.task_ids
    }

    pub(crate) fn bucket_ids_mut(&mut self) -> &mut IdSequence<Bucket> {
        &mut self.bucket_ids
    }

    pub(crate) fn completion_ids_mut(&mut self) -> &mut IdSequence<Completion> {
        &mut self.completion_ids
    }

    fn dependency_graph(&self) -> HashMap<TaskId, Vec<TaskId>> {
        self.tasks
            .iter()
            .map(|(id, task)| (*id, task.dependencies.clone()))
            .collect()
    }

    fn status_of(&self, id: TaskId) -> Option<TaskStatus> {
        self.tasks.get(&id).map(|t| t.status)
    }
}

/// Filters accepted by `Store::list_tasks` (§4.1).
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub project: Option<String>,
    /// `Some(None)` means "bucket_id is null"; `Some(Some(id))` means an
    /// exact match; `None` means unfiltered.
    pub bucket_id: Option<Option<BucketId>>,
    pub tags: Vec<String>,
    pub has_deadline: Option<bool>,
    pub has_recurrence: Option<bool>,
    pub overdue: Option<bool>,
}

impl TaskFilter {
    fn matches(&self, task: &TaskRecord, at: DateTime<Utc>) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(project) = &self.project {
            if task.project.as_deref() != Some(project.as_str()) {
                return false;
            }
        }
        if let Some(bucket) = self.bucket_id {
            if task.bucket_id != bucket {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().all(|tag| task.tags.contains(tag)) {
            return false;
        }
        if let Some(want) = self.has_deadline {
            if task.has_deadline() != want {
                return false;
            }
        }
        if let Some(want) = self.has_recurrence {
            if task.is_recurring() != want {
                return false;
            }
        }
        if let Some(want) = self.overdue {
            if task.is_overdue(at) != want {
                return false;
            }
        }
        true
    }
}

pub struct Store {
    data: Mutex<StoreData>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let mut config = IndexMap::new();
        config.insert(CONFIG_VERSION_KEY.to_string(), CURRENT_VERSION.to_string());
        Self {
            data: Mutex::new(StoreData {
                config,
                ..Default::default()
            }),
        }
    }

    /// Runs `f` against a private clone of the current state; the clone is
    /// only swapped back in if `f` returns `Ok`. Every mutating operation on
    /// `Store` goes through this so a failed write never leaves partial
    /// state visible (§4.1, §7 StoreFailure).
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreData) -> Result<T>,
    {
        let mut guard = self.data.lock().map_err(|_| Error::StoreFailure("store lock poisoned".into()))?;
        let mut scratch = guard.clone();
        let result = f(&mut scratch)?;
        *guard = scratch;
        Ok(result)
    }

    pub fn snapshot(&self) -> Result<StoreData> {
        Ok(self
            .data
            .lock()
            .map_err(|_| Error::StoreFailure("store lock poisoned".into()))?
            .clone())
    }

    // --- Tasks -----------------------------------------------------------

    pub fn create_task(&self, mut task: TaskRecord) -> Result<TaskRecord> {
        self.transaction(|data| {
            let id = data.task_ids.next_id();
            task.id = id;
            dependency::validate(task.id, &task.dependencies, &data.dependency_graph())?;
            task.status = dependency::resolved_status(&task, |dep| data.status_of(dep));
            task.validate()?;
            data.tasks.insert(id, task.clone());
            Ok(task)
        })
    }

    pub fn get_task(&self, id: TaskId) -> Result<TaskRecord> {
        let data = self.snapshot()?;
        data.tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("task {id}")))
    }

    pub fn update_task<F>(&self, id: TaskId, mutate: F) -> Result<TaskRecord>
    where
        F: FnOnce(&mut TaskRecord),
    {
        self.transaction(|data| {
            let mut task = data
                .tasks
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
            mutate(&mut task);
            task.updated_at = Utc::now();
            let mut graph = data.dependency_graph();
            graph.remove(&id);
            dependency::validate(id, &task.dependencies, &graph)?;
            task.status = dependency::resolved_status(&task, |dep| data.status_of(dep));
            task.validate()?;
            data.tasks.insert(id, task.clone());
            let all = data.dependency_graph();
            cascade_on_create_or_update(data, &all, id);
            Ok(task)
        })
    }

    pub fn delete_task(&self, id: TaskId, force: bool) -> Result<()> {
        self.transaction(|data| {
            if !data.tasks.contains_key(&id) {
                return Err(Error::NotFound(format!("task {id}")));
            }
            let all = data.dependency_graph();
            let dependents = dependency::dependents_blocking_delete(id, &all);
            if !dependents.is_empty() && !force {
                return Err(Error::HasDependents(dependents.iter().map(|d| d.get()).collect()));
            }
            data.tasks.shift_remove(&id);
            data.completions.retain(|_, c| c.task_id != id);
            if force {
                for dependent in &dependents {
                    if let Some(mut task) = data.tasks.get(dependent).cloned() {
                        task.dependencies.retain(|dep| *dep != id);
                        data.tasks.insert(*dependent, task);
                    }
                }
                let all = data.dependency_graph();
                cascade_on_create_or_update_many(data, &all, dependents.iter().copied());
            }
            Ok(())
        })
    }

    pub fn list_tasks(&self, filter: &TaskFilter, at: DateTime<Utc>) -> Result<Vec<TaskRecord>> {
        let data = self.snapshot()?;
        Ok(data
            .tasks
            .values()
            .filter(|t| filter.matches(t, at))
            .cloned()
            .collect())
    }

    /// Tasks eligible for `getByPriority` (§4.2): Open and not Blocked,
    /// never Completed, sorted by descending priority then ascending id.
    pub fn tasks_by_priority(&self, at: DateTime<Utc>, limit: Option<usize>) -> Result<Vec<(TaskRecord, f64)>> {
        let data = self.snapshot()?;
        let mut scored: Vec<(TaskRecord, f64)> = data
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Open)
            .map(|t| {
                let p = curve::priority(t, at, |dep| data.status_of(dep));
                (t.clone(), p)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.id.cmp(&b.0.id))
        });
        if let Some(limit) = limit {
            scored.truncate(limit);
        }
        Ok(scored)
    }

    /// Scores tasks by token overlap between the query and title/project/
    /// tags, returning matching ids in descending relevance order.
    pub fn search_tasks(&self, query: &str) -> Result<Vec<TaskId>> {
        let data = self.snapshot()?;
        let tokens: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let mut scored: Vec<(TaskId, usize)> = Vec::new();
        for task in data.tasks.values() {
            let haystack = searchable_text(task);
            let score = tokens.iter().filter(|tok| haystack.contains(tok.as_str())).count();
            if score > 0 {
                scored.push((task.id, score));
            }
        }
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(scored.into_iter().map(|(id, _)| id).collect())
    }

    // --- Buckets -----------------------------------------------------------

    pub fn create_bucket(&self, mut bucket: BucketRecord) -> Result<BucketRecord> {
        self.transaction(|data| {
            if data.buckets.values().any(|b| b.name == bucket.name) {
                return Err(Error::Conflict(format!("bucket named {:?} already exists", bucket.name)));
            }
            let id = data.bucket_ids.next_id();
            bucket.id = id;
            bucket.validate()?;
            data.buckets.insert(id, bucket.clone());
            Ok(bucket)
        })
    }

    pub fn get_bucket(&self, id: BucketId) -> Result<BucketRecord> {
        let data = self.snapshot()?;
        data.buckets
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("bucket {id}")))
    }

    pub fn list_buckets(&self) -> Result<Vec<BucketRecord>> {
        Ok(self.snapshot()?.buckets.values().cloned().collect())
    }

    /// Deletes a bucket and clears `bucket_id` on every member task in the
    /// same transaction (I6).
    pub fn delete_bucket(&self, id: BucketId) -> Result<()> {
        self.transaction(|data| {
            if data.buckets.shift_remove(&id).is_none() {
                return Err(Error::NotFound(format!("bucket {id}")));
            }
            for task in data.tasks.values_mut() {
                if task.bucket_id == Some(id) {
                    task.bucket_id = None;
                    task.updated_at = Utc::now();
                }
            }
            Ok(())
        })
    }

    // --- Completions -------------------------------------------------------

    pub fn list_completions_for_task(&self, task_id: TaskId) -> Result<Vec<CompletionRecord>> {
        Ok(self
            .snapshot()?
            .completions
            .values()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect())
    }

    // --- Configuration -------------------------------------------------------

    pub fn config_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.snapshot()?.config.get(key).cloned())
    }

    pub fn config_set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.transaction(|data| {
            data.config.insert(key.into(), value.into());
            Ok(())
        })
    }

    pub fn version(&self) -> Result<String> {
        Ok(self
            .config_get(CONFIG_VERSION_KEY)?
            .unwrap_or_else(|| CURRENT_VERSION.to_string()))
    }

    // --- Persistence ---------------------------------------------------------

    pub fn load_from_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut data = StoreData::default();

        let tasks_file = dir.join("tasks.ron");
        if tasks_file.exists() {
            let items: Vec<TaskRecord> = load_items_from_file(&tasks_file)?;
            data.tasks = items.into_iter().map(|t| (t.id, t)).collect();
        }

        let buckets_file = dir.join("buckets.ron");
        if buckets_file.exists() {
            let items: Vec<BucketRecord> = load_items_from_file(&buckets_file)?;
            data.buckets = items.into_iter().map(|b| (b.id, b)).collect();
        }

        let completions_file = dir.join("completions.ron");
        if completions_file.exists() {
            let items: Vec<CompletionRecord> = load_items_from_file(&completions_file)?;
            data.completions = items.into_iter().map(|c| (c.id, c)).collect();
        }

        let config_file = dir.join("config.ron");
        if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            data.config = ron::from_str(&content)?;
        } else {
            data.config.insert(CONFIG_VERSION_KEY.to_string(), CURRENT_VERSION.to_string());
        }

        data.task_ids = sequence_after(data.tasks.keys());
        data.bucket_ids = sequence_after(data.buckets.keys());
        data.completion_ids = sequence_after(data.completions.keys());

        Ok(Self {
            data: Mutex::new(data),
        })
    }

    pub fn save_to_directory<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        ensure_directory(dir)?;
        let data = self.snapshot()?;

        let tasks: Vec<&TaskRecord> = data.tasks.values().collect();
        let buckets: Vec<&BucketRecord> = data.buckets.values().collect();
        let completions: Vec<&CompletionRecord> = data.completions.values().collect();

        save_items_to_file(&tasks, dir.join("tasks.ron"))?;
        save_items_to_file(&buckets, dir.join("buckets.ron"))?;
        save_items_to_file(&completions, dir.join("completions.ron"))?;

        let config_content = format_ron_pretty(&data.config)?;
        std::fs::write(dir.join("config.ron"), config_content)?;

        Ok(())
    }
}

/// Inserts `completion` into `data`, assigning it a dense id. Exposed as a
/// free function (rather than a `Store` method) so the lifecycle
/// orchestrator can call it from inside an already-open transaction
/// closure without re-borrowing the store.
pub fn insert_completion(data: &mut StoreData, mut completion: CompletionRecord) -> Result<CompletionRecord> {
    let id = data.completion_ids.next_id();
    completion.id = id;
    completion.validate()?;
    data.completions.insert(id, completion.clone());
    Ok(completion)
}

fn searchable_text(task: &TaskRecord) -> String {
    let mut text = task.title.to_lowercase();
    if let Some(project) = &task.project {
        text.push(' ');
        text.push_str(&project.to_lowercase());
    }
    for tag in &task.tags {
        text.push(' ');
        text.push_str(&tag.to_lowercase());
    }
    text
}

fn sequence_after<'a, T>(ids: impl Iterator<Item = &'a taskcurve_core::Id<T>>) -> IdSequence<T>
where
    T: 'a,
{
    let max = ids.map(|id| id.get()).max().unwrap_or(0);
    IdSequence::starting_after(max)
}

fn cascade_on_create_or_update(data: &mut StoreData, _all: &HashMap<TaskId, Vec<TaskId>>, task_id: TaskId) {
    cascade_on_create_or_update_many(data, _all, std::iter::once(task_id));
}

fn cascade_on_create_or_update_many(
    data: &mut StoreData,
    _all: &HashMap<TaskId, Vec<TaskId>>,
    ids: impl Iterator<Item = TaskId>,
) {
    for id in ids {
        if let Some(task) = data.tasks.get(&id).cloned() {
            let resolved = dependency::resolved_status(&task, |dep| data.status_of(dep));
            if let Some(task) = data.tasks.get_mut(&id) {
                task.status = resolved;
            }
        }
    }
}

pub fn load_items_from_file<T, P>(path: P) -> Result<Vec<T>>
where
    T: for<'de> serde::Deserialize<'de>,
    P: AsRef<Path>,
{
    let content = std::fs::read_to_string(path)?;
    let items: Vec<T> = ron::from_str(&content)?;
    Ok(items)
}

pub fn save_items_to_file<T, P>(items: &[T], path: P) -> Result<()>
where
    T: serde::Serialize,
    P: AsRef<Path>,
{
    let content = format_ron_pretty(items)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CurveConfig;
    use indexmap::IndexSet;

    fn new_task(title: &str) -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            id: TaskId::new(1),
            title: title.into(),
            project: None,
            bucket_id: None,
            tags: IndexSet::new(),
            deadline: None,
            estimate_minutes: None,
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
    fn create_task_assigns_dense_ids() {
        let store = Store::new();
        let first = store.create_task(new_task("a")).unwrap();
        let second = store.create_task(new_task("b")).unwrap();
        assert_eq!(first.id.get(), 1);
        assert_eq!(second.id.get(), 2);
    }

    #[test]
    fn create_task_with_unmet_dependency_is_blocked() {
        let store = Store::new();
        let dep = store.create_task(new_task("dep")).unwrap();
        let mut dependent = new_task("dependent");
        dependent.dependencies.push(dep.id);
        let dependent = store.create_task(dependent).unwrap();
        assert_eq!(dependent.status, TaskStatus::Blocked);
    }

    #[test]
    fn delete_task_with_dependents_fails_without_force() {
        let store = Store::new();
        let dep = store.create_task(new_task("dep")).unwrap();
        let mut dependent = new_task("dependent");
        dependent.dependencies.push(dep.id);
        store.create_task(dependent).unwrap();
        let err = store.delete_task(dep.id, false).unwrap_err();
        assert!(matches!(err, Error::HasDependents(_)));
    }

    #[test]
    fn delete_bucket_clears_member_task_bucket_id() {
        let store = Store::new();
        let bucket = store
            .create_bucket(BucketRecord {
                id: BucketId::new(1),
                name: "home".into(),
                kind: crate::model::BucketType::Context,
                config: IndexMap::new(),
            })
            .unwrap();
        let mut task = new_task("water plants");
        task.bucket_id = Some(bucket.id);
        let task = store.create_task(task).unwrap();
        store.delete_bucket(bucket.id).unwrap();
        let refreshed = store.get_task(task.id).unwrap();
        assert_eq!(refreshed.bucket_id, None);
    }

    #[test]
    fn transaction_rolls_back_on_failure() {
        let store = Store::new();
        store.create_task(new_task("first")).unwrap();
        let result: Result<()> = store.transaction(|data| {
            data.tasks.clear();
            Err(Error::Validation("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.snapshot().unwrap().tasks.len(), 1);
    }

    #[test]
    fn search_ranks_by_token_overlap() {
        let store = Store::new();
        store.create_task(new_task("write quarterly summary")).unwrap();
        store.create_task(new_task("write report outline")).unwrap();
        let ids = store.search_tasks("write report").unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].get(), 2);
    }
}
