use chrono::{DateTime, NaiveTime, Utc};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use taskcurve_core::{Error, Result};
use taskcurve_engine::{
    curve, lifecycle,
    model::{CurveConfig, IntervalUnit, RecurrenceKind, RecurrenceMode, RecurrencePattern},
    store::TaskFilter,
    TaskId, TaskRecord, TaskStatus,
};

use crate::context::AppContext;
use crate::utils::{format_priority, priority_color, truncate_string};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a new task
    Create {
        title: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        estimate: Option<u32>,
        #[arg(long)]
        bucket: Option<u64>,
        /// resolve a bucket by name instead of id; unresolved names warn rather than fail
        #[arg(long, conflicts_with = "bucket")]
        bucket_name: Option<String>,
        #[arg(long)]
        window_start: Option<String>,
        #[arg(long)]
        window_end: Option<String>,
        #[arg(long, value_delimiter = ',')]
        depends_on: Vec<u64>,
        /// daily|weekly|monthly|interval
        #[arg(long)]
        recur_kind: Option<String>,
        /// calendar|completion (default calendar)
        #[arg(long)]
        recur_mode: Option<String>,
        #[arg(long)]
        recur_interval: Option<u32>,
        /// days|weeks|months
        #[arg(long)]
        recur_unit: Option<String>,
    },

    /// List tasks, optionally filtered
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        bucket: Option<u64>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        has_deadline: bool,
        #[arg(long)]
        has_recurrence: bool,
        #[arg(long)]
        overdue: bool,
    },

    /// Show a single task's full detail
    Show { id: u64 },

    /// Update a task's fields
    Update {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        estimate: Option<u32>,
        #[arg(long)]
        bucket: Option<u64>,
        #[arg(long, value_delimiter = ',')]
        depends_on: Option<Vec<u64>>,
    },

    /// Complete a task (or advance it, if recurring)
    Complete {
        id: u64,
        #[arg(long)]
        at: Option<String>,
    },

    /// Delete a task
    Delete {
        id: u64,
        #[arg(long)]
        force: bool,
    },

    /// Reopen a completed task
    Reopen { id: u64 },

    /// Full-text search over title/project/tags
    Search { query: String },
}

pub fn execute(command: TaskCommands, ctx: &AppContext) -> Result<()> {
    match command {
        TaskCommands::Create {
            title,
            project,
            tags,
            deadline,
            estimate,
            bucket,
            bucket_name,
            window_start,
            window_end,
            depends_on,
            recur_kind,
            recur_mode,
            recur_interval,
            recur_unit,
        } => create(
            ctx,
            title,
            project,
            tags,
            deadline,
            estimate,
            bucket,
            bucket_name,
            window_start,
            window_end,
            depends_on,
            recur_kind,
            recur_mode,
            recur_interval,
            recur_unit,
        ),
        TaskCommands::List {
            status,
            project,
            bucket,
            tags,
            has_deadline,
            has_recurrence,
            overdue,
        } => list(ctx, status, project, bucket, tags, has_deadline, has_recurrence, overdue),
        TaskCommands::Show { id } => show(ctx, id),
        TaskCommands::Update {
            id,
            title,
            project,
            deadline,
            estimate,
            bucket,
            depends_on,
        } => update(ctx, id, title, project, deadline, estimate, bucket, depends_on),
        TaskCommands::Complete { id, at } => complete(ctx, id, at),
        TaskCommands::Delete { id, force } => delete(ctx, id, force),
        TaskCommands::Reopen { id } => reopen(ctx, id),
        TaskCommands::Search { query } => search(ctx, query),
    }
}

#[allow(clippy::too_many_arguments)]
fn create(
    ctx: &AppContext,
    title: String,
    project: Option<String>,
    tags: Vec<String>,
    deadline: Option<String>,
    estimate: Option<u32>,
    bucket: Option<u64>,
    bucket_name: Option<String>,
    window_start: Option<String>,
    window_end: Option<String>,
    depends_on: Vec<u64>,
    recur_kind: Option<String>,
    recur_mode: Option<String>,
    recur_interval: Option<u32>,
    recur_unit: Option<String>,
) -> Result<()> {
    let now = Utc::now();
    let deadline = deadline.map(|d| parse_datetime(&d)).transpose()?;
    let window_start = window_start.map(|w| parse_time(&w)).transpose()?;
    let window_end = window_end.map(|w| parse_time(&w)).transpose()?;
    let dependencies: Vec<TaskId> = depends_on
        .into_iter()
        .map(TaskId::try_new)
        .collect::<Result<Vec<_>>>()?;

    let bucket_id = if bucket_name.is_some() {
        let (resolved, warning) = taskcurve_engine::intake::resolve_bucket_name(&ctx.store, bucket_name.as_deref())?;
        if let Some(warning) = warning {
            println!("{} no bucket named {:?}; task created without a bucket", "warning:".yellow(), warning.requested_name);
        }
        resolved
    } else {
        bucket.map(taskcurve_engine::BucketId::try_new).transpose()?
    };

    let recurrence_pattern = recur_kind.map(|k| parse_recurrence(&k, recur_mode, recur_interval, recur_unit)).transpose()?;

    let curve_config = curve::infer_default_curve(
        window_start,
        window_end,
        !dependencies.is_empty(),
        recurrence_pattern.is_some(),
        now,
        deadline,
    );

    let task = TaskRecord {
        id: TaskId::new(1),
        title,
        project,
        bucket_id,
        tags: tags.into_iter().collect(),
        deadline,
        estimate_minutes: estimate,
        recurrence_pattern,
        window_start,
        window_end,
        dependencies,
        curve_config,
        status: TaskStatus::Open,
        last_completed_at: None,
        next_due_at: None,
        created_at: now,
        updated_at: now,
    };

    let created = ctx.store.create_task(task)?;
    ctx.save()?;
    println!("{} task {}", "created".green(), created.id);
    Ok(())
}

fn parse_recurrence(
    kind: &str,
    mode: Option<String>,
    interval: Option<u32>,
    unit: Option<String>,
) -> Result<RecurrencePattern> {
    let kind = match kind.to_lowercase().as_str() {
        "daily" => RecurrenceKind::Daily,
        "weekly" => RecurrenceKind::Weekly,
        "monthly" => RecurrenceKind::Monthly,
        "interval" => RecurrenceKind::Interval,
        other => return Err(Error::Validation(format!("unrecognized recurrence kind {other:?}"))),
    };
    let mode = match mode.as_deref().map(str::to_lowercase).as_deref() {
        Some("completion") => RecurrenceMode::Completion,
        Some("calendar") | None => RecurrenceMode::Calendar,
        Some(other) => return Err(Error::Validation(format!("unrecognized recurrence mode {other:?}"))),
    };
    let unit = match unit.as_deref().map(str::to_lowercase).as_deref() {
        Some("days") => Some(IntervalUnit::Days),
        Some("weeks") => Some(IntervalUnit::Weeks),
        Some("months") => Some(IntervalUnit::Months),
        Some(other) => return Err(Error::Validation(format!("unrecognized recurrence unit {other:?}"))),
        None => None,
    };
    let pattern = RecurrencePattern {
        mode,
        kind,
        interval,
        unit,
        day_of_week: None,
        days_of_week: None,
        time_of_day: None,
        anchor: None,
    };
    pattern.validate()?;
    Ok(pattern)
}

#[allow(clippy::too_many_arguments)]
fn list(
    ctx: &AppContext,
    status: Option<String>,
    project: Option<String>,
    bucket: Option<u64>,
    tags: Vec<String>,
    has_deadline: bool,
    has_recurrence: bool,
    overdue: bool,
) -> Result<()> {
    let status = status.map(|s| parse_status(&s)).transpose()?;
    let bucket_id = bucket.map(taskcurve_engine::BucketId::try_new).transpose()?;
    let filter = TaskFilter {
        status,
        project,
        bucket_id: bucket_id.map(Some),
        tags,
        has_deadline: has_deadline.then_some(true),
        has_recurrence: has_recurrence.then_some(true),
        overdue: overdue.then_some(true),
    };
    let tasks = ctx.store.list_tasks(&filter, Utc::now())?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["id", "title", "status", "project", "deadline"]);
    for task in &tasks {
        table.add_row(vec![
            task.id.to_string(),
            truncate_string(&task.title, 40),
            task.status.to_string(),
            task.project.clone().unwrap_or_default(),
            task.deadline.map(|d| d.to_rfc3339()).unwrap_or_default(),
        ]);
    }
    println!("{table}");
    println!("{} task(s)", tasks.len());
    Ok(())
}

fn show(ctx: &AppContext, id: u64) -> Result<()> {
    let task = ctx.store.get_task(TaskId::try_new(id)?)?;
    println!("{}", task.title.bold());
    println!("  id: {}", task.id);
    println!("  status: {}", task.status);
    if let Some(project) = &task.project {
        println!("  project: {project}");
    }
    if let Some(bucket_id) = task.bucket_id {
        match ctx.store.get_bucket(bucket_id) {
            Ok(bucket) => println!("  bucket: {}", bucket.name),
            Err(_) => println!("  bucket: {bucket_id}"),
        }
    }
    if !task.tags.is_empty() {
        println!("  tags: {}", task.tags.iter().cloned().collect::<Vec<_>>().join(", "));
    }
    if let Some(deadline) = task.deadline {
        println!("  deadline: {}", deadline.to_rfc3339());
    }
    if let Some(estimate) = task.estimate_minutes {
        println!("  estimate: {estimate} min");
    }
    if !task.dependencies.is_empty() {
        let deps: Vec<String> = task.dependencies.iter().map(|d| d.to_string()).collect();
        println!("  depends on: {}", deps.join(", "));
    }
    println!("  curve: {}", describe_curve(&task.curve_config));
    let priority = curve::priority(&task, Utc::now(), |dep| {
        ctx.store.get_task(dep).ok().map(|t| t.status)
    });
    println!(
        "  priority (now): {}",
        format_priority(priority).color(priority_color(priority))
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn update(
    ctx: &AppContext,
    id: u64,
    title: Option<String>,
    project: Option<String>,
    deadline: Option<String>,
    estimate: Option<u32>,
    bucket: Option<u64>,
    depends_on: Option<Vec<u64>>,
) -> Result<()> {
    let deadline = deadline.map(|d| parse_datetime(&d)).transpose()?;
    let task_id = TaskId::try_new(id)?;
    let bucket = bucket.map(taskcurve_engine::BucketId::try_new).transpose()?;
    let depends_on = depends_on
        .map(|deps| deps.into_iter().map(TaskId::try_new).collect::<Result<Vec<_>>>())
        .transpose()?;
    let updated = ctx.store.update_task(task_id, |task| {
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(project) = project {
            task.project = Some(project);
        }
        if let Some(deadline) = deadline {
            task.deadline = Some(deadline);
        }
        if let Some(estimate) = estimate {
            task.estimate_minutes = Some(estimate);
        }
        if let Some(bucket) = bucket {
            task.bucket_id = Some(bucket);
        }
        if let Some(depends_on) = depends_on {
            task.dependencies = depends_on;
        }
    })?;
    ctx.save()?;
    println!("{} task {}", "updated".green(), updated.id);
    Ok(())
}

fn complete(ctx: &AppContext, id: u64, at: Option<String>) -> Result<()> {
    let at = at.map(|a| parse_datetime(&a)).transpose()?;
    let outcome = lifecycle::complete(&ctx.store, TaskId::try_new(id)?, at)?;
    ctx.save()?;
    match outcome.task.status {
        TaskStatus::Completed => println!("{} task {}", "completed".green(), outcome.task.id),
        _ => println!(
            "{} task {}, next due {}",
            "advanced".green(),
            outcome.task.id,
            outcome.task.next_due_at.map(|d| d.to_rfc3339()).unwrap_or_default()
        ),
    }
    for id in &outcome.unblocked {
        println!("  {} task {id}", "unblocked".blue());
    }
    Ok(())
}

fn delete(ctx: &AppContext, id: u64, force: bool) -> Result<()> {
    ctx.store.delete_task(TaskId::try_new(id)?, force)?;
    ctx.save()?;
    println!("{} task {id}", "deleted".green());
    Ok(())
}

fn reopen(ctx: &AppContext, id: u64) -> Result<()> {
    let task = lifecycle::reopen(&ctx.store, TaskId::try_new(id)?)?;
    ctx.save()?;
    println!("{} task {} ({})", "reopened".green(), task.id, task.status);
    Ok(())
}

fn search(ctx: &AppContext, query: String) -> Result<()> {
    let ids = ctx.store.search_tasks(&query)?;
    for id in &ids {
        let task = ctx.store.get_task(*id)?;
        println!("{}  {}", id, task.title);
    }
    println!("{} match(es)", ids.len());
    Ok(())
}

pub fn show_priority_ranking(ctx: &AppContext, limit: Option<usize>) -> Result<()> {
    let ranked = ctx.store.tasks_by_priority(Utc::now(), limit)?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["id", "title", "priority"]);
    for (task, priority) in &ranked {
        table.add_row(vec![
            task.id.to_string(),
            truncate_string(&task.title, 40),
            format_priority(*priority),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn show_timeline(ctx: &AppContext, id: u64) -> Result<()> {
    let task_id = TaskId::try_new(id)?;
    let task = ctx.store.get_task(task_id)?;
    println!("{}", task.title.bold());
    println!("  status: {}", task.status);
    if let Some(last) = task.last_completed_at {
        println!("  last completed: {}", last.to_rfc3339());
    }
    if let Some(next) = task.next_due_at {
        println!("  next due: {}", next.to_rfc3339());
    }
    if task.status == TaskStatus::Blocked {
        let snapshot = ctx.store.snapshot()?;
        let unmet: Vec<String> = task
            .dependencies
            .iter()
            .filter(|dep| snapshot.tasks.get(dep).map(|t| t.status) != Some(TaskStatus::Completed))
            .map(|dep| dep.to_string())
            .collect();
        if !unmet.is_empty() {
            println!("  blocked by: {}", unmet.join(", "));
        }
    }
    let completions = ctx.store.list_completions_for_task(task_id)?;
    for completion in &completions {
        println!(
            "  completion {} at {}",
            completion.id,
            completion.completed_at.to_rfc3339()
        );
    }
    Ok(())
}

fn parse_datetime(input: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::Validation(format!("invalid ISO-8601 datetime {input:?}: {e}")))
}

fn parse_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input, "%H:%M")
        .map_err(|e| Error::Validation(format!("invalid HH:MM time {input:?}: {e}")))
}

fn parse_status(input: &str) -> Result<TaskStatus> {
    match input.to_lowercase().as_str() {
        "open" => Ok(TaskStatus::Open),
        "inprogress" | "in-progress" | "in_progress" => Ok(TaskStatus::InProgress),
        "completed" => Ok(TaskStatus::Completed),
        "blocked" => Ok(TaskStatus::Blocked),
        other => Err(Error::Validation(format!("unrecognized status {other:?}"))),
    }
}

fn describe_curve(curve: &CurveConfig) -> &'static str {
    match curve {
        CurveConfig::Linear { .. } => "linear",
        CurveConfig::Exponential { .. } => "exponential",
        CurveConfig::HardWindow { .. } => "hard window",
        CurveConfig::Blocked { .. } => "blocked",
        CurveConfig::Accumulator { .. } => "accumulator",
    }
}
