use chrono::{NaiveTime, Utc};
use clap::Args;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use taskcurve_core::{Error, Result};
use taskcurve_engine::planner::{self, PlannerOptions};

use crate::context::AppContext;

#[derive(Args)]
pub struct PlanArgs {
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long)]
    work_hours_start: Option<String>,
    #[arg(long)]
    work_hours_end: Option<String>,
    #[arg(long)]
    no_time_blocks: bool,
}

pub fn execute(args: PlanArgs, ctx: &AppContext) -> Result<()> {
    let defaults = taskcurve_engine::config::load_defaults(&ctx.store)?;
    let mut options = PlannerOptions {
        work_hours_start: defaults.work_hours_start,
        work_hours_end: defaults.work_hours_end,
        ..PlannerOptions::default()
    };
    if let Some(limit) = args.limit {
        options.limit = limit;
    }
    if let Some(start) = args.work_hours_start {
        options.work_hours_start = parse_time(&start)?;
    }
    if let Some(end) = args.work_hours_end {
        options.work_hours_end = parse_time(&end)?;
    }
    options.include_time_blocks = !args.no_time_blocks;

    let at = Utc::now();
    let candidates = ctx.store.tasks_by_priority(at, None)?;
    let result = planner::plan(&candidates, at, &options);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["id", "task", "start", "end", "minutes"]);
    for entry in &result.scheduled {
        let title = ctx
            .store
            .get_task(entry.task_id)
            .map(|t| t.title)
            .unwrap_or_default();
        table.add_row(vec![
            entry.task_id.to_string(),
            title,
            entry.slot.start.format("%H:%M").to_string(),
            entry.slot.end.format("%H:%M").to_string(),
            entry.estimate_minutes.to_string(),
        ]);
    }
    println!("{table}");
    println!(
        "{} scheduled, {} min used, {} min remaining",
        result.scheduled.len(),
        result.total_scheduled_minutes,
        result.remaining_minutes
    );
    for entry in &result.unscheduled {
        println!("  {} task {} ({})", "unscheduled".yellow(), entry.task_id, entry.reason);
    }
    Ok(())
}

fn parse_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input, "%H:%M")
        .map_err(|e| Error::Validation(format!("invalid HH:MM time {input:?}: {e}")))
}
