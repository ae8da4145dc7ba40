use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use colored::Colorize;
use taskcurve_core::Result;
use taskcurve_engine::transfer::{self, ImportMode, ImportSnapshot};

use crate::context::AppContext;

#[derive(Args)]
pub struct ExportArgs {
    #[arg(long, default_value = "export.json")]
    output: PathBuf,
}

#[derive(Args)]
pub struct ImportArgs {
    file: PathBuf,
    #[arg(long)]
    merge: bool,
}

pub fn export(ctx: &AppContext, args: ExportArgs) -> Result<()> {
    let snapshot = transfer::export(&ctx.store, Utc::now())?;
    let content = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(&args.output, content)?;
    println!("{} {} task(s) to {}", "exported".green(), snapshot.tasks.len(), args.output.display());
    Ok(())
}

pub fn import(ctx: &AppContext, args: ImportArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)?;
    let snapshot: ImportSnapshot = serde_json::from_str(&content)?;
    let mode = if args.merge { ImportMode::Merge } else { ImportMode::Replace };
    let report = transfer::import(&ctx.store, &snapshot, mode)?;
    ctx.save()?;
    println!(
        "{} tasks: {} imported, {} skipped",
        "tasks".blue(),
        report.tasks.imported,
        report.tasks.skipped
    );
    println!(
        "{} buckets: {} imported, {} skipped",
        "buckets".blue(),
        report.buckets.imported,
        report.buckets.skipped
    );
    println!(
        "{} completions: {} imported, {} skipped",
        "completions".blue(),
        report.completions.imported,
        report.completions.skipped
    );
    Ok(())
}
