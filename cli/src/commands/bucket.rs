use clap::Subcommand;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use taskcurve_core::{Error, Result};
use taskcurve_engine::{model::BucketType, BucketId, BucketRecord};

use crate::context::AppContext;

#[derive(Subcommand)]
pub enum BucketCommands {
    /// Create a bucket
    Create {
        name: String,
        /// project|category|context (default project)
        #[arg(long)]
        kind: Option<String>,
    },

    /// List all buckets
    List,

    /// Show a single bucket
    Show { id: u64 },

    /// Delete a bucket, clearing bucket_id on its member tasks
    Delete { id: u64 },
}

pub fn execute(command: BucketCommands, ctx: &AppContext) -> Result<()> {
    match command {
        BucketCommands::Create { name, kind } => create(ctx, name, kind),
        BucketCommands::List => list(ctx),
        BucketCommands::Show { id } => show(ctx, id),
        BucketCommands::Delete { id } => delete(ctx, id),
    }
}

fn create(ctx: &AppContext, name: String, kind: Option<String>) -> Result<()> {
    let kind = parse_kind(kind.as_deref())?;
    let bucket = BucketRecord {
        id: BucketId::new(1),
        name,
        kind,
        config: Default::default(),
    };
    let created = ctx.store.create_bucket(bucket)?;
    ctx.save()?;
    println!("{} bucket {}", "created".green(), created.id);
    Ok(())
}

fn list(ctx: &AppContext) -> Result<()> {
    let buckets = ctx.store.list_buckets()?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["id", "name", "kind"]);
    for bucket in &buckets {
        table.add_row(vec![bucket.id.to_string(), bucket.name.clone(), kind_label(bucket.kind).into()]);
    }
    println!("{table}");
    println!("{} bucket(s)", buckets.len());
    Ok(())
}

fn show(ctx: &AppContext, id: u64) -> Result<()> {
    let bucket = ctx.store.get_bucket(BucketId::try_new(id)?)?;
    println!("{}", bucket.name.bold());
    println!("  id: {}", bucket.id);
    println!("  kind: {}", kind_label(bucket.kind));
    Ok(())
}

fn delete(ctx: &AppContext, id: u64) -> Result<()> {
    ctx.store.delete_bucket(BucketId::try_new(id)?)?;
    ctx.save()?;
    println!("{} bucket {id}", "deleted".green());
    Ok(())
}

fn parse_kind(kind: Option<&str>) -> Result<BucketType> {
    match kind.map(str::to_lowercase).as_deref() {
        Some("project") | None => Ok(BucketType::Project),
        Some("category") => Ok(BucketType::Category),
        Some("context") => Ok(BucketType::Context),
        Some(other) => Err(Error::Validation(format!("unrecognized bucket kind {other:?}"))),
    }
}

fn kind_label(kind: BucketType) -> &'static str {
    match kind {
        BucketType::Project => "project",
        BucketType::Category => "category",
        BucketType::Context => "context",
    }
}
