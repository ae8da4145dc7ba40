mod commands;
mod context;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use taskcurve_core::Result;
use tracing_subscriber::EnvFilter;

use commands::{bucket::BucketCommands, plan::PlanArgs, task::TaskCommands, transfer};
use context::AppContext;

#[derive(Parser)]
#[command(name = "taskcurve", version, about = "Time-aware task prioritization and daily planning")]
struct Cli {
    /// Directory the store persists to (default: ./.taskcurve)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new, empty store in the data directory
    Init,

    /// Task operations
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Bucket operations
    Bucket {
        #[command(subcommand)]
        command: BucketCommands,
    },

    /// Show Open tasks ranked by priority
    Priority {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show a task's completion history and next-due timeline
    Timeline { id: u64 },

    /// Build today's packed schedule from current priorities
    Plan(PlanArgs),

    /// Export the full store to a JSON snapshot file
    Export(transfer::ExportArgs),

    /// Import a JSON snapshot file, replacing or merging with the store
    Import(transfer::ImportArgs),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = context::resolve_data_dir(cli.data_dir);
    tracing::debug!(data_dir = %data_dir.display(), "resolved data directory");

    match cli.command {
        Commands::Init => {
            let ctx = AppContext {
                store: taskcurve_engine::Store::new(),
                data_dir,
            };
            ctx.save()?;
            println!("initialized store at {}", ctx.data_dir.display());
            Ok(())
        }
        Commands::Task { command } => {
            let ctx = AppContext::load(data_dir)?;
            commands::task::execute(command, &ctx)
        }
        Commands::Bucket { command } => {
            let ctx = AppContext::load(data_dir)?;
            commands::bucket::execute(command, &ctx)
        }
        Commands::Priority { limit } => {
            let ctx = AppContext::load(data_dir)?;
            commands::task::show_priority_ranking(&ctx, limit)
        }
        Commands::Timeline { id } => {
            let ctx = AppContext::load(data_dir)?;
            commands::task::show_timeline(&ctx, id)
        }
        Commands::Plan(args) => {
            let ctx = AppContext::load(data_dir)?;
            commands::plan::execute(args, &ctx)
        }
        Commands::Export(args) => {
            let ctx = AppContext::load(data_dir)?;
            transfer::export(&ctx, args)
        }
        Commands::Import(args) => {
            let ctx = AppContext::load(data_dir)?;
            transfer::import(&ctx, args)
        }
    }
}
