use agentic15_cli::cmd::{
    self, plan::PlanSubcommand, platform::PlatformSubcommand, task::TaskSubcommand,
};
use agentic15_cli::root;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "agentic15",
    about = "Plan-driven task workflow with GitHub Issues and Azure DevOps sync",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .claude/ or .git/)
    #[arg(long, global = true, env = "AGENTIC15_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize agentic15 in the current project
    Init,

    /// Generate, lock, and archive plans
    Plan {
        #[command(subcommand)]
        subcommand: PlanSubcommand,
    },

    /// Move tasks through their lifecycle
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Commit, push, and open a pull request for the active task
    Commit,

    /// After a merge: return to the default branch and clean up
    Sync,

    /// Plan progress, active task, and detected platform
    Status,

    /// Inspect platform detection and integration readiness
    Platform {
        #[command(subcommand)]
        subcommand: PlatformSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Plan { subcommand } => cmd::plan::run(&root, subcommand, cli.json),
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
        Commands::Commit => cmd::commit::run(&root, cli.json),
        Commands::Sync => cmd::sync::run(&root, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Platform { subcommand } => cmd::platform::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
