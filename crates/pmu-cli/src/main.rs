mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{branch::BranchSubcommand, config::ConfigSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gh-pmu",
    about = "Track release branches on a GitHub Project: tracker issues, membership, and close-out",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: auto-detect from .gh-pmu.yml or .git/)
    #[arg(long, global = true, env = "GH_PMU_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start, close, and manage release branches
    Branch {
        #[command(subcommand)]
        subcommand: BranchSubcommand,
    },

    /// Show project items grouped by status
    Board {
        /// Include closed issues
        #[arg(long)]
        all: bool,

        /// Only show items with this status
        #[arg(long)]
        status: Option<String>,
    },

    /// Validate .gh-pmu.yml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Branch { subcommand } => cmd::branch::run(&root, subcommand, cli.json),
        Commands::Board { all, status } => cmd::board::run(&root, all, status.as_deref(), cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
