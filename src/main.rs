//! Lien CLI - local code-intelligence engine.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lien::cli::{self, Commands};

/// Lien - semantic code index and complexity analysis for a workspace
#[derive(Parser)]
#[command(name = "lien")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Workspace root (defaults to the current directory)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "lien=debug" } else { "lien=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let workspace = args
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| args.workspace.clone());

    let exit_code = match args.command {
        Commands::Init => cli::run_init(&workspace)?,
        Commands::Index { force } => cli::run_index(&workspace, force).await?,
        Commands::Serve { no_watch, root } => {
            let root = root
                .map(|r| r.canonicalize().unwrap_or(r))
                .unwrap_or(workspace);
            cli::run_serve(&root, no_watch).await?
        }
        Commands::Status => cli::run_status(&workspace).await?,
        Commands::Complexity {
            files,
            format,
            threshold,
            fail_on,
        } => cli::run_complexity(&workspace, files, format, threshold, fail_on).await?,
        Commands::Graph {
            root_file,
            depth,
            direction,
            module_level,
        } => cli::run_graph(&workspace, root_file, depth, direction, module_level).await?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
