mod app;
mod config;
mod error;
mod git;
mod input;
mod logger;
mod report;
mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use app::{App, Exit, SyncArgs};
use config::Config;
use error::{Error, Result};
use sync::DivergenceChoice;

#[derive(Parser)]
#[command(name = "bsync", version)]
#[command(about = "Classify and reconcile Git branches against their upstream")]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', global = true, default_value = ".")]
    dir: PathBuf,

    /// Never prompt; divergence is reported instead of resolved
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how branches relate to their upstream
    Status {
        /// Branches to inspect (defaults to the current branch)
        branches: Vec<String>,
        /// Inspect every local branch
        #[arg(long, conflicts_with = "branches")]
        all: bool,
        /// Fetch the default remote first
        #[arg(long)]
        fetch: bool,
    },

    /// Bring a branch in line with its upstream
    Sync {
        /// Branch to sync (defaults to the current branch)
        branch: Option<String>,
        /// Skip fetching before classifying
        #[arg(long)]
        no_fetch: bool,
        /// Continue with stale remote state if the fetch fails
        #[arg(long)]
        allow_stale: bool,
        /// Push without asking
        #[arg(short, long)]
        yes: bool,
        /// How to reconcile a diverged branch
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,
    },

    /// Fetch and prune a remote
    Fetch {
        /// Remote name (defaults to the configured remote)
        remote: Option<String>,
    },

    /// List local branches
    List,

    /// Create a branch
    Create {
        name: String,
        /// Start point (defaults to HEAD)
        #[arg(long)]
        from: Option<String>,
    },

    /// Delete a local branch
    Delete {
        name: String,
        /// Delete even if not merged into HEAD
        #[arg(short, long)]
        force: bool,
    },

    /// Delete local branches already merged into a base branch
    Cleanup {
        /// Base branch (defaults to the configured default branch)
        #[arg(long)]
        base: Option<String>,
        /// Only list what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Merge,
    Rebase,
}

impl From<Strategy> for DivergenceChoice {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Merge => DivergenceChoice::Merge,
            Strategy::Rebase => DivergenceChoice::Rebase,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(exit) => std::process::exit(exit.code()),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            // Show user-friendly error messages for common git errors
            let message = match &e {
                Error::NotARepository(_) => {
                    format!("{}\n\nRun 'git init' to initialize a new repository.", e)
                }
                Error::Git(git_err) if git_err.code() == git2::ErrorCode::UnbornBranch => {
                    "Repository has no commits yet.\n\nCreate your first commit first.".to_string()
                }
                Error::UpstreamGone { branch, .. } => format!(
                    "{}\n\nDelete the branch if it was merged, or run \
                     'git branch --unset-upstream {}' to publish it again.",
                    e, branch
                ),
                Error::RemoteUnreachable { .. } => {
                    format!("{}\n\nRetry, or pass --allow-stale to use what is known locally.", e)
                }
                _ => e.to_string(),
            };
            eprintln!("error: {}", message);
            std::process::exit(Exit::Failure.code());
        }
    }
}

fn run(cli: Cli) -> Result<Exit> {
    let config = Config::load()?;
    logger::init(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let app = App::new(config, &cli.dir, cli.non_interactive, cli.json)?;

    match cli.command {
        Commands::Status {
            branches,
            all,
            fetch,
        } => app.status(branches, all, fetch),
        Commands::Sync {
            branch,
            no_fetch,
            allow_stale,
            yes,
            strategy,
        } => app.sync(SyncArgs {
            branch,
            no_fetch,
            allow_stale,
            yes,
            strategy: strategy.map(DivergenceChoice::from),
        }),
        Commands::Fetch { remote } => app.fetch(remote),
        Commands::List => app.list(),
        Commands::Create { name, from } => app.create(&name, from.as_deref()),
        Commands::Delete { name, force } => app.delete(&name, force),
        Commands::Cleanup { base, dry_run } => app.cleanup(base, dry_run),
    }
}
