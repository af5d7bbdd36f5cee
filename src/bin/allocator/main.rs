//! Fair Allocator CLI
//!
//! Command-line interface for creating rounds, scoring applicants and
//! exporting ranked allocations.

mod commands;
mod style;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use style::*;
use tracing_subscriber::EnvFilter;

use commands::applicant::ApplicantCommand;
use commands::committee::CommitteeCommand;
use commands::export::ExportCommand;
use commands::key::KeyCommand;
use commands::round::RoundCommand;
use commands::Session;

#[derive(Parser)]
#[command(name = "allocator")]
#[command(version)]
#[command(about = "Fair Allocator - Rank and allocate rounds by FairScore", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (embedded defaults when missing)
    #[arg(
        short,
        long,
        env = "ALLOCATOR_CONFIG",
        default_value = "config.toml",
        global = true
    )]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, list, inspect, share and import rounds
    #[command(subcommand, visible_alias = "r")]
    Round(RoundCommand),

    /// Add, remove and override applicants
    #[command(subcommand, visible_alias = "a")]
    Applicant(ApplicantCommand),

    /// Export a round as CSV or JSON
    #[command(subcommand, visible_alias = "x")]
    Export(ExportCommand),

    /// Verify the committee wallet that unlocks privileged actions
    #[command(subcommand, visible_alias = "c")]
    Committee(CommitteeCommand),

    /// Manage the FairScale API key
    #[command(subcommand)]
    Key(KeyCommand),

    /// Show effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(cli).await {
        print_error(&format!("{}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = fair_allocator::Config::load_from(&cli.config)?;

    if let Commands::Config = cli.command {
        return commands::config::run(&config);
    }

    let mut session = Session::open(config)?;

    match cli.command {
        Commands::Round(cmd) => commands::round::run(&mut session, cmd),
        Commands::Applicant(cmd) => commands::applicant::run(&mut session, cmd).await,
        Commands::Export(cmd) => commands::export::run(&mut session, cmd),
        Commands::Committee(cmd) => commands::committee::run(&mut session, cmd).await,
        Commands::Key(cmd) => commands::key::run(&mut session, cmd),
        Commands::Config => Ok(()),
    }
}
