//! Export commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use fair_allocator::export::{csv_file_name, json_file_name, to_csv, to_json};
use fair_allocator::GatedAction;

use super::Session;
use crate::style::*;

#[derive(Subcommand)]
pub enum ExportCommand {
    /// Ranked applicant table as CSV (requires committee verification)
    Csv {
        /// Round id or id prefix
        round: String,

        /// Output file (defaults to a generated name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print to stdout instead of writing a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// Full round record as JSON
    Json {
        round: String,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },
}

pub fn run(session: &mut Session, command: ExportCommand) -> Result<()> {
    let now = Utc::now();

    let (content, output, stdout) = match command {
        ExportCommand::Csv {
            round,
            output,
            stdout,
        } => {
            session.gate.require(GatedAction::ExportCsv)?;
            let round = session.round(&round)?;
            let output = output.unwrap_or_else(|| PathBuf::from(csv_file_name(round, now)));
            (to_csv(round), output, stdout)
        }
        ExportCommand::Json {
            round,
            output,
            stdout,
        } => {
            let round = session.round(&round)?;
            let output = output.unwrap_or_else(|| PathBuf::from(json_file_name(round, now)));
            (to_json(round)?, output, stdout)
        }
    };

    if stdout {
        println!("{}", content);
        return Ok(());
    }

    std::fs::write(&output, content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    print_success(&format!("Exported to {}", style_cyan(&output.display().to_string())));
    Ok(())
}
