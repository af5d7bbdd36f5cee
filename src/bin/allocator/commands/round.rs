//! Round commands

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use dialoguer::{theme::ColorfulTheme, Confirm};
use fair_allocator::engine::{aggregate_stats, eligible_applicants, ranked_view, simulate_threshold};
use fair_allocator::templates::{find_template, TEMPLATES};
use fair_allocator::{share_link, share_token, AllocationMode, GatedAction, NewRound, Round, RoundType};

use super::Session;
use crate::style::*;

#[derive(Subcommand)]
pub enum RoundCommand {
    /// Create a round (requires committee verification)
    #[command(visible_alias = "new")]
    Create {
        /// Round name
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Total budget to allocate
        #[arg(short, long)]
        budget: Option<f64>,

        #[arg(long)]
        currency: Option<String>,

        /// Minimum FairScore (0-100) to be eligible
        #[arg(short = 'm', long)]
        min_score: Option<f64>,

        /// binary or weighted
        #[arg(long)]
        mode: Option<AllocationMode>,

        /// grant, airdrop, allowlist, bounty, dao or community
        #[arg(short = 't', long = "type")]
        round_type: Option<RoundType>,

        /// Start from a policy template (none, grant, airdrop, allowlist, dao, bounty)
        #[arg(long)]
        template: Option<String>,
    },

    /// List rounds, newest first
    #[command(visible_alias = "ls")]
    List,

    /// Show the ranked applicant table and round statistics
    Show {
        /// Round id or id prefix
        round: String,

        /// Count applicants that would pass this minimum score (overrides ignored)
        #[arg(short, long)]
        simulate: Option<f64>,
    },

    /// Delete a round
    #[command(visible_alias = "rm")]
    Delete {
        round: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Print a share link for a round
    Share { round: String },

    /// Import a round from a JSON file, share token or share link
    Import { source: String },

    /// List round templates
    Templates,
}

pub fn run(session: &mut Session, command: RoundCommand) -> Result<()> {
    match command {
        RoundCommand::Create {
            name,
            description,
            budget,
            currency,
            min_score,
            mode,
            round_type,
            template,
        } => {
            session.gate.require(GatedAction::CreateRound)?;

            let template = match template.as_deref() {
                Some(id) => Some(find_template(id).ok_or_else(|| {
                    anyhow::anyhow!("Unknown template '{}'. See `allocator round templates`.", id)
                })?),
                None => None,
            };

            let defaults = &session.config.defaults;
            let name = name
                .or_else(|| template.map(|t| t.name.to_string()))
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .ok_or_else(|| anyhow::anyhow!("Round name is required (--name)"))?;

            let fields = NewRound {
                name,
                description: description
                    .or_else(|| template.map(|t| t.description.to_string()))
                    .unwrap_or_default(),
                total_budget: budget.unwrap_or(defaults.total_budget),
                currency: currency.unwrap_or_else(|| defaults.currency.clone()),
                min_fair_score: min_score
                    .or(template.map(|t| t.min_fair_score))
                    .unwrap_or(defaults.min_fair_score),
                allocation_mode: mode
                    .or(template.map(|t| t.allocation_mode))
                    .unwrap_or(defaults.allocation_mode),
                round_type: round_type
                    .or(template.map(|t| t.round_type))
                    .unwrap_or(defaults.round_type),
            };

            let round = session.rounds.create(fields);
            print_success(&format!("Created round {}", style_bold(&round.name)));
            println!("  Id:       {}", style_cyan(&round.id.to_string()));
            print_round_summary(&round);
            Ok(())
        }

        RoundCommand::List => {
            print_header("Rounds");
            let rounds = session.rounds.list();
            if rounds.is_empty() {
                print_info("No rounds yet. Create one with `allocator round create`.");
                return Ok(());
            }

            println!();
            println!(
                "{:<8}  {:<24}  {:<10}  {:>10}  {:>14}  {:>5}",
                "Id", "Name", "Type", "Applicants", "Budget", "Min"
            );
            println!("{}", "─".repeat(80));
            for round in rounds {
                println!(
                    "{:<8}  {:<24}  {:<10}  {:>10}  {:>14}  {:>5.0}",
                    style_dim(&short_id(&round.id)),
                    round.name,
                    round.round_type.label(),
                    round.applicants.len(),
                    format!("{:.0} {}", round.total_budget, round.currency),
                    round.min_fair_score,
                );
            }
            println!();
            println!("Total rounds: {}", rounds.len());
            Ok(())
        }

        RoundCommand::Show { round, simulate } => {
            let round = session.round(&round)?;
            show_round(round, simulate);
            Ok(())
        }

        RoundCommand::Delete { round, yes } => {
            let round = session.round(&round)?.clone();
            if !yes {
                let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(format!(
                        "Delete round '{}' and its {} applicants?",
                        round.name,
                        round.applicants.len()
                    ))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    print_info("Cancelled.");
                    return Ok(());
                }
            }
            session.rounds.delete_round(round.id)?;
            print_success(&format!("Deleted round {}", round.name));
            Ok(())
        }

        RoundCommand::Share { round } => {
            let round = session.round(&round)?;
            let base = session.config.share.base_url.trim();
            if base.is_empty() {
                println!("{}", share_token(round)?);
            } else {
                println!("{}", share_link(base, round)?);
            }
            Ok(())
        }

        RoundCommand::Import { source } => {
            let round = if Path::new(&source).is_file() {
                let json = std::fs::read_to_string(&source)?;
                session.rounds.import(&json)?
            } else {
                session.rounds.import_token(&source)?
            };
            print_success(&format!(
                "Imported round {} with {} applicants",
                style_bold(&round.name),
                round.applicants.len()
            ));
            println!("  Id:       {}", style_cyan(&round.id.to_string()));
            Ok(())
        }

        RoundCommand::Templates => {
            print_header("Round Templates");
            for t in TEMPLATES.iter() {
                println!(
                    "  {:<10} {:<14} min {:>3.0}  {:<8}  {}",
                    style_cyan(t.id),
                    t.label,
                    t.min_fair_score,
                    t.allocation_mode,
                    style_dim(t.description)
                );
            }
            Ok(())
        }
    }
}

fn print_round_summary(round: &Round) {
    println!("  Type:     {}", round.round_type.label());
    println!(
        "  Budget:   {:.2} {}",
        round.total_budget, round.currency
    );
    println!("  Min:      FairScore >= {:.1}", round.min_fair_score);
    println!("  Mode:     {}", round.allocation_mode);
}

fn show_round(round: &Round, simulate: Option<f64>) {
    print_header(&format!("{} ({})", round.name, round.round_type.label()));
    if !round.description.is_empty() {
        println!("{}", style_dim(&round.description));
    }
    print_round_summary(round);

    let view = ranked_view(round);
    if view.is_empty() {
        println!();
        print_info("No applicants yet. Add one with `allocator applicant add`.");
        return;
    }

    println!();
    println!(
        "{:>4}  {:<8}  {:<15}  {:>6}  {:<8}  {:<8}  {:>12}  {:<12}  Badges",
        "Rank", "Id", "Wallet", "Score", "Tier", "Eligible", "Suggested", "Risk"
    );
    println!("{}", "─".repeat(100));

    for row in &view {
        let a = row.applicant;
        let eligible = match (row.eligible, a.is_overridden()) {
            (true, true) => style_yellow("override"),
            (true, false) => style_green("yes"),
            (false, _) => style_red("no"),
        };
        let suggested = row
            .suggested_allocation
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "-".to_string());
        let badges = a
            .badges
            .iter()
            .map(|b| b.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        println!(
            "{:>4}  {:<8}  {:<15}  {:>6.1}  {:<8}  {:<8}  {:>12}  {:<12}  {}",
            format!("#{}", row.rank),
            style_dim(&short_id(&a.id)),
            truncate_wallet(&a.wallet),
            a.fair_score,
            a.tier.map(|t| t.label()).unwrap_or("-"),
            eligible,
            suggested,
            row.risk.label(),
            badges
        );
        if let Some(reason) = a.override_reason.as_deref().filter(|_| a.is_overridden()) {
            println!("{:>6}{}", "", style_dim(&format!("override: {}", reason)));
        }
    }

    let eligible = eligible_applicants(round).len();
    println!();
    println!(
        "Eligible: {} of {}",
        style_bold(&eligible.to_string()),
        round.applicants.len()
    );

    if let Some(stats) = aggregate_stats(&round.applicants) {
        println!("Average FairScore: {:.1}", stats.average_score);
        if stats.overridden_count > 0 {
            println!("Manual overrides:  {}", stats.overridden_count);
        }
        if !stats.badge_counts.is_empty() {
            let badges = stats
                .badge_counts
                .iter()
                .map(|(label, count)| format!("{} ×{}", label, count))
                .collect::<Vec<_>>()
                .join(", ");
            println!("Badges:            {}", badges);
        }
    }

    if let Some(threshold) = simulate {
        println!();
        println!(
            "Simulated min {:.1} → {} eligible by score",
            threshold,
            style_bold(&simulate_threshold(&round.applicants, threshold).to_string())
        );
    }
}
