//! Applicant commands

use anyhow::Result;
use clap::Subcommand;
use fair_allocator::auth::validate_address;
use fair_allocator::{is_eligible, risk_tier};

use super::{resolve_applicant, spinner, Session};
use crate::style::*;

#[derive(Subcommand)]
pub enum ApplicantCommand {
    /// Look up a wallet's FairScore and add it to a round
    Add {
        /// Round id or id prefix
        round: String,

        /// Solana wallet address
        wallet: String,
    },

    /// Remove an applicant
    #[command(visible_alias = "rm")]
    Remove {
        round: String,

        /// Applicant id prefix or wallet
        applicant: String,
    },

    /// Manually approve (or revoke approval for) an applicant
    Override {
        round: String,

        /// Applicant id prefix or wallet
        applicant: String,

        /// Revoke a previous approval
        #[arg(long)]
        revoke: bool,

        /// Reason recorded with the decision (kept when omitted)
        #[arg(short, long, conflicts_with = "clear_reason")]
        reason: Option<String>,

        /// Drop the recorded reason
        #[arg(long)]
        clear_reason: bool,
    },
}

pub async fn run(session: &mut Session, command: ApplicantCommand) -> Result<()> {
    match command {
        ApplicantCommand::Add { round, wallet } => {
            let round_id = session.round(&round)?.id;
            let wallet = validate_address(&wallet)?;

            let pb = spinner("Fetching FairScore...");
            let result = session.provider.fetch_score(wallet).await;
            pb.finish_and_clear();

            // A failed lookup leaves the round untouched
            let score = result?;
            let round = session.rounds.add_applicant(round_id, score)?;
            let Some(added) = round.applicants.last() else {
                return Ok(());
            };

            print_success(&format!(
                "Added {} to {}",
                style_cyan(&added.wallet),
                style_bold(&round.name)
            ));
            println!("  Id:        {}", style_dim(&added.id.to_string()));
            println!("  FairScore: {:.1}", added.fair_score);
            if let Some(tier) = added.tier {
                println!("  Tier:      {}", tier.label());
            }
            println!("  Risk:      {}", risk_tier(added.fair_score).label());
            println!(
                "  Eligible:  {}",
                if is_eligible(added, &round) {
                    style_green("yes")
                } else {
                    style_red(&format!("no (min {:.1})", round.min_fair_score))
                }
            );
            if !session.provider.is_live() {
                println!();
                print_warning("Demo score (no FairScale API key configured)");
            }
            println!(
                "{}",
                style_dim(&format!(
                    "FairScore lookups this session: {}",
                    session.provider.query_count()
                ))
            );
            Ok(())
        }

        ApplicantCommand::Remove { round, applicant } => {
            let round = session.round(&round)?;
            let (round_id, applicant_id) = (round.id, resolve_applicant(round, &applicant)?.id);

            let removed = session.rounds.remove_applicant(round_id, applicant_id)?;
            print_success(&format!("Removed {}", removed.wallet));
            Ok(())
        }

        ApplicantCommand::Override {
            round,
            applicant,
            revoke,
            reason,
            clear_reason,
        } => {
            let round = session.round(&round)?;
            let (round_id, applicant_id) = (round.id, resolve_applicant(round, &applicant)?.id);

            let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
            let updated = session
                .rounds
                .set_override(round_id, applicant_id, !revoke, reason)?;
            if clear_reason {
                session.rounds.clear_override_reason(round_id, applicant_id)?;
            }

            if revoke {
                print_success(&format!("Override revoked for {}", updated.wallet));
            } else {
                print_success(&format!("{} manually approved", updated.wallet));
            }
            if let Some(reason) = updated.override_reason.as_deref().filter(|_| !clear_reason) {
                println!("  Reason: {}", reason);
            }
            Ok(())
        }
    }
}
