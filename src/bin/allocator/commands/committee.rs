//! Committee verification commands

use anyhow::Result;
use clap::Subcommand;

use super::{spinner, Session};
use crate::style::*;

#[derive(Subcommand)]
pub enum CommitteeCommand {
    /// Verify a committee wallet's FairScore
    Verify {
        /// Solana wallet address
        wallet: String,
    },

    /// Show the current verification
    #[command(visible_alias = "st")]
    Status,

    /// Forget the current verification
    Clear,
}

pub async fn run(session: &mut Session, command: CommitteeCommand) -> Result<()> {
    let policy = session.gate.policy();
    let requirement = format!(
        "FairScore >= {} or tier >= {}",
        policy.min_score, policy.min_tier
    );

    match command {
        CommitteeCommand::Verify { wallet } => {
            let pb = spinner("Checking FairScore...");
            let result = session.gate.verify(session.provider.as_ref(), &wallet).await;
            pb.finish_and_clear();

            let verification = result?;
            if session.gate.is_satisfied() {
                print_success(&format!(
                    "Committee verified: {} · FairScore {:.1}{}",
                    style_cyan(&truncate_wallet(&verification.wallet)),
                    verification.fair_score,
                    verification
                        .tier
                        .map(|t| format!(" · {}", t.label()))
                        .unwrap_or_default()
                ));
                println!("  Round creation and CSV export are unlocked.");
            } else {
                print_warning(&format!(
                    "Score {:.1} / tier {} below requirement ({}).",
                    verification.fair_score,
                    verification
                        .tier
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "—".to_string()),
                    requirement
                ));
            }
            Ok(())
        }

        CommitteeCommand::Status => {
            print_header("Committee Reputation Gate");
            println!("Requirement: {}", requirement);
            println!();
            match session.gate.current() {
                Some(v) => {
                    let state = if session.gate.is_satisfied() {
                        style_green("verified")
                    } else {
                        style_yellow("below requirement")
                    };
                    println!("Status:      {}", state);
                    println!("Wallet:      {}", truncate_wallet(&v.wallet));
                    println!("FairScore:   {:.1}", v.fair_score);
                    if let Some(tier) = v.tier {
                        println!("Tier:        {}", tier.label());
                    }
                    println!(
                        "Verified at: {}",
                        v.verified_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
                None => {
                    print_info("No committee wallet verified.");
                    println!("  allocator committee verify <WALLET>");
                }
            }
            Ok(())
        }

        CommitteeCommand::Clear => {
            session.gate.clear();
            print_success("Committee verification cleared");
            Ok(())
        }
    }
}
