//! API key commands

use anyhow::Result;
use clap::Subcommand;
use fair_allocator::kv::API_KEY_KEY;
use fair_allocator::KeyValueStore;

use super::Session;
use crate::style::*;

#[derive(Subcommand)]
pub enum KeyCommand {
    /// Save a FairScale API key in the local database
    Set { key: String },

    /// Remove the saved key (demo scores are used unless another source provides one)
    Clear,

    /// Show which score source is active
    #[command(visible_alias = "st")]
    Status,
}

pub fn run(session: &mut Session, command: KeyCommand) -> Result<()> {
    match command {
        KeyCommand::Set { key } => {
            let key = key.trim();
            if key.is_empty() {
                anyhow::bail!("API key cannot be empty");
            }
            session.kv.put(API_KEY_KEY, key)?;
            print_success("API key saved");
            println!("  Get one at {}", style_cyan("https://sales.fairscale.xyz/"));
            Ok(())
        }

        KeyCommand::Clear => {
            session.kv.delete(API_KEY_KEY)?;
            print_success("Saved API key removed");
            Ok(())
        }

        KeyCommand::Status => {
            print_header("FairScale API");
            let stored = session.kv.get(API_KEY_KEY)?;
            match session.config.fairscale_api_key(stored.as_deref()) {
                Some(key) => {
                    print_success("API key configured - live scores");
                    println!("  Key:      {}", style_dim(&mask(&key)));
                    println!("  Endpoint: {}", session.config.fairscale.base_url);
                }
                None => {
                    print_warning("No API key - deterministic demo scores");
                    println!("  Set one with: allocator key set <KEY>");
                }
            }
            Ok(())
        }
    }
}

fn mask(key: &str) -> String {
    let tail: String = key.chars().skip(key.chars().count().saturating_sub(4)).collect();
    format!("****{}", tail)
}
