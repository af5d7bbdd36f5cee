//! Config command - show effective configuration

use anyhow::Result;
use fair_allocator::Config;

use crate::style::*;

pub fn run(config: &Config) -> Result<()> {
    print_header("Fair Allocator Configuration");

    println!();
    println!("{}", style_bold("FairScale:"));
    println!("  Endpoint:       {}", style_cyan(&config.fairscale.base_url));
    println!("  Timeout:        {}s", config.fairscale.timeout_secs);
    println!(
        "  API key:        {}",
        if config.fairscale_api_key(None).is_some() {
            style_green("set")
        } else {
            style_dim("not set (see `allocator key status`)")
        }
    );

    println!();
    println!("{}", style_bold("Storage:"));
    println!("  Database:       {}", config.database_path());

    println!();
    println!("{}", style_bold("Committee gate:"));
    println!(
        "  Requirement:    FairScore >= {} or tier >= {}",
        config.committee.min_score, config.committee.min_tier
    );

    println!();
    println!("{}", style_bold("Round defaults:"));
    println!(
        "  Budget:         {} {}",
        config.defaults.total_budget, config.defaults.currency
    );
    println!("  Min FairScore:  {}", config.defaults.min_fair_score);
    println!("  Mode:           {}", config.defaults.allocation_mode);
    println!("  Type:           {}", config.defaults.round_type.label());

    if !config.share.base_url.is_empty() {
        println!();
        println!("{}", style_bold("Share links:"));
        println!("  Base URL:       {}", config.share.base_url);
    }

    Ok(())
}
