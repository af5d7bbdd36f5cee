//! CLI commands and the session they share

pub mod applicant;
pub mod committee;
pub mod config;
pub mod export;
pub mod key;
pub mod round;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fair_allocator::kv::API_KEY_KEY;
use fair_allocator::{
    provider_from_config, Applicant, CommitteeGate, CommitteePolicy, Config, KeyValueStore,
    Round, RoundStore, ScoreProvider, SqliteStore,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

/// Everything one CLI invocation works with
pub struct Session {
    pub config: Config,
    pub kv: Arc<SqliteStore>,
    pub rounds: RoundStore,
    pub gate: CommitteeGate,
    pub provider: Box<dyn ScoreProvider>,
}

impl Session {
    pub fn open(config: Config) -> Result<Self> {
        let path = config.database_path();
        let kv = Arc::new(
            SqliteStore::new(&path).with_context(|| format!("Failed to open database {}", path))?,
        );

        let stored_key = kv.get(API_KEY_KEY).unwrap_or_else(|e| {
            warn!("Failed to read stored API key: {}", e);
            None
        });
        let provider = provider_from_config(&config, stored_key.as_deref());
        let rounds = RoundStore::load(kv.clone());
        let gate = CommitteeGate::load(kv.clone(), CommitteePolicy::from(&config.committee));

        Ok(Self {
            config,
            kv,
            rounds,
            gate,
            provider,
        })
    }

    pub fn round(&self, id_or_prefix: &str) -> Result<&Round> {
        Ok(self.rounds.resolve(id_or_prefix)?)
    }
}

/// Find an applicant by id prefix or exact wallet
pub fn resolve_applicant<'a>(round: &'a Round, needle: &str) -> Result<&'a Applicant> {
    let needle = needle.trim();
    let lowered = needle.to_lowercase();

    let matches: Vec<&Applicant> = round
        .applicants
        .iter()
        .filter(|a| {
            // Demo scores store the lowercased address
            a.wallet.eq_ignore_ascii_case(needle)
                || (!lowered.is_empty() && a.id.to_string().starts_with(&lowered))
        })
        .collect();

    match matches.as_slice() {
        [one] => Ok(one),
        [] => anyhow::bail!("No applicant matching '{}' in round {}", needle, round.name),
        _ => anyhow::bail!(
            "'{}' matches {} applicants; use a longer id",
            needle,
            matches.len()
        ),
    }
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
