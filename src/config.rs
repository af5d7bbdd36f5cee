//! Configuration management
//!
//! Loads configuration from config.toml with support for:
//! - FairScale API endpoint and key
//! - Local round database location
//! - Committee gate policy
//! - Defaults for new rounds

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{AllocationMode, RoundType, Tier};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub fairscale: FairScaleConfig,
    pub storage: StorageConfig,
    pub committee: CommitteeConfig,
    pub defaults: RoundDefaults,
    #[serde(default)]
    pub share: ShareConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairScaleConfig {
    pub base_url: String,
    /// Empty means offline demo scores
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: String,
}

/// Committee gate policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitteeConfig {
    pub min_score: f64,
    pub min_tier: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundDefaults {
    pub currency: String,
    pub total_budget: f64,
    pub min_fair_score: f64,
    #[serde(default)]
    pub allocation_mode: AllocationMode,
    #[serde(default)]
    pub round_type: RoundType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Page that accepts `?round=<token>` links
    #[serde(default)]
    pub base_url: String,
}

impl Config {
    /// Load from config.toml or use defaults
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load from specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            toml::from_str(DEFAULT_CONFIG).context("Failed to parse default config")
        }
    }

    /// Resolve the FairScale API key.
    ///
    /// Runtime `FAIRSCALE_API_KEY` wins, then a key baked in at build time,
    /// then the key persisted in the local store, then the config file.
    pub fn fairscale_api_key(&self, stored: Option<&str>) -> Option<String> {
        let runtime = std::env::var("FAIRSCALE_API_KEY").ok();
        let build_time = option_env!("FAIRSCALE_API_KEY").map(str::to_string);

        [
            runtime,
            build_time,
            stored.map(str::to_string),
            Some(self.fairscale.api_key.clone()),
        ]
        .into_iter()
        .flatten()
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
    }

    /// Database path (`ALLOCATOR_DB` env var takes precedence)
    pub fn database_path(&self) -> String {
        match std::env::var("ALLOCATOR_DB") {
            Ok(path) if !path.is_empty() => path,
            _ => self.storage.path.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            fairscale: FairScaleConfig {
                base_url: "https://api.fairscale.xyz".to_string(),
                api_key: String::new(),
                timeout_secs: default_timeout_secs(),
            },
            storage: StorageConfig {
                path: "fair-allocator.db".to_string(),
            },
            committee: CommitteeConfig {
                min_score: 40.0,
                min_tier: Tier::Silver,
            },
            defaults: RoundDefaults {
                currency: "USDC".to_string(),
                total_budget: 5000.0,
                min_fair_score: 50.0,
                allocation_mode: AllocationMode::Binary,
                round_type: RoundType::Grant,
            },
            share: ShareConfig::default(),
        })
    }
}
