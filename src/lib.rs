//! Fair Allocator - Rank and allocate funding rounds by FairScore reputation
//!
//! Operators create rounds (grants, airdrops, allowlists, bounties, DAO votes,
//! community programs), add Solana wallets as applicants, and get a ranked,
//! eligibility-flagged and optionally budget-weighted view of each round.
//!
//! # How it works
//!
//! 1. A committee wallet is verified once; FairScore >= 40 or tier >= silver
//!    unlocks round creation and CSV export
//! 2. Each applicant wallet is scored through the FairScale API, or through a
//!    deterministic offline generator when no API key is configured
//! 3. An applicant is eligible when its FairScore meets the round minimum or an
//!    operator approved it manually
//! 4. Weighted rounds suggest `score / eligible_sum * budget` per eligible applicant
//!
//! Rounds persist in a local SQLite file and can be shared as compact tokens.

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod fairscale;
pub mod kv;
pub mod store;
pub mod templates;
pub mod types;

pub use auth::{is_valid_solana_address, tier_at_least, CommitteeGate, CommitteePolicy, GatedAction};
pub use config::Config;
pub use engine::{
    aggregate_stats, is_eligible, rank, ranked_view, risk_tier, simulate_threshold,
    weighted_allocation, RankedApplicant, RoundStats,
};
pub use error::{AllocatorError, ScoreError};
pub use fairscale::{provider_from_config, FairScaleClient, MockScoreProvider, ScoreProvider};
pub use kv::{KeyValueStore, SqliteStore};
pub use store::{share_link, share_token, RoundStore};
pub use types::{
    AllocationMode, Applicant, Badge, CommitteeVerification, NewRound, RiskTier, Round,
    RoundType, ScoreResult, Tier,
};
