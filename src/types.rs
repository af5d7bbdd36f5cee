//! Round, applicant and score data model
//!
//! Field names follow the JSON the browser allocator persisted, so rounds
//! exported from it can be imported here unchanged.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Coarse reputation bucket, ordered bronze < silver < gold < platinum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bronze" => Ok(Tier::Bronze),
            "silver" => Ok(Tier::Silver),
            "gold" => Ok(Tier::Gold),
            "platinum" => Ok(Tier::Platinum),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

/// Display-only badge metadata from the score provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tier: String,
}

/// Named numeric signals (wallet age, tx count, percentiles, ...)
pub type Features = BTreeMap<String, f64>;

/// Normalized score lookup result, identical for remote and mock sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub wallet: String,
    pub fair_score: f64,
    pub base_score: Option<f64>,
    pub social_score: Option<f64>,
    pub tier: Option<Tier>,
    #[serde(default)]
    pub badges: Vec<Badge>,
    pub features: Option<Features>,
    pub scored_at: Option<DateTime<Utc>>,
}

impl ScoreResult {
    /// Zero-score result for a blank wallet
    pub fn empty(wallet: impl Into<String>) -> Self {
        Self {
            wallet: wallet.into(),
            fair_score: 0.0,
            base_score: None,
            social_score: None,
            tier: None,
            badges: Vec::new(),
            features: None,
            scored_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: Uuid,
    pub wallet: String,
    /// Combined FairScore, always within [0, 100]
    #[serde(rename = "fairScore")]
    pub fair_score: f64,
    #[serde(rename = "fairscore_base", default, skip_serializing_if = "Option::is_none")]
    pub base_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_score: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_tier",
        skip_serializing_if = "Option::is_none"
    )]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub badges: Vec<Badge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Features>,
    #[serde(
        rename = "timestamp",
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub scored_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "requestedAmount", default, skip_serializing_if = "Option::is_none")]
    pub requested_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Manual approval regardless of FairScore
    #[serde(rename = "overrideApproved", default, skip_serializing_if = "Option::is_none")]
    pub override_approved: Option<bool>,
    #[serde(rename = "overrideReason", default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
}

impl Applicant {
    pub fn from_score(id: Uuid, score: ScoreResult) -> Self {
        Self {
            id,
            wallet: score.wallet,
            fair_score: clamp_score(score.fair_score),
            base_score: score.base_score,
            social_score: score.social_score,
            tier: score.tier,
            badges: score.badges,
            features: score.features,
            scored_at: score.scored_at,
            label: None,
            requested_amount: None,
            notes: None,
            override_approved: None,
            override_reason: None,
        }
    }

    pub fn is_overridden(&self) -> bool {
        self.override_approved.unwrap_or(false)
    }
}

/// Parses a score timestamp: RFC 3339, a naive `YYYY-MM-DD HH:MM:SS` taken
/// as UTC, or nothing
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

// Unknown tiers and unparseable timestamps in stored rounds become None
fn lenient_tier<'de, D>(deserializer: D) -> Result<Option<Tier>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(|t| t.parse().ok()))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(ts)) => parse_timestamp(&ts),
        Some(serde_json::Value::Number(ms)) => ms
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    })
}

/// Keeps a score inside [0, 100]; NaN collapses to 0
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// How amounts are determined: eligible/not, or proportional to FairScore
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationMode {
    #[default]
    Binary,
    Weighted,
}

impl FromStr for AllocationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binary" => Ok(AllocationMode::Binary),
            "weighted" => Ok(AllocationMode::Weighted),
            other => Err(format!("unknown allocation mode: {}", other)),
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationMode::Binary => f.pad("binary"),
            AllocationMode::Weighted => f.pad("weighted"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundType {
    #[default]
    Grant,
    Airdrop,
    Allowlist,
    Bounty,
    Dao,
    Community,
}

impl RoundType {
    pub const ALL: [RoundType; 6] = [
        RoundType::Grant,
        RoundType::Airdrop,
        RoundType::Allowlist,
        RoundType::Bounty,
        RoundType::Dao,
        RoundType::Community,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundType::Grant => "grant",
            RoundType::Airdrop => "airdrop",
            RoundType::Allowlist => "allowlist",
            RoundType::Bounty => "bounty",
            RoundType::Dao => "dao",
            RoundType::Community => "community",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RoundType::Grant => "Grant",
            RoundType::Airdrop => "Airdrop",
            RoundType::Allowlist => "Allowlist",
            RoundType::Bounty => "Bounty",
            RoundType::Dao => "DAO",
            RoundType::Community => "Community",
        }
    }
}

impl FromStr for RoundType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        RoundType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown round type: {}", s))
    }
}

impl fmt::Display for RoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub total_budget: f64,
    pub currency: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Insertion order
    #[serde(default)]
    pub applicants: Vec<Applicant>,
    pub min_fair_score: f64,
    #[serde(default)]
    pub allocation_mode: AllocationMode,
    #[serde(default)]
    pub round_type: RoundType,
}

impl Round {
    pub fn applicant(&self, id: Uuid) -> Option<&Applicant> {
        self.applicants.iter().find(|a| a.id == id)
    }

    pub fn is_weighted(&self) -> bool {
        self.allocation_mode == AllocationMode::Weighted
    }
}

/// Fields supplied when creating a round
#[derive(Debug, Clone, PartialEq)]
pub struct NewRound {
    pub name: String,
    pub description: String,
    pub total_budget: f64,
    pub currency: String,
    pub min_fair_score: f64,
    pub allocation_mode: AllocationMode,
    pub round_type: RoundType,
}

/// Last wallet verified for committee privileges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeVerification {
    pub wallet: String,
    pub fair_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub verified_at: DateTime<Utc>,
}

/// Display-only sybil risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Healthy,
    Borderline,
    LikelySybil,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Healthy => "Healthy",
            RiskTier::Borderline => "Borderline",
            RiskTier::LikelySybil => "Likely Sybil",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Bronze < Tier::Silver);
        assert!(Tier::Silver < Tier::Gold);
        assert!(Tier::Gold < Tier::Platinum);
        assert_eq!("Gold".parse::<Tier>().unwrap(), Tier::Gold);
        assert!("diamond".parse::<Tier>().is_err());
    }

    #[test]
    fn test_round_accepts_legacy_json() {
        // Older rounds carry neither allocationMode nor roundType
        let json = r#"{
            "id": "6f1c1a2e-0d5b-4f0a-9d8e-1f2a3b4c5d6e",
            "name": "Legacy",
            "description": "",
            "totalBudget": 100,
            "currency": "USDC",
            "createdAt": 1700000000000,
            "applicants": [{
                "id": "0b6c5a4e-3d2f-4e1a-8b9c-7d6e5f4a3b2c",
                "wallet": "abc",
                "fairScore": 42.5,
                "fairscore_base": 36.1,
                "tier": "silver",
                "overrideApproved": true
            }],
            "minFairScore": 50
        }"#;

        let round: Round = serde_json::from_str(json).unwrap();
        assert_eq!(round.allocation_mode, AllocationMode::Binary);
        assert_eq!(round.round_type, RoundType::Grant);
        assert_eq!(round.created_at.timestamp_millis(), 1_700_000_000_000);
        let applicant = &round.applicants[0];
        assert_eq!(applicant.base_score, Some(36.1));
        assert_eq!(applicant.tier, Some(Tier::Silver));
        assert!(applicant.badges.is_empty());
        assert!(applicant.is_overridden());
    }

    #[test]
    fn test_round_type_labels() {
        assert_eq!(RoundType::Dao.label(), "DAO");
        assert_eq!("airdrop".parse::<RoundType>().unwrap(), RoundType::Airdrop);
        assert!("lottery".parse::<RoundType>().is_err());
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(120.0), 100.0);
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(55.5), 55.5);
    }
}
