//! Access gate
//!
//! - Solana address format validation
//! - Committee reputation policy (score or tier threshold)
//! - Session-wide committee verification gating round creation and CSV export

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::CommitteeConfig;
use crate::error::{AllocatorError, Result};
use crate::fairscale::ScoreProvider;
use crate::kv::{KeyValueStore, COMMITTEE_KEY};
use crate::types::{CommitteeVerification, Tier};

const MIN_ADDRESS_LEN: usize = 32;
const MAX_ADDRESS_LEN: usize = 44;

/// Check that a string looks like a Solana address: 32-44 base58 characters.
/// Format only; says nothing about on-chain existence or ownership.
pub fn is_valid_solana_address(address: &str) -> bool {
    let trimmed = address.trim();
    if trimmed.len() < MIN_ADDRESS_LEN || trimmed.len() > MAX_ADDRESS_LEN {
        return false;
    }
    match bs58::decode(trimmed).into_vec() {
        Ok(_) => true,
        Err(e) => {
            debug!("Rejected address {}: {}", trimmed, e);
            false
        }
    }
}

/// `InvalidAddress` unless the trimmed address is well-formed
pub fn validate_address(address: &str) -> Result<&str> {
    let trimmed = address.trim();
    if is_valid_solana_address(trimmed) {
        Ok(trimmed)
    } else {
        Err(AllocatorError::InvalidAddress)
    }
}

/// True if `tier` is at least `minimum`. An absent tier never qualifies.
pub fn tier_at_least(tier: Option<Tier>, minimum: Tier) -> bool {
    tier.is_some_and(|t| t >= minimum)
}

/// Actions unlocked by committee verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatedAction {
    CreateRound,
    ExportCsv,
}

impl GatedAction {
    pub fn label(&self) -> &'static str {
        match self {
            GatedAction::CreateRound => "Creating rounds",
            GatedAction::ExportCsv => "CSV export",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommitteePolicy {
    pub min_score: f64,
    pub min_tier: Tier,
}

impl Default for CommitteePolicy {
    fn default() -> Self {
        Self {
            min_score: 40.0,
            min_tier: Tier::Silver,
        }
    }
}

impl From<&CommitteeConfig> for CommitteePolicy {
    fn from(config: &CommitteeConfig) -> Self {
        Self {
            min_score: config.min_score,
            min_tier: config.min_tier,
        }
    }
}

impl CommitteePolicy {
    /// Score clause OR tier clause; no verification never satisfies
    pub fn is_satisfied(&self, verification: Option<&CommitteeVerification>) -> bool {
        match verification {
            Some(v) => v.fair_score >= self.min_score || tier_at_least(v.tier, self.min_tier),
            None => false,
        }
    }
}

/// Holds the one committee verification for this profile
pub struct CommitteeGate {
    policy: CommitteePolicy,
    current: Option<CommitteeVerification>,
    kv: Arc<dyn KeyValueStore>,
}

impl CommitteeGate {
    /// Load any persisted verification. Unreadable or wallet-less records count as absent.
    pub fn load(kv: Arc<dyn KeyValueStore>, policy: CommitteePolicy) -> Self {
        let current = match kv.get(COMMITTEE_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<CommitteeVerification>(&raw)
                .ok()
                .filter(|v| !v.wallet.is_empty()),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read committee verification: {}", e);
                None
            }
        };
        Self {
            policy,
            current,
            kv,
        }
    }

    pub fn policy(&self) -> CommitteePolicy {
        self.policy
    }

    pub fn current(&self) -> Option<&CommitteeVerification> {
        self.current.as_ref()
    }

    pub fn is_satisfied(&self) -> bool {
        self.policy.is_satisfied(self.current.as_ref())
    }

    /// Look up `wallet` and replace any prior verification with the result,
    /// whether or not it satisfies the policy.
    pub async fn verify(
        &mut self,
        provider: &dyn ScoreProvider,
        wallet: &str,
    ) -> Result<CommitteeVerification> {
        let wallet = validate_address(wallet)?;
        let score = provider.fetch_score(wallet).await?;

        let verification = CommitteeVerification {
            wallet: score.wallet,
            fair_score: score.fair_score,
            tier: score.tier,
            verified_at: Utc::now(),
        };
        info!(
            "Committee wallet {} verified with FairScore {:.1} (satisfied: {})",
            verification.wallet,
            verification.fair_score,
            self.policy.is_satisfied(Some(&verification))
        );

        self.current = Some(verification.clone());
        self.persist();
        Ok(verification)
    }

    pub fn clear(&mut self) {
        self.current = None;
        if let Err(e) = self.kv.delete(COMMITTEE_KEY) {
            warn!("Failed to clear committee verification: {}", e);
        }
    }

    /// `NotAuthorized` unless the current verification satisfies the policy
    pub fn require(&self, action: GatedAction) -> Result<()> {
        if self.is_satisfied() {
            return Ok(());
        }
        Err(AllocatorError::NotAuthorized {
            action: action.label().to_string(),
            min_score: self.policy.min_score,
            min_tier: self.policy.min_tier.to_string(),
        })
    }

    fn persist(&self) {
        let Some(current) = &self.current else {
            return;
        };
        match serde_json::to_string(current) {
            Ok(json) => {
                if let Err(e) = self.kv.put(COMMITTEE_KEY, &json) {
                    warn!("Failed to persist committee verification: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize committee verification: {}", e),
        }
    }
}
