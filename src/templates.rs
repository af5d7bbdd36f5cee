//! Policy templates for quick round setup

use crate::types::{AllocationMode, RoundType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTemplate {
    pub id: &'static str,
    pub label: &'static str,
    pub round_type: RoundType,
    pub min_fair_score: f64,
    pub allocation_mode: AllocationMode,
    pub name: &'static str,
    pub description: &'static str,
}

pub const TEMPLATES: [RoundTemplate; 6] = [
    RoundTemplate {
        id: "none",
        label: "None (custom)",
        round_type: RoundType::Grant,
        min_fair_score: 50.0,
        allocation_mode: AllocationMode::Binary,
        name: "",
        description: "",
    },
    RoundTemplate {
        id: "grant",
        label: "Grant Round",
        round_type: RoundType::Grant,
        min_fair_score: 60.0,
        allocation_mode: AllocationMode::Weighted,
        name: "Grant Round",
        description: "Weighted funding by FairScore",
    },
    RoundTemplate {
        id: "airdrop",
        label: "Airdrop",
        round_type: RoundType::Airdrop,
        min_fair_score: 50.0,
        allocation_mode: AllocationMode::Binary,
        name: "Airdrop",
        description: "Token distribution by min score",
    },
    RoundTemplate {
        id: "allowlist",
        label: "Allowlist",
        round_type: RoundType::Allowlist,
        min_fair_score: 55.0,
        allocation_mode: AllocationMode::Binary,
        name: "Allowlist",
        description: "Spots for wallets above min score",
    },
    RoundTemplate {
        id: "dao",
        label: "DAO Voting",
        round_type: RoundType::Dao,
        min_fair_score: 65.0,
        allocation_mode: AllocationMode::Binary,
        name: "DAO Voting",
        description: "Governance eligibility (min 65 or gold)",
    },
    RoundTemplate {
        id: "bounty",
        label: "Bounty Batch",
        round_type: RoundType::Bounty,
        min_fair_score: 45.0,
        allocation_mode: AllocationMode::Weighted,
        name: "Bounty Batch",
        description: "Payout priority by reputation",
    },
];

pub fn find_template(id: &str) -> Option<&'static RoundTemplate> {
    let id = id.trim().to_lowercase();
    TEMPLATES.iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_template() {
        let grant = find_template("Grant").unwrap();
        assert_eq!(grant.min_fair_score, 60.0);
        assert_eq!(grant.allocation_mode, AllocationMode::Weighted);
        assert_eq!(find_template("dao").unwrap().round_type, RoundType::Dao);
        assert!(find_template("lottery").is_none());
    }

    #[test]
    fn test_template_ids_unique() {
        for (i, a) in TEMPLATES.iter().enumerate() {
            assert!(TEMPLATES[i + 1..].iter().all(|b| b.id != a.id));
        }
    }
}
