//! Eligibility and allocation engine
//!
//! Pure functions over a round and its applicants. Eligibility is decided in
//! exactly one place, [`is_eligible`]; ranking, allocation, exports and the
//! ranked view all derive from it.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use uuid::Uuid;

use crate::types::{Applicant, RiskTier, Round};

/// Score at or above which an applicant is labelled healthy
pub const HEALTHY_MIN_SCORE: f64 = 60.0;
/// Score at or above which an applicant is labelled borderline
pub const BORDERLINE_MIN_SCORE: f64 = 25.0;

/// Sort by FairScore, highest first. Equal scores keep their input order.
pub fn rank(applicants: &[Applicant]) -> Vec<&Applicant> {
    let mut ranked: Vec<&Applicant> = applicants.iter().collect();
    // sort_by is stable
    ranked.sort_by(|a, b| {
        b.fair_score
            .partial_cmp(&a.fair_score)
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

/// Score clears the round threshold, or an operator approved the applicant.
/// An override can only grant eligibility, never revoke it.
pub fn is_eligible(applicant: &Applicant, round: &Round) -> bool {
    applicant.fair_score >= round.min_fair_score || applicant.is_overridden()
}

/// Eligible applicants in ranked order
pub fn eligible_applicants(round: &Round) -> Vec<&Applicant> {
    rank(&round.applicants)
        .into_iter()
        .filter(|a| is_eligible(a, round))
        .collect()
}

/// Suggested amount per eligible applicant, proportional to FairScore.
///
/// Empty for binary rounds, when nobody is eligible, or when the eligible
/// scores sum to zero. Amounts are advisory and unrounded.
pub fn weighted_allocation(round: &Round) -> HashMap<Uuid, f64> {
    let mut allocation = HashMap::new();
    if !round.is_weighted() {
        return allocation;
    }

    let eligible = eligible_applicants(round);
    let total: f64 = eligible.iter().map(|a| a.fair_score).sum();
    if eligible.is_empty() || total <= 0.0 {
        return allocation;
    }

    for applicant in eligible {
        allocation.insert(
            applicant.id,
            (applicant.fair_score / total) * round.total_budget,
        );
    }
    allocation
}

/// Display label only; never feeds eligibility
pub fn risk_tier(fair_score: f64) -> RiskTier {
    if fair_score >= HEALTHY_MIN_SCORE {
        RiskTier::Healthy
    } else if fair_score >= BORDERLINE_MIN_SCORE {
        RiskTier::Borderline
    } else {
        RiskTier::LikelySybil
    }
}

/// How many applicants would pass `candidate_min_score` on score alone.
/// Overrides are deliberately ignored.
pub fn simulate_threshold(applicants: &[Applicant], candidate_min_score: f64) -> usize {
    applicants
        .iter()
        .filter(|a| a.fair_score >= candidate_min_score)
        .count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundStats {
    /// Mean over all applicants, eligible or not
    pub average_score: f64,
    /// Occurrences of each badge label across all applicants
    pub badge_counts: BTreeMap<String, usize>,
    pub overridden_count: usize,
    pub total: usize,
}

/// `None` for an empty applicant list
pub fn aggregate_stats(applicants: &[Applicant]) -> Option<RoundStats> {
    if applicants.is_empty() {
        return None;
    }

    let total = applicants.len();
    let average_score = applicants.iter().map(|a| a.fair_score).sum::<f64>() / total as f64;

    let mut badge_counts = BTreeMap::new();
    for badge in applicants.iter().flat_map(|a| &a.badges) {
        *badge_counts.entry(badge.label.clone()).or_insert(0) += 1;
    }

    Some(RoundStats {
        average_score,
        badge_counts,
        overridden_count: applicants.iter().filter(|a| a.is_overridden()).count(),
        total,
    })
}

/// One row of the derived round view
#[derive(Debug, Clone, Serialize)]
pub struct RankedApplicant<'a> {
    /// 1-based
    pub rank: usize,
    pub applicant: &'a Applicant,
    pub eligible: bool,
    pub suggested_allocation: Option<f64>,
    pub risk: RiskTier,
}

/// Ranked, eligibility-flagged, optionally budget-weighted view of a round
pub fn ranked_view(round: &Round) -> Vec<RankedApplicant<'_>> {
    let allocation = weighted_allocation(round);

    rank(&round.applicants)
        .into_iter()
        .enumerate()
        .map(|(i, applicant)| RankedApplicant {
            rank: i + 1,
            applicant,
            eligible: is_eligible(applicant, round),
            suggested_allocation: allocation.get(&applicant.id).copied(),
            risk: risk_tier(applicant.fair_score),
        })
        .collect()
}
