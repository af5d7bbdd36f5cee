use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use fair_allocator::auth::validate_address;
use fair_allocator::{
    engine::eligible_applicants, is_eligible, rank, share_token, weighted_allocation,
    AllocationMode, CommitteeGate, CommitteePolicy, GatedAction, MockScoreProvider, NewRound,
    RoundStore, RoundType, ScoreError, ScoreProvider, ScoreResult, SqliteStore,
};
use uuid::Uuid;

const WALLET_80: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
const WALLET_40: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
const WALLET_20: &str = "DRpbCBMxVnDK7maPM5tGv6MvB3v1sRMC86PZ8okm21hy";

/// Provider returning fixed scores, for engine tests that must not depend on the hash
struct FixedScores {
    scores: HashMap<&'static str, f64>,
    queries: AtomicU64,
}

impl FixedScores {
    fn new() -> Self {
        Self {
            scores: HashMap::from([(WALLET_80, 80.0), (WALLET_40, 40.0), (WALLET_20, 20.0)]),
            queries: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ScoreProvider for FixedScores {
    async fn fetch_score(&self, wallet: &str) -> Result<ScoreResult, ScoreError> {
        let score = self
            .scores
            .get(wallet)
            .copied()
            .ok_or_else(|| ScoreError::RemoteError("Wallet not found".to_string()))?;
        self.queries.fetch_add(1, Ordering::Relaxed);
        Ok(ScoreResult {
            fair_score: score,
            ..ScoreResult::empty(wallet)
        })
    }

    fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

fn grant_round() -> NewRound {
    NewRound {
        name: "Ecosystem Grants".to_string(),
        description: "Q3 builders".to_string(),
        total_budget: 1000.0,
        currency: "USDC".to_string(),
        min_fair_score: 60.0,
        allocation_mode: AllocationMode::Weighted,
        round_type: RoundType::Grant,
    }
}

async fn add(store: &mut RoundStore, provider: &dyn ScoreProvider, round_id: Uuid, wallet: &str) {
    let wallet = validate_address(wallet).expect("valid address");
    let score = provider.fetch_score(wallet).await.expect("score lookup");
    store.add_applicant(round_id, score).expect("round exists");
}

#[tokio::test]
async fn weighted_round_end_to_end() {
    let kv = Arc::new(SqliteStore::in_memory().unwrap());
    let mut store = RoundStore::load(kv.clone());
    let provider = FixedScores::new();

    let round = store.create(grant_round());
    for wallet in [WALLET_40, WALLET_80, WALLET_20] {
        add(&mut store, &provider, round.id, wallet).await;
    }
    assert_eq!(provider.query_count(), 3);

    let round = store.get(round.id).unwrap().clone();
    let ranked: Vec<f64> = rank(&round.applicants).iter().map(|a| a.fair_score).collect();
    assert_eq!(ranked, vec![80.0, 40.0, 20.0]);

    let eligible: Vec<f64> = eligible_applicants(&round)
        .iter()
        .map(|a| a.fair_score)
        .collect();
    assert_eq!(eligible, vec![80.0]);

    let id_of = |wallet: &str| {
        round
            .applicants
            .iter()
            .find(|a| a.wallet == wallet)
            .unwrap()
            .id
    };
    let (id80, id40, id20) = (id_of(WALLET_80), id_of(WALLET_40), id_of(WALLET_20));

    let allocation = weighted_allocation(&round);
    assert_eq!(allocation.len(), 1);
    assert!((allocation[&id80] - 1000.0).abs() < 1e-9);

    // Approving the 40-point applicant folds it into the weighted set
    store
        .set_override(round.id, id40, true, Some("core maintainer".into()))
        .unwrap();
    let round = store.get(round.id).unwrap().clone();
    assert!(is_eligible(round.applicant(id40).unwrap(), &round));
    assert!(!is_eligible(round.applicant(id20).unwrap(), &round));

    let allocation = weighted_allocation(&round);
    assert_eq!(allocation.len(), 2);
    assert!((allocation[&id80] - 666.67).abs() < 0.01);
    assert!((allocation[&id40] - 333.33).abs() < 0.01);
    assert!(!allocation.contains_key(&id20));

    // State survives a reload from the same database
    let reloaded = RoundStore::load(kv);
    let persisted = reloaded.get(round.id).unwrap();
    assert_eq!(persisted.applicants.len(), 3);
    assert!(persisted.applicant(id40).unwrap().is_overridden());
}

#[tokio::test]
async fn failed_lookup_leaves_round_unchanged() {
    let kv = Arc::new(SqliteStore::in_memory().unwrap());
    let mut store = RoundStore::load(kv);
    let provider = FixedScores::new();
    let round = store.create(grant_round());

    let unknown = "3Kz9vQ8bFhZ1mWc2YtRr4pLxN5sJdG6aUe7HkB8nTqVw";
    let err = provider.fetch_score(unknown).await.unwrap_err();
    assert_eq!(err, ScoreError::RemoteError("Wallet not found".to_string()));
    assert!(store.get(round.id).unwrap().applicants.is_empty());
}

#[tokio::test]
async fn import_of_shared_round_assigns_fresh_identity() {
    let kv = Arc::new(SqliteStore::in_memory().unwrap());
    let mut store = RoundStore::load(kv);
    let provider = MockScoreProvider::new();

    let original = store.create(grant_round());
    for wallet in [WALLET_80, WALLET_40] {
        add(&mut store, &provider, original.id, wallet).await;
    }
    let original = store.get(original.id).unwrap().clone();

    let token = share_token(&original).unwrap();
    let copy = store.import_token(&token).unwrap();

    assert_ne!(copy.id, original.id);
    assert!(copy.created_at >= original.created_at);
    assert_eq!(copy.name, original.name);
    assert_eq!(copy.description, original.description);
    assert_eq!(copy.total_budget, original.total_budget);
    assert_eq!(copy.currency, original.currency);
    assert_eq!(copy.min_fair_score, original.min_fair_score);
    assert_eq!(copy.allocation_mode, original.allocation_mode);
    assert_eq!(copy.round_type, original.round_type);
    assert_eq!(copy.applicants.len(), original.applicants.len());

    for (a, b) in copy.applicants.iter().zip(&original.applicants) {
        assert_ne!(a.id, b.id);
        assert_eq!(a.wallet, b.wallet);
        assert_eq!(a.fair_score, b.fair_score);
        assert_eq!(a.tier, b.tier);
        assert_eq!(a.badges, b.badges);
    }

    let again = store.import_token(&token).unwrap();
    assert_ne!(again.id, copy.id);
    assert_eq!(store.list().len(), 3);
}

#[tokio::test]
async fn demo_scores_are_stable_within_a_session() {
    let provider = MockScoreProvider::new();
    let first = provider.fetch_score(WALLET_80).await.unwrap();
    let second = provider
        .fetch_score(&format!("  {}\n", WALLET_80.to_uppercase()))
        .await
        .unwrap();

    assert_eq!(first.fair_score, second.fair_score);
    assert_eq!(first.scored_at, second.scored_at);
    assert!((0.0..=100.0).contains(&first.fair_score));
}

#[tokio::test]
async fn committee_gate_unlocks_privileged_actions() {
    let kv = Arc::new(SqliteStore::in_memory().unwrap());
    let provider = FixedScores::new();
    let mut gate = CommitteeGate::load(kv.clone(), CommitteePolicy::default());

    assert!(gate.require(GatedAction::CreateRound).is_err());

    gate.verify(&provider, WALLET_20).await.unwrap();
    assert!(gate.require(GatedAction::CreateRound).is_err());

    gate.verify(&provider, WALLET_40).await.unwrap();
    assert!(gate.require(GatedAction::CreateRound).is_ok());
    assert!(gate.require(GatedAction::ExportCsv).is_ok());

    // Session-wide: a fresh gate over the same store sees the verification
    let reloaded = CommitteeGate::load(kv, CommitteePolicy::default());
    assert!(reloaded.is_satisfied());
}

#[tokio::test]
async fn concurrent_writers_keep_only_the_last_collection() {
    // Two sessions over one database: each holds its own in-memory rounds and
    // writes the whole collection back, so the later write wins
    let kv = Arc::new(SqliteStore::in_memory().unwrap());
    let provider = FixedScores::new();

    let mut setup = RoundStore::load(kv.clone());
    let round = setup.create(grant_round());

    let mut first = RoundStore::load(kv.clone());
    let mut second = RoundStore::load(kv.clone());
    add(&mut first, &provider, round.id, WALLET_80).await;
    add(&mut second, &provider, round.id, WALLET_40).await;

    let reloaded = RoundStore::load(kv);
    let wallets: Vec<&str> = reloaded
        .get(round.id)
        .unwrap()
        .applicants
        .iter()
        .map(|a| a.wallet.as_str())
        .collect();
    assert_eq!(wallets, vec![WALLET_40]);
}
