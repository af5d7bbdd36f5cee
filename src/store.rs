//! Round collection
//!
//! Owns id assignment and persists the full collection after every mutation.
//! Persistence failures are logged and swallowed: the in-memory rounds stay
//! authoritative for the running session.

use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AllocatorError, Result};
use crate::kv::{KeyValueStore, ROUNDS_KEY};
use crate::types::{clamp_score, Applicant, NewRound, Round, ScoreResult};

pub struct RoundStore {
    /// Most recently created first
    rounds: Vec<Round>,
    kv: Arc<dyn KeyValueStore>,
}

impl RoundStore {
    /// Load the persisted collection. Missing or corrupt data is an empty collection.
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let rounds = match kv.get(ROUNDS_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<Round>>(&raw).unwrap_or_else(|e| {
                warn!("Stored rounds are unreadable, starting empty: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read stored rounds, starting empty: {}", e);
                Vec::new()
            }
        };
        debug!("Loaded {} rounds", rounds.len());
        Self { rounds, kv }
    }

    pub fn list(&self) -> &[Round] {
        &self.rounds
    }

    pub fn get(&self, id: Uuid) -> Option<&Round> {
        self.rounds.iter().find(|r| r.id == id)
    }

    /// Find a round by full id or unique id prefix
    pub fn resolve(&self, id_or_prefix: &str) -> Result<&Round> {
        let needle = id_or_prefix.trim().to_lowercase();
        if needle.is_empty() {
            return Err(AllocatorError::RoundNotFound(id_or_prefix.to_string()));
        }

        let mut matches = self
            .rounds
            .iter()
            .filter(|r| r.id.to_string().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(round), None) => Ok(round),
            (Some(_), Some(_)) => Err(AllocatorError::RoundNotFound(format!(
                "{} (ambiguous prefix)",
                id_or_prefix
            ))),
            _ => Err(AllocatorError::RoundNotFound(id_or_prefix.to_string())),
        }
    }

    /// Create an empty round with a fresh id and creation time
    pub fn create(&mut self, fields: NewRound) -> Round {
        let round = Round {
            id: Uuid::new_v4(),
            name: fields.name,
            description: fields.description,
            total_budget: fields.total_budget.max(0.0),
            currency: fields.currency,
            created_at: Utc::now(),
            applicants: Vec::new(),
            min_fair_score: clamp_score(fields.min_fair_score),
            allocation_mode: fields.allocation_mode,
            round_type: fields.round_type,
        };

        info!("Created round {} ({})", round.name, round.id);
        self.rounds.insert(0, round.clone());
        self.persist();
        round
    }

    pub fn delete_round(&mut self, round_id: Uuid) -> Result<Round> {
        let index = self
            .rounds
            .iter()
            .position(|r| r.id == round_id)
            .ok_or_else(|| AllocatorError::RoundNotFound(round_id.to_string()))?;

        let removed = self.rounds.remove(index);
        info!("Deleted round {} ({})", removed.name, removed.id);
        self.persist();
        Ok(removed)
    }

    /// Append a scored wallet under a fresh applicant id
    pub fn add_applicant(&mut self, round_id: Uuid, score: ScoreResult) -> Result<Round> {
        let round = self.round_mut(round_id)?;
        let applicant = Applicant::from_score(Uuid::new_v4(), score);
        debug!(
            "Adding applicant {} ({:.1}) to round {}",
            applicant.wallet, applicant.fair_score, round_id
        );
        round.applicants.push(applicant);

        let updated = round.clone();
        self.persist();
        Ok(updated)
    }

    pub fn remove_applicant(&mut self, round_id: Uuid, applicant_id: Uuid) -> Result<Applicant> {
        let round = self.round_mut(round_id)?;
        let index = round
            .applicants
            .iter()
            .position(|a| a.id == applicant_id)
            .ok_or(AllocatorError::ApplicantNotFound(applicant_id))?;

        let removed = round.applicants.remove(index);
        self.persist();
        Ok(removed)
    }

    /// Set the manual approval flag. A `None` reason keeps any earlier reason.
    pub fn set_override(
        &mut self,
        round_id: Uuid,
        applicant_id: Uuid,
        approved: bool,
        reason: Option<String>,
    ) -> Result<Applicant> {
        let applicant = self.applicant_mut(round_id, applicant_id)?;
        applicant.override_approved = Some(approved);
        if let Some(reason) = reason {
            applicant.override_reason = Some(reason);
        }
        info!(
            "Override for {} set to {} (reason: {})",
            applicant.wallet,
            approved,
            applicant.override_reason.as_deref().unwrap_or("none")
        );

        let updated = applicant.clone();
        self.persist();
        Ok(updated)
    }

    pub fn clear_override_reason(&mut self, round_id: Uuid, applicant_id: Uuid) -> Result<()> {
        self.applicant_mut(round_id, applicant_id)?.override_reason = None;
        self.persist();
        Ok(())
    }

    /// Import a serialized round as a clone: the round, its creation time and
    /// every applicant get fresh values, so re-importing never collides.
    /// Nothing is committed unless the whole payload parses.
    pub fn import(&mut self, serialized: &str) -> Result<Round> {
        let mut value: Value = serde_json::from_str(serialized)
            .map_err(|e| AllocatorError::MalformedImport(e.to_string()))?;

        let object = value
            .as_object_mut()
            .ok_or_else(|| AllocatorError::MalformedImport("expected a round object".into()))?;
        object.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        object.insert("createdAt".into(), Value::from(Utc::now().timestamp_millis()));

        let applicants = object.entry("applicants").or_insert(Value::Null);
        if applicants.is_null() {
            *applicants = Value::Array(Vec::new());
        }
        let Value::Array(applicants) = applicants else {
            return Err(AllocatorError::MalformedImport(
                "applicants must be a list".into(),
            ));
        };
        for applicant in applicants.iter_mut() {
            let applicant = applicant.as_object_mut().ok_or_else(|| {
                AllocatorError::MalformedImport("expected applicant objects".into())
            })?;
            applicant.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        }

        let mut round: Round = serde_json::from_value(value)
            .map_err(|e| AllocatorError::MalformedImport(e.to_string()))?;
        round.min_fair_score = clamp_score(round.min_fair_score);
        round.total_budget = round.total_budget.max(0.0);
        for applicant in &mut round.applicants {
            applicant.fair_score = clamp_score(applicant.fair_score);
        }

        info!(
            "Imported round {} with {} applicants as {}",
            round.name,
            round.applicants.len(),
            round.id
        );
        self.rounds.insert(0, round.clone());
        self.persist();
        Ok(round)
    }

    /// Import from a share token or a full share link
    pub fn import_token(&mut self, token_or_link: &str) -> Result<Round> {
        let json = decode_share_token(token_or_link)?;
        self.import(&json)
    }

    fn round_mut(&mut self, round_id: Uuid) -> Result<&mut Round> {
        self.rounds
            .iter_mut()
            .find(|r| r.id == round_id)
            .ok_or_else(|| AllocatorError::RoundNotFound(round_id.to_string()))
    }

    fn applicant_mut(&mut self, round_id: Uuid, applicant_id: Uuid) -> Result<&mut Applicant> {
        self.round_mut(round_id)?
            .applicants
            .iter_mut()
            .find(|a| a.id == applicant_id)
            .ok_or(AllocatorError::ApplicantNotFound(applicant_id))
    }

    fn persist(&self) {
        let json = match serde_json::to_string(&self.rounds) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize rounds: {}", e);
                return;
            }
        };
        if let Err(e) = self.kv.put(ROUNDS_KEY, &json) {
            warn!("Failed to persist rounds (kept in memory): {}", e);
        }
    }
}

/// Compact URL-safe token carrying the whole round
pub fn share_token(round: &Round) -> serde_json::Result<String> {
    let json = serde_json::to_vec(round)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// `<base_url>?round=<token>`
pub fn share_link(base_url: &str, round: &Round) -> serde_json::Result<String> {
    Ok(format!("{}?round={}", base_url, share_token(round)?))
}

/// Decode a share token (or a link carrying one) back into round JSON.
///
/// Accepts URL-safe tokens and the standard-alphabet tokens produced by
/// browser links, where `+` may have been turned into a space.
pub fn decode_share_token(token_or_link: &str) -> Result<String> {
    let raw = token_or_link.trim();
    let token = match raw.find("round=") {
        Some(start) => {
            let rest = &raw[start + "round=".len()..];
            let rest = rest.split(['&', '#']).next().unwrap_or_default();
            urlencoding::decode(rest)
                .map(|t| t.into_owned())
                .unwrap_or_else(|_| rest.to_string())
        }
        None => raw.to_string(),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim_end_matches('='))
        .or_else(|_| STANDARD.decode(token.replace(' ', "+")))
        .map_err(|e| AllocatorError::MalformedImport(format!("invalid share token: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| AllocatorError::MalformedImport(format!("invalid share token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::SqliteStore;
    use crate::types::{AllocationMode, RoundType, Tier};

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("disk unavailable")
        }
        fn put(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk unavailable")
        }
        fn delete(&self, _key: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk unavailable")
        }
    }

    fn new_round(name: &str) -> NewRound {
        NewRound {
            name: name.to_string(),
            description: "Quarterly grants".to_string(),
            total_budget: 1000.0,
            currency: "USDC".to_string(),
            min_fair_score: 60.0,
            allocation_mode: AllocationMode::Weighted,
            round_type: RoundType::Grant,
        }
    }

    fn score(wallet: &str, fair_score: f64) -> ScoreResult {
        ScoreResult {
            fair_score,
            ..ScoreResult::empty(wallet)
        }
    }

    fn memory_store() -> (Arc<SqliteStore>, RoundStore) {
        let kv = Arc::new(SqliteStore::in_memory().unwrap());
        let store = RoundStore::load(kv.clone());
        (kv, store)
    }

    #[test]
    fn test_create_and_list_newest_first() {
        let (_kv, mut store) = memory_store();
        let first = store.create(new_round("First"));
        let second = store.create(new_round("Second"));

        let ids: Vec<Uuid> = store.list().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(first.applicants.is_empty());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_mutations_persist() {
        let (kv, mut store) = memory_store();
        let round = store.create(new_round("Grants"));
        store.add_applicant(round.id, score("walletA", 80.0)).unwrap();

        let reloaded = RoundStore::load(kv);
        let stored = reloaded.get(round.id).unwrap();
        assert_eq!(stored.applicants.len(), 1);
        assert_eq!(stored.applicants[0].wallet, "walletA");
    }

    #[test]
    fn test_applicant_ids_are_unique() {
        let (_kv, mut store) = memory_store();
        let round = store.create(new_round("Grants"));
        store.add_applicant(round.id, score("same", 50.0)).unwrap();
        let updated = store.add_applicant(round.id, score("same", 50.0)).unwrap();

        assert_eq!(updated.applicants.len(), 2);
        assert_ne!(updated.applicants[0].id, updated.applicants[1].id);
    }

    #[test]
    fn test_remove_applicant() {
        let (_kv, mut store) = memory_store();
        let round = store.create(new_round("Grants"));
        let updated = store.add_applicant(round.id, score("a", 10.0)).unwrap();
        let id = updated.applicants[0].id;

        store.remove_applicant(round.id, id).unwrap();
        assert!(store.get(round.id).unwrap().applicants.is_empty());
        assert!(matches!(
            store.remove_applicant(round.id, id),
            Err(AllocatorError::ApplicantNotFound(_))
        ));
    }

    #[test]
    fn test_override_reason_retained_until_cleared() {
        let (_kv, mut store) = memory_store();
        let round = store.create(new_round("Grants"));
        let updated = store.add_applicant(round.id, score("a", 10.0)).unwrap();
        let id = updated.applicants[0].id;

        store
            .set_override(round.id, id, true, Some("core contributor".into()))
            .unwrap();
        let revoked = store.set_override(round.id, id, false, None).unwrap();
        assert_eq!(revoked.override_approved, Some(false));
        assert_eq!(revoked.override_reason.as_deref(), Some("core contributor"));

        store.clear_override_reason(round.id, id).unwrap();
        assert!(store.get(round.id).unwrap().applicants[0]
            .override_reason
            .is_none());
    }

    #[test]
    fn test_unknown_round() {
        let (_kv, mut store) = memory_store();
        let missing = Uuid::new_v4();
        assert!(matches!(
            store.add_applicant(missing, score("a", 1.0)),
            Err(AllocatorError::RoundNotFound(_))
        ));
        assert!(store.delete_round(missing).is_err());
    }

    #[test]
    fn test_delete_round() {
        let (kv, mut store) = memory_store();
        let round = store.create(new_round("Doomed"));
        store.delete_round(round.id).unwrap();
        assert!(store.list().is_empty());
        assert!(RoundStore::load(kv).list().is_empty());
    }

    #[test]
    fn test_resolve_by_prefix() {
        let (_kv, mut store) = memory_store();
        let round = store.create(new_round("Grants"));
        let prefix = &round.id.to_string()[..8];

        assert_eq!(store.resolve(prefix).unwrap().id, round.id);
        assert_eq!(store.resolve(&round.id.to_string()).unwrap().id, round.id);
        assert!(store.resolve("").is_err());
    }

    #[test]
    fn test_corrupt_collection_loads_empty() {
        let kv = Arc::new(SqliteStore::in_memory().unwrap());
        kv.put(ROUNDS_KEY, "{not json").unwrap();
        assert!(RoundStore::load(kv).list().is_empty());
    }

    #[test]
    fn test_persistence_failure_is_not_fatal() {
        let mut store = RoundStore::load(Arc::new(FailingStore));
        let round = store.create(new_round("Offline"));
        let updated = store.add_applicant(round.id, score("a", 70.0)).unwrap();
        assert_eq!(updated.applicants.len(), 1);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_import_is_a_clone() {
        let (_kv, mut store) = memory_store();
        let round = store.create(new_round("Original"));
        let round = store.add_applicant(round.id, score("a", 70.0)).unwrap();
        let json = serde_json::to_string(&round).unwrap();

        let first = store.import(&json).unwrap();
        let second = store.import(&json).unwrap();

        assert_ne!(first.id, round.id);
        assert_ne!(first.id, second.id);
        assert_ne!(first.applicants[0].id, round.applicants[0].id);
        assert_ne!(first.applicants[0].id, second.applicants[0].id);
        assert_eq!(first.name, round.name);
        assert_eq!(store.list().len(), 3);
        assert_eq!(store.list()[0].id, second.id);
    }

    fn browser_round(timestamp: &str, tier: &str) -> String {
        serde_json::json!({
            "id": "r-1",
            "name": "Browser round",
            "description": "",
            "totalBudget": 500,
            "currency": "USDC",
            "createdAt": 1717243200000i64,
            "minFairScore": 50,
            "allocationMode": "weighted",
            "roundType": "grant",
            "applicants": [{
                "id": "a-1",
                "wallet": "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
                "fairScore": 61.2,
                "tier": tier,
                "badges": [],
                "timestamp": timestamp,
                "label": "Core dev",
                "notes": "Met at hackathon",
                "requestedAmount": 250
            }]
        })
        .to_string()
    }

    #[test]
    fn test_import_tolerates_loose_timestamp_and_unknown_tier() {
        let (_kv, mut store) = memory_store();

        let round = store
            .import(&browser_round("2025-06-01 12:00:00", "diamond"))
            .unwrap();
        let applicant = &round.applicants[0];
        assert_eq!(applicant.fair_score, 61.2);
        assert_eq!(applicant.tier, None);
        assert_eq!(
            applicant.scored_at.map(|ts| ts.to_rfc3339()),
            Some("2025-06-01T12:00:00+00:00".to_string())
        );

        let round = store.import(&browser_round("yesterday", "gold")).unwrap();
        assert_eq!(round.applicants[0].tier, Some(Tier::Gold));
        assert_eq!(round.applicants[0].scored_at, None);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn test_import_keeps_applicant_notes() {
        let (kv, mut store) = memory_store();
        let round = store
            .import(&browser_round("2025-06-01T12:00:00Z", "gold"))
            .unwrap();

        let applicant = &round.applicants[0];
        assert_eq!(applicant.label.as_deref(), Some("Core dev"));
        assert_eq!(applicant.notes.as_deref(), Some("Met at hackathon"));
        assert_eq!(applicant.requested_amount, Some(250.0));

        let json = serde_json::to_value(applicant).unwrap();
        assert_eq!(json["label"], "Core dev");
        assert_eq!(json["requestedAmount"], 250.0);

        let reloaded = RoundStore::load(kv);
        assert_eq!(
            reloaded.get(round.id).unwrap().applicants[0].notes.as_deref(),
            Some("Met at hackathon")
        );
    }

    #[test]
    fn test_malformed_import_commits_nothing() {
        let (_kv, mut store) = memory_store();
        for bad in ["not json", "[1,2]", r#"{"name":"x"}"#, r#"{"name":"x","applicants":5}"#] {
            assert!(matches!(
                store.import(bad),
                Err(AllocatorError::MalformedImport(_))
            ));
        }
        assert!(store.list().is_empty());
        assert!(store.import_token("%%%not-base64%%%").is_err());
    }

    #[test]
    fn test_share_token_round_trip() {
        let (_kv, mut store) = memory_store();
        let round = store.create(new_round("Shared ✓"));
        let round = store.add_applicant(round.id, score("a", 42.0)).unwrap();

        let token = share_token(&round).unwrap();
        assert!(!token.contains(['+', '/', '=']));

        let link = share_link("https://allocator.example/", &round).unwrap();
        let imported = store.import_token(&link).unwrap();
        assert_eq!(imported.name, "Shared ✓");
        assert_eq!(imported.applicants[0].fair_score, 42.0);
    }

    #[test]
    fn test_decode_standard_alphabet_token() {
        let json = r#"{"a":"??>"}"#;
        let token = STANDARD.encode(json);
        assert_eq!(decode_share_token(&token).unwrap(), json);
        let spaced = token.replace('+', " ");
        assert_eq!(decode_share_token(&spaced).unwrap(), json);
    }
}
