//! FairScale score lookups
//!
//! Two interchangeable providers sit behind [`ScoreProvider`]:
//! - [`FairScaleClient`] calls `GET {base}/score?wallet=...` with a `fairkey` header
//! - [`MockScoreProvider`] derives a reproducible score from the address alone
//!
//! [`provider_from_config`] picks the remote client when an API key is configured.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ScoreError;
use crate::types::{parse_timestamp, Badge, Features, ScoreResult, Tier};

const USER_AGENT: &str = concat!("fair-allocator/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of reputation scores for wallet addresses
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    /// Look up the score for one wallet. A blank wallet yields a zero score.
    async fn fetch_score(&self, wallet: &str) -> Result<ScoreResult, ScoreError>;

    /// Successful lookups made this session (display only)
    fn query_count(&self) -> u64;

    /// Whether scores come from the live API
    fn is_live(&self) -> bool {
        false
    }
}

/// Build the provider for this session: remote when a key resolves, mock otherwise
pub fn provider_from_config(config: &Config, stored_key: Option<&str>) -> Box<dyn ScoreProvider> {
    match config.fairscale_api_key(stored_key) {
        Some(key) => {
            info!("Using FairScale API at {}", config.fairscale.base_url);
            Box::new(FairScaleClient::new(
                &config.fairscale.base_url,
                key,
                Duration::from_secs(config.fairscale.timeout_secs),
            ))
        }
        None => {
            info!("No FairScale API key configured - using deterministic demo scores");
            Box::new(MockScoreProvider::new())
        }
    }
}

// ============================================================================
// Remote API
// ============================================================================

/// Response shape of FairScale `GET /score`
#[derive(Debug, Deserialize)]
struct ScoreResponse {
    wallet: String,
    fairscore: f64,
    #[serde(default)]
    fairscore_base: Option<f64>,
    #[serde(default)]
    social_score: Option<f64>,
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    badges: Vec<Badge>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    features: Option<BTreeMap<String, serde_json::Value>>,
}

impl From<ScoreResponse> for ScoreResult {
    fn from(data: ScoreResponse) -> Self {
        // Non-numeric signals are dropped rather than failing the lookup
        let features = data.features.map(|raw| {
            raw.into_iter()
                .filter_map(|(name, value)| value.as_f64().map(|v| (name, v)))
                .collect::<Features>()
        });

        Self {
            wallet: data.wallet,
            fair_score: data.fairscore,
            base_score: data.fairscore_base,
            social_score: data.social_score,
            tier: data.tier.and_then(|t| t.parse::<Tier>().ok()),
            badges: data.badges,
            features,
            scored_at: data.timestamp.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// FairScale REST client. Lookups are never cached.
pub struct FairScaleClient {
    client: Client,
    base_url: String,
    api_key: String,
    queries: AtomicU64,
}

impl FairScaleClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Self {
        let timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            queries: AtomicU64::new(0),
        }
    }

    fn score_url(&self, wallet: &str) -> String {
        format!(
            "{}/score?wallet={}",
            self.base_url,
            urlencoding::encode(wallet)
        )
    }
}

#[async_trait]
impl ScoreProvider for FairScaleClient {
    async fn fetch_score(&self, wallet: &str) -> Result<ScoreResult, ScoreError> {
        let wallet = wallet.trim();
        if wallet.is_empty() {
            return Ok(ScoreResult::empty(wallet));
        }

        let url = self.score_url(wallet);
        debug!("Fetching FairScore: {}", url);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .header("fairkey", &self.api_key)
            .send()
            .await
            .map_err(|e| ScoreError::TransportError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("FairScale API error {}: {}", status, body);

            return Err(match status.as_u16() {
                401 => ScoreError::InvalidCredential,
                429 => ScoreError::RateLimited,
                code => {
                    let message = serde_json::from_str::<ErrorBody>(&body)
                        .ok()
                        .and_then(|b| b.message)
                        .filter(|m| !m.is_empty())
                        .or_else(|| status.canonical_reason().map(str::to_string))
                        .unwrap_or_else(|| format!("HTTP {}", code));
                    ScoreError::RemoteError(message)
                }
            });
        }

        let data: ScoreResponse = response
            .json()
            .await
            .map_err(|e| ScoreError::Decode(e.to_string()))?;

        self.queries.fetch_add(1, Ordering::Relaxed);
        Ok(data.into())
    }

    fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    fn is_live(&self) -> bool {
        true
    }
}

// ============================================================================
// Offline demo scores
// ============================================================================

/// 32-bit multiplicative string hash: `h = h * 31 + unit` over UTF-16 code
/// units with two's-complement wraparound.
pub fn wallet_hash(normalized: &str) -> i32 {
    normalized
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Round half up to one decimal place
fn round_tenth(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// Deterministic demo score for a wallet.
///
/// Every number is a pure function of the trimmed, lowercased address, so
/// repeated lookups agree without any server call.
pub fn mock_score(wallet: &str, scored_at: DateTime<Utc>) -> ScoreResult {
    let normalized = wallet.trim().to_lowercase();
    let r = i64::from(wallet_hash(&normalized)).unsigned_abs();

    let fairscore = (r % 10_000) as f64 / 100.0;
    let base = (fairscore * 0.85).min(100.0);
    let social = (fairscore * 0.5 + (r % 30) as f64).min(100.0);

    let tier = if fairscore < 25.0 {
        Tier::Bronze
    } else if fairscore < 50.0 {
        Tier::Silver
    } else if fairscore < 75.0 {
        Tier::Gold
    } else {
        Tier::Platinum
    };

    let mut badges = Vec::new();
    if fairscore >= 40.0 {
        badges.push(badge("active", "Active", "Consistent on-chain activity", Tier::Silver));
    }
    if fairscore >= 60.0 {
        badges.push(badge(
            "diamond_hands",
            "Diamond Hands",
            "Long-term holder with conviction",
            Tier::Platinum,
        ));
    }
    if social >= 30.0 {
        badges.push(badge("social", "Social", "Verified social presence", Tier::Gold));
    }

    let features: Features = [
        ("wallet_age_days", (30 + r % 400) as f64),
        ("tx_count", (50 + r % 2000) as f64),
        ("active_days", (10 + r % 180) as f64),
        ("native_sol_percentile", (r % 100) as f64 / 100.0),
        ("major_percentile_score", (r % 80) as f64 / 100.0),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect();

    ScoreResult {
        wallet: normalized,
        fair_score: round_tenth(fairscore),
        base_score: Some(round_tenth(base)),
        social_score: Some(round_tenth(social)),
        tier: Some(tier),
        badges,
        features: Some(features),
        scored_at: Some(scored_at),
    }
}

fn badge(id: &str, label: &str, description: &str, tier: Tier) -> Badge {
    Badge {
        id: id.to_string(),
        label: label.to_string(),
        description: description.to_string(),
        tier: tier.to_string(),
    }
}

/// Offline provider with a session-lifetime cache
#[derive(Default)]
pub struct MockScoreProvider {
    cache: Mutex<HashMap<String, ScoreResult>>,
    queries: AtomicU64,
}

impl MockScoreProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoreProvider for MockScoreProvider {
    async fn fetch_score(&self, wallet: &str) -> Result<ScoreResult, ScoreError> {
        let key = wallet.trim().to_lowercase();
        if key.is_empty() {
            return Ok(ScoreResult::empty(key));
        }

        let result = self
            .cache
            .lock()
            .entry(key)
            .or_insert_with_key(|key| mock_score(key, Utc::now()))
            .clone();

        self.queries.fetch_add(1, Ordering::Relaxed);
        Ok(result)
    }

    fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}
