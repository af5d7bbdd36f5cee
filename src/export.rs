//! Round exports
//!
//! CSV (one row per applicant in ranked order) and the full round as JSON.
//! Both are derived views, not sources of truth.

use chrono::{DateTime, Utc};

use crate::engine::ranked_view;
use crate::types::Round;

pub const CSV_HEADERS: [&str; 13] = [
    "Round type",
    "Rank",
    "Wallet",
    "FairScore",
    "Tier",
    "Base",
    "Social",
    "Eligible",
    "Override",
    "Override reason",
    "Suggested allocation",
    "Risk",
    "Badges",
];

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn one_decimal(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_default()
}

/// Ranked applicant table. Header row is unquoted, every data cell is quoted.
pub fn to_csv(round: &Round) -> String {
    let round_type = round.round_type.label();

    let rows = ranked_view(round).into_iter().map(|row| {
        let a = row.applicant;
        let cells = [
            round_type.to_string(),
            row.rank.to_string(),
            a.wallet.clone(),
            format!("{:.1}", a.fair_score),
            a.tier.map(|t| t.to_string()).unwrap_or_default(),
            one_decimal(a.base_score),
            one_decimal(a.social_score),
            if row.eligible { "Yes" } else { "No" }.to_string(),
            if a.is_overridden() { "Yes" } else { "" }.to_string(),
            a.override_reason.clone().unwrap_or_default(),
            row.suggested_allocation
                .map(|v| format!("{:.2}", v))
                .unwrap_or_default(),
            row.risk.label().to_string(),
            a.badges
                .iter()
                .map(|b| b.label.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        ];
        cells.iter().map(|c| quote(c)).collect::<Vec<_>>().join(",")
    });

    std::iter::once(CSV_HEADERS.join(","))
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The round record verbatim, pretty-printed
pub fn to_json(round: &Round) -> serde_json::Result<String> {
    serde_json::to_string_pretty(round)
}

fn dashed(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("-")
}

pub fn csv_file_name(round: &Round, at: DateTime<Utc>) -> String {
    format!(
        "fair-allocator-{}-{}-{}.csv",
        round.round_type,
        dashed(&round.name),
        at.timestamp_millis()
    )
}

pub fn json_file_name(round: &Round, at: DateTime<Utc>) -> String {
    format!(
        "fair-allocator-round-{}-{}.json",
        dashed(&round.name),
        at.timestamp_millis()
    )
}
