//! Error taxonomy
//!
//! Every failure here is local and recoverable by retrying the action that
//! triggered it. Persistence failures never appear: the store logs them and
//! keeps its in-memory state.

use thiserror::Error;
use uuid::Uuid;

/// Score lookup failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("Invalid API key. Get one at sales.fairscale.xyz")]
    InvalidCredential,

    #[error("Rate limit exceeded. Upgrade at sales.fairscale.xyz")]
    RateLimited,

    #[error("{0}")]
    RemoteError(String),

    #[error("network error: {0}")]
    TransportError(String),

    #[error("unexpected score response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum AllocatorError {
    #[error("Invalid Solana address (use 32–44 base58 characters).")]
    InvalidAddress,

    #[error("Invalid round data: {0}")]
    MalformedImport(String),

    #[error("round not found: {0}")]
    RoundNotFound(String),

    #[error("applicant not found: {0}")]
    ApplicantNotFound(Uuid),

    #[error("{action} requires committee verification (FairScore >= {min_score} or tier >= {min_tier})")]
    NotAuthorized {
        action: String,
        min_score: f64,
        min_tier: String,
    },

    #[error(transparent)]
    Score(#[from] ScoreError),
}

pub type Result<T> = std::result::Result<T, AllocatorError>;
