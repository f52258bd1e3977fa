//! prism-store: the persistence collaborator for the scoring engine.
//!
//! Two stores, two upsert keys:
//!
//! | Record            | Upsert key                            |
//! |-------------------|---------------------------------------|
//! | `ProfilePayload`  | `(session_id, results_version)`       |
//! | `FcScores`        | `(session_id, version, fc_kind)`      |
//!
//! Recomputation overwrites, never appends: exactly one current row per key.
//! An upsert that hits a write conflict is retried once after re-reading the
//! conflicting key, then surfaced as a hard error. The trait boundary is the
//! contract; `MemoryStore` (concurrent map) and `SledStore` (single-node
//! durable) are the in-repo implementations.

mod memory;
mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use prism_core::{
    score_fc_session, FcBasis, FcBlock, FcOption, FcResponse, FcScoreRequest, FcScores,
    ProfilePayload, ScoreError, ScoringEngine, SessionInput,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(#[from] sled::Error),

    /// A write conflict survived the single retry. Hard error per the
    /// persistence contract.
    #[error("upsert conflict persisted after retry for key {0}")]
    Conflict(String),

    #[error(transparent)]
    Scoring(#[from] ScoreError),
}

/// Profile persistence, keyed `(session_id, results_version)`.
pub trait ProfileStore: Send + Sync {
    fn upsert_profile(&self, payload: &ProfilePayload) -> Result<(), StoreError>;
    fn get_profile(
        &self,
        session_id: &str,
        results_version: &str,
    ) -> Result<Option<ProfilePayload>, StoreError>;
}

/// Forced-choice score persistence, keyed `(session_id, version, fc_kind)`.
pub trait FcScoreStore: Send + Sync {
    fn upsert_fc_scores(&self, record: &FcScores) -> Result<(), StoreError>;
    fn get_fc_scores(
        &self,
        session_id: &str,
        version: &str,
        basis: FcBasis,
    ) -> Result<Option<FcScores>, StoreError>;
}

/// Composite key for a profile row. Session ids are opaque; the separator is
/// a control byte no id generator emits.
pub(crate) fn profile_key(session_id: &str, results_version: &str) -> String {
    format!("{session_id}\u{1f}{results_version}")
}

/// Composite key for a forced-choice score row.
pub(crate) fn fc_key(session_id: &str, version: &str, basis: FcBasis) -> String {
    format!("{session_id}\u{1f}{version}\u{1f}{}", basis.as_str())
}

/// Score a session's forced-choice responses and persist the record.
/// Zero responses still persists the empty outcome — downstream readers see
/// one authoritative row either way.
pub fn score_fc_and_persist<S: FcScoreStore + ?Sized>(
    req: &FcScoreRequest,
    blocks: &[FcBlock],
    options: &[FcOption],
    responses: &[FcResponse],
    store: &S,
) -> Result<FcScores, StoreError> {
    let record = score_fc_session(req, blocks, options, responses);
    store.upsert_fc_scores(&record)?;
    Ok(record)
}

/// Score a session and persist the validated profile. A payload that fails
/// self-validation never reaches the store.
pub fn score_and_persist<S: ProfileStore + ?Sized>(
    engine: &ScoringEngine,
    input: &SessionInput,
    computed_at: chrono::DateTime<chrono::Utc>,
    store: &S,
) -> Result<ProfilePayload, StoreError> {
    let payload = engine.score(input, computed_at)?;
    store.upsert_profile(&payload)?;
    Ok(payload)
}
