//! Concurrent in-memory store. The default collaborator for tests and for
//! orchestrators that persist elsewhere; every map entry is one current row
//! per upsert key, exactly like the durable implementation.

use crate::{fc_key, profile_key, FcScoreStore, ProfileStore, StoreError};
use dashmap::DashMap;
use prism_core::{FcBasis, FcScores, ProfilePayload};

#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: DashMap<String, ProfilePayload>,
    fc_scores: DashMap<String, FcScores>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current profile row count (one per upsert key).
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    /// Current forced-choice row count (one per upsert key).
    pub fn fc_count(&self) -> usize {
        self.fc_scores.len()
    }
}

impl ProfileStore for MemoryStore {
    fn upsert_profile(&self, payload: &ProfilePayload) -> Result<(), StoreError> {
        let key = profile_key(&payload.session_id, &payload.results_version);
        self.profiles.insert(key, payload.clone());
        Ok(())
    }

    fn get_profile(
        &self,
        session_id: &str,
        results_version: &str,
    ) -> Result<Option<ProfilePayload>, StoreError> {
        Ok(self
            .profiles
            .get(&profile_key(session_id, results_version))
            .map(|r| r.value().clone()))
    }
}

impl FcScoreStore for MemoryStore {
    fn upsert_fc_scores(&self, record: &FcScores) -> Result<(), StoreError> {
        let key = fc_key(&record.session_id, &record.version, record.basis);
        self.fc_scores.insert(key, record.clone());
        Ok(())
    }

    fn get_fc_scores(
        &self,
        session_id: &str,
        version: &str,
        basis: FcBasis,
    ) -> Result<Option<FcScores>, StoreError> {
        Ok(self
            .fc_scores
            .get(&fc_key(session_id, version, basis))
            .map(|r| r.value().clone()))
    }
}
