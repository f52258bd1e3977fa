//! Sled-backed store with one tree per record family. Rows are JSON-encoded
//! payloads under composite upsert keys; writes go through a
//! compare-and-swap so a racing writer is detected, re-read, and retried
//! exactly once before the conflict surfaces.

use crate::{fc_key, profile_key, FcScoreStore, ProfileStore, StoreError};
use prism_core::{FcBasis, FcScores, ProfilePayload};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const PROFILES_TREE: &str = "profiles";
const FC_SCORES_TREE: &str = "fc_scores";

pub struct SledStore {
    db: sled::Db,
    profiles: sled::Tree,
    fc_scores: sled::Tree,
}

impl SledStore {
    /// Open (or create) the store at `path`.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let profiles = db.open_tree(PROFILES_TREE)?;
        let fc_scores = db.open_tree(FC_SCORES_TREE)?;
        Ok(Self { db, profiles, fc_scores })
    }

    /// Flush buffered writes to disk. Callers that need durability before
    /// shutdown invoke this explicitly.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn fc_count(&self) -> usize {
        self.fc_scores.len()
    }

    fn upsert<T: Serialize>(tree: &sled::Tree, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(value)?;
        for attempt in 0..2 {
            let current = tree.get(key.as_bytes())?;
            let swap = tree.compare_and_swap(
                key.as_bytes(),
                current.as_ref().map(|v| &**v),
                Some(encoded.clone()),
            )?;
            match swap {
                Ok(()) => return Ok(()),
                Err(_) if attempt == 0 => {
                    tracing::warn!(key, "upsert conflict; re-reading and retrying once");
                }
                Err(_) => break,
            }
        }
        Err(StoreError::Conflict(key.to_string()))
    }

    fn get<T: DeserializeOwned>(tree: &sled::Tree, key: &str) -> Result<Option<T>, StoreError> {
        match tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl ProfileStore for SledStore {
    fn upsert_profile(&self, payload: &ProfilePayload) -> Result<(), StoreError> {
        let key = profile_key(&payload.session_id, &payload.results_version);
        Self::upsert(&self.profiles, &key, payload)
    }

    fn get_profile(
        &self,
        session_id: &str,
        results_version: &str,
    ) -> Result<Option<ProfilePayload>, StoreError> {
        Self::get(&self.profiles, &profile_key(session_id, results_version))
    }
}

impl FcScoreStore for SledStore {
    fn upsert_fc_scores(&self, record: &FcScores) -> Result<(), StoreError> {
        let key = fc_key(&record.session_id, &record.version, record.basis);
        Self::upsert(&self.fc_scores, &key, record)
    }

    fn get_fc_scores(
        &self,
        session_id: &str,
        version: &str,
        basis: FcBasis,
    ) -> Result<Option<FcScores>, StoreError> {
        Self::get(&self.fc_scores, &fc_key(session_id, version, basis))
    }
}
