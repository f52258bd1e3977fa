//! Forced-choice block scoring: an independently invocable engine over the
//! block-based instrument.
//!
//! Tallies per-option weight vectors into function- or type-keyed totals and
//! normalizes per basis: `functions` anchors the largest tally at 100,
//! `types` L1-normalizes into a probability-like distribution. A session
//! with zero forced-choice responses is a legitimate outcome
//! (`blocks_answered: 0, scores: {}`), never an error — the instrument is
//! supporting evidence, not a prerequisite.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

const EPS: f64 = 1e-9;

/// Which key space option weights tally into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FcBasis {
    Functions,
    Types,
}

impl FcBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            FcBasis::Functions => "functions",
            FcBasis::Types => "types",
        }
    }
}

/// One forced-choice block. Versioned and independently togglable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcBlock {
    pub id: String,
    pub code: String,
    pub version: String,
    pub is_active: bool,
    #[serde(default)]
    pub order_index: i32,
}

/// One option inside a block, carrying its target-key weight vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcOption {
    pub id: String,
    pub block_id: String,
    pub option_code: String,
    pub weights: WeightMap,
}

/// A sanitized weight vector. Weight payloads arrive as loosely-typed JSON;
/// this wrapper is the only place that parses them, so malformed maps become
/// safe empty defaults exactly once, at the boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightMap(pub BTreeMap<String, f64>);

impl WeightMap {
    /// Lenient parse: non-object payloads and non-numeric entries are
    /// dropped with a warning rather than propagated.
    pub fn from_json(value: &Value) -> WeightMap {
        let Some(obj) = value.as_object() else {
            if !value.is_null() {
                tracing::warn!(payload = %value, "weight map is not an object; using empty map");
            }
            return WeightMap::default();
        };
        let mut map = BTreeMap::new();
        for (k, v) in obj {
            match v.as_f64().filter(|n| n.is_finite()) {
                Some(n) => {
                    map.insert(k.clone(), n);
                }
                None => {
                    tracing::warn!(key = %k, "non-numeric weight dropped");
                }
            }
        }
        WeightMap(map)
    }
}

/// One recorded choice: at most one option per block per session
/// (re-answering overwrites upstream).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcResponse {
    pub session_id: String,
    pub block_id: String,
    pub option_id: String,
}

/// Scoring request for one session, basis, and instrument version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcScoreRequest {
    pub session_id: String,
    pub basis: FcBasis,
    pub version: String,
}

/// The versioned forced-choice score record. Upsert key downstream is the
/// full `(session_id, version, basis)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcScores {
    pub session_id: String,
    pub version: String,
    pub basis: FcBasis,
    pub blocks_answered: u32,
    pub scores: BTreeMap<String, f64>,
}

impl FcScores {
    /// Coverage bucket relative to the expected block count.
    pub fn coverage_bucket(&self, expected_min: u32) -> &'static str {
        if self.blocks_answered >= expected_min {
            "full"
        } else {
            "low"
        }
    }
}

/// Score one session's forced-choice responses.
///
/// Only blocks that are active for the requested version participate.
/// Responses referencing unknown option ids (stale data after a block was
/// removed) are skipped and logged, not fatal.
pub fn score_fc_session(
    req: &FcScoreRequest,
    blocks: &[FcBlock],
    options: &[FcOption],
    responses: &[FcResponse],
) -> FcScores {
    tracing::debug!(
        session_id = %req.session_id,
        basis = req.basis.as_str(),
        version = %req.version,
        "fc scoring start"
    );

    let active_blocks: HashSet<&str> = blocks
        .iter()
        .filter(|b| b.is_active && b.version == req.version)
        .map(|b| b.id.as_str())
        .collect();
    let option_by_id: HashMap<&str, &FcOption> =
        options.iter().map(|o| (o.id.as_str(), o)).collect();

    let mut tally: BTreeMap<String, f64> = BTreeMap::new();
    let mut answered: u32 = 0;

    for resp in responses {
        if resp.session_id != req.session_id || !active_blocks.contains(resp.block_id.as_str()) {
            continue;
        }
        let Some(opt) = option_by_id.get(resp.option_id.as_str()) else {
            tracing::warn!(
                session_id = %req.session_id,
                option_id = %resp.option_id,
                "fc option not found; skipping stale response"
            );
            continue;
        };
        answered += 1;
        for (key, weight) in &opt.weights.0 {
            *tally.entry(key.clone()).or_insert(0.0) += weight;
        }
    }

    if answered == 0 {
        tracing::debug!(session_id = %req.session_id, "no fc responses");
        return FcScores {
            session_id: req.session_id.clone(),
            version: req.version.clone(),
            basis: req.basis,
            blocks_answered: 0,
            scores: BTreeMap::new(),
        };
    }

    let scores: BTreeMap<String, f64> = match req.basis {
        FcBasis::Functions => {
            // Anchor the most-endorsed key at 100, others proportional,
            // independent of how many blocks were answered.
            let max = tally.values().cloned().fold(EPS, f64::max);
            tally
                .iter()
                .map(|(k, v)| (k.clone(), round2(v / max * 100.0)))
                .collect()
        }
        FcBasis::Types => {
            let sum: f64 = tally.values().sum::<f64>().max(EPS);
            tally
                .iter()
                .map(|(k, v)| (k.clone(), round4(v / sum)))
                .collect()
        }
    };

    tracing::debug!(
        session_id = %req.session_id,
        blocks_answered = answered,
        keys = scores.len(),
        "fc scores normalized"
    );

    FcScores {
        session_id: req.session_id.clone(),
        version: req.version.clone(),
        basis: req.basis,
        blocks_answered: answered,
        scores,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
