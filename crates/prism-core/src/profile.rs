//! The versioned profile payload — the engine's sole externally visible
//! output — plus its self-validation and the boundary normalization for
//! legacy `top_types` shapes.
//!
//! Exactly one current payload exists per `(session_id, results_version)`;
//! recomputation overwrites rather than appends. A payload that fails
//! self-validation is never handed to persistence.

use crate::blocks::BlocksNorm;
use crate::calibration::Band;
use crate::config::FitWeights;
use crate::error::ScoreError;
use crate::overlay::OverlaySign;
use crate::typefit::{DimsHighlights, DistanceMetric};
use crate::types::{Func, TypeCode, FUNCS};
use crate::validity::{ValidityReport, ValidityStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One ranked candidate in `top_types`. Always the structured object shape;
/// legacy bare-code strings are normalized at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopType {
    pub code: String,
    pub fit: f64,
    pub share: f64,
}

/// Normalize a stored `top_types` array that may carry bare code strings
/// (legacy rows) or structured objects. Missing numeric fields default to 0
/// rather than failing; unknown shapes get placeholder codes. Core logic
/// only ever sees the canonical form.
pub fn normalize_top_types(stored: &[Value]) -> Vec<TopType> {
    stored
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(code) => TopType {
                code: code.clone(),
                fit: 0.0,
                share: 0.0,
            },
            Value::Object(obj) => TopType {
                code: obj
                    .get("code")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Unknown{index}")),
                fit: obj.get("fit").and_then(Value::as_f64).unwrap_or(0.0),
                share: obj.get("share").and_then(Value::as_f64).unwrap_or(0.0),
            },
            _ => TopType {
                code: format!("Unknown{index}"),
                fit: 0.0,
                share: 0.0,
            },
        })
        .collect()
}

/// The assembled, versioned scoring result for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePayload {
    pub results_version: String,
    pub session_id: String,
    pub type_code: TypeCode,
    pub base_func: Func,
    pub creative_func: Func,
    pub confidence: Band,
    pub conf_raw: f64,
    pub conf_calibrated: f64,
    pub fit_band: Band,
    pub top_gap: f64,
    pub close_call: bool,
    pub top_types: Vec<TopType>,
    pub strengths: BTreeMap<Func, f64>,
    pub dimensions: BTreeMap<Func, u8>,
    pub dims_highlights: DimsHighlights,
    pub seat_coherence: f64,
    pub fit_parts: FitWeights,
    pub blocks_norm: BlocksNorm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_metrics: Option<Vec<DistanceMetric>>,
    pub overlay: OverlaySign,
    pub overlay_neuro: OverlaySign,
    pub overlay_state: OverlaySign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neuro_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neuro_z: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_index: Option<f64>,
    pub validity_status: ValidityStatus,
    pub validity: ValidityReport,
    pub fc_answered_ct: u32,
    pub fc_coverage_bucket: String,
    pub scoring_version: String,
    pub computed_at: DateTime<Utc>,
}

impl ProfilePayload {
    /// Self-validation before persistence: required fields, numeric ranges,
    /// and internal consistency. Failing here is fatal for the run — no
    /// partially-populated row ever reaches a consumer.
    pub fn validate(&self) -> Result<(), ScoreError> {
        let fail = |msg: String| Err(ScoreError::SchemaViolation(msg));

        if self.session_id.is_empty() {
            return fail("session_id is empty".into());
        }
        if self.results_version.is_empty() || self.scoring_version.is_empty() {
            return fail("version fields must be non-empty".into());
        }
        if !(0.0..=1.0).contains(&self.conf_raw) {
            return fail(format!("conf_raw {} outside [0,1]", self.conf_raw));
        }
        if !(0.0..=1.0).contains(&self.conf_calibrated) {
            return fail(format!("conf_calibrated {} outside [0,1]", self.conf_calibrated));
        }
        if self.top_gap < 0.0 {
            return fail(format!("top_gap {} negative", self.top_gap));
        }
        if !(0.0..=1.0).contains(&self.seat_coherence) {
            return fail(format!("seat_coherence {} outside [0,1]", self.seat_coherence));
        }
        if self.top_types.is_empty() {
            return fail("top_types is empty".into());
        }
        for f in FUNCS {
            if !self.strengths.contains_key(&f) {
                return fail(format!("strengths missing {f}"));
            }
            match self.dimensions.get(&f) {
                Some(d) if (1..=4).contains(d) => {}
                Some(d) => return fail(format!("dimension {d} for {f} outside 1..=4")),
                None => return fail(format!("dimensions missing {f}")),
            }
        }
        let blended_sum = self.blocks_norm.blended_sum();
        if (blended_sum - 100.0).abs() > 0.5 {
            return fail(format!("blended blocks sum {blended_sum} not ~100"));
        }
        if let Some(metrics) = &self.distance_metrics {
            if metrics.len() != 16 {
                return fail(format!("distance_metrics has {} entries, want 16", metrics.len()));
            }
            if metrics[0].code != self.type_code {
                return fail(format!(
                    "type_code {} disagrees with top distance metric {}",
                    self.type_code, metrics[0].code
                ));
            }
        }
        if self.top_types[0].code != self.type_code.as_str() {
            return fail(format!(
                "type_code {} disagrees with top_types[0] {}",
                self.type_code, self.top_types[0].code
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_bare_codes_normalize_with_zero_defaults() {
        let stored = vec![json!("LIE"), json!({"code": "ILI", "fit": 0.8, "share": 0.3})];
        let normalized = normalize_top_types(&stored);
        assert_eq!(
            normalized[0],
            TopType { code: "LIE".into(), fit: 0.0, share: 0.0 }
        );
        assert_eq!(normalized[1].code, "ILI");
        assert!((normalized[1].fit - 0.8).abs() < 1e-9);
    }

    #[test]
    fn unknown_shapes_get_placeholders_not_errors() {
        let stored = vec![json!(42), json!({"fit": 0.5})];
        let normalized = normalize_top_types(&stored);
        assert_eq!(normalized[0].code, "Unknown0");
        assert_eq!(normalized[1].code, "Unknown1");
        assert!((normalized[1].fit - 0.5).abs() < 1e-9);
    }
}
