//! Scoring configuration: every tunable knob of the engine, with the shipped
//! production defaults as fallback values.
//!
//! Configuration is loaded fresh per scoring run — weights and thresholds can
//! change between result versions, so nothing here is cached across
//! invocations. A deployment overrides individual fields through a TOML file
//! (`ScoringConfig::load`); omitted fields keep their defaults.

use crate::calibration::CalibrationCurve;
use crate::error::ScoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ascending cut points mapping a function strength to a 1D–4D band.
/// Versioned alongside the type-fit model: they feed coherence scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DimThresholds {
    pub one: f64,
    pub two: f64,
    pub three: f64,
}

impl Default for DimThresholds {
    fn default() -> Self {
        Self { one: 2.1, two: 3.0, three: 3.8 }
    }
}

/// Population norms for a z-scored overlay channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationNorms {
    pub mean: f64,
    pub sd: f64,
}

impl Default for PopulationNorms {
    fn default() -> Self {
        Self { mean: 3.0, sd: 0.8 }
    }
}

/// Per-channel weights for the state overlay index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StateWeights {
    pub stress: f64,
    pub time: f64,
    pub sleep: f64,
    pub focus: f64,
}

impl Default for StateWeights {
    fn default() -> Self {
        Self { stress: 1.0, time: 1.0, sleep: 1.0, focus: 1.0 }
    }
}

/// Overlay banding: `+` at z >= cut, `-` at z <= -cut, `0` between.
/// `state_blend` weights the state z into the headline overlay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayParams {
    pub cut: f64,
    pub state_blend: f64,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self { cut: 0.5, state_blend: 0.3 }
    }
}

/// Raw-confidence sigmoid parameters: sigma(a*gap + b*margin - c*entropy).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfRawParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Default for ConfRawParams {
    fn default() -> Self {
        Self { a: 0.25, b: 0.35, c: 0.20 }
    }
}

/// Cuts for a High/Moderate/Low discretization over a [0,1] value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BandCuts {
    pub high: f64,
    pub moderate: f64,
}

impl Default for BandCuts {
    fn default() -> Self {
        Self { high: 0.75, moderate: 0.55 }
    }
}

/// Named blend weights of the type-fit score. Persisted verbatim into every
/// profile (`fit_parts`) so the computation stays auditable after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitWeights {
    pub strengths_weight: f64,
    pub dims_weight: f64,
    pub fc_weight: f64,
    pub penalty_opp: f64,
}

impl Default for FitWeights {
    fn default() -> Self {
        Self {
            strengths_weight: 0.7,
            dims_weight: 0.2,
            fc_weight: 0.1,
            penalty_opp: 0.05,
        }
    }
}

/// Expected strength (common 1–5 scale) for each seat of a prototype. The
/// canonical 8-dimensional vector for a candidate type is read off this
/// table through its seat map.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SeatExpectations {
    pub base: f64,
    pub creative: f64,
    pub role: f64,
    pub vulnerable: f64,
    pub mobilizing: f64,
    pub suggestive: f64,
    pub ignoring: f64,
    pub demonstrative: f64,
}

impl Default for SeatExpectations {
    fn default() -> Self {
        Self {
            base: 4.5,
            creative: 4.0,
            role: 2.5,
            vulnerable: 1.5,
            mobilizing: 3.0,
            suggestive: 2.5,
            ignoring: 2.0,
            demonstrative: 3.5,
        }
    }
}

impl SeatExpectations {
    pub fn expected(&self, seat: crate::types::Seat) -> f64 {
        use crate::types::Seat::*;
        match seat {
            Base => self.base,
            Creative => self.creative,
            Role => self.role,
            Vulnerable => self.vulnerable,
            Mobilizing => self.mobilizing,
            Suggestive => self.suggestive,
            Ignoring => self.ignoring,
            Demonstrative => self.demonstrative,
        }
    }
}

/// Weights for blending the Likert- and forced-choice-derived block
/// compositions when both sources are present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockBlendWeights {
    pub likert: f64,
    pub fc: f64,
}

impl Default for BlockBlendWeights {
    fn default() -> Self {
        Self { likert: 0.7, fc: 0.3 }
    }
}

/// Ordered thresholds mapping validity signals to pass/warning/fail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidityCuts {
    pub inconsistency_warn: f64,
    pub inconsistency_fail: f64,
    pub sd_warn: f64,
    pub attention_fail_ct: u32,
}

impl Default for ValidityCuts {
    fn default() -> Self {
        Self {
            inconsistency_warn: 1.0,
            inconsistency_fail: 1.5,
            sd_warn: 4.2,
            attention_fail_ct: 2,
        }
    }
}

/// Full engine configuration. Every field carries a shipped default; a TOML
/// override file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Version stamped onto every profile and forced-choice record.
    pub results_version: String,
    /// Version of the scoring logic itself (engine revision).
    pub scoring_version: String,
    /// Forced-choice blocks expected for full coverage.
    pub fc_expected_min: u32,
    /// Temperature of the softmax producing type shares.
    pub softmax_temp: f64,
    /// Strength above which an opposition-seat function counts against a
    /// candidate.
    pub opposition_cut: f64,
    pub dim_thresholds: DimThresholds,
    pub neuro_norms: PopulationNorms,
    pub state_norms: PopulationNorms,
    pub state_weights: StateWeights,
    pub overlay: OverlayParams,
    pub conf_raw_params: ConfRawParams,
    pub conf_band_cuts: BandCuts,
    pub fit_band_cuts: BandCuts,
    pub fit_weights: FitWeights,
    pub seat_expectations: SeatExpectations,
    pub block_blend: BlockBlendWeights,
    pub validity: ValidityCuts,
    /// Version-pinned calibration curve. `None` falls back to Platt scaling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationCurve>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            results_version: "v1.2.1".to_string(),
            scoring_version: "v1.2.1".to_string(),
            fc_expected_min: 16,
            softmax_temp: 1.0,
            opposition_cut: 4.0,
            dim_thresholds: DimThresholds::default(),
            neuro_norms: PopulationNorms::default(),
            state_norms: PopulationNorms::default(),
            state_weights: StateWeights::default(),
            overlay: OverlayParams::default(),
            conf_raw_params: ConfRawParams::default(),
            conf_band_cuts: BandCuts::default(),
            fit_band_cuts: BandCuts { high: 0.75, moderate: 0.55 },
            fit_weights: FitWeights::default(),
            seat_expectations: SeatExpectations::default(),
            block_blend: BlockBlendWeights::default(),
            validity: ValidityCuts::default(),
            calibration: None,
        }
    }
}

impl ScoringConfig {
    /// Load from a TOML file, falling back to defaults for omitted keys.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScoreError> {
        let built = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()
            .map_err(|e| ScoreError::Config(e.to_string()))?;
        built
            .try_deserialize()
            .map_err(|e| ScoreError::Config(e.to_string()))
    }

    /// Render the effective configuration as TOML, for config audits and for
    /// seeding a deployment's override file.
    pub fn to_toml_string(&self) -> Result<String, ScoreError> {
        toml::to_string_pretty(self).map_err(|e| ScoreError::Config(e.to_string()))
    }

    /// Effective fit weights for a run: the forced-choice term drops to zero
    /// when no forced-choice signal exists so absent data never dilutes the
    /// blend silently.
    pub fn effective_fit_weights(&self, has_fc: bool) -> FitWeights {
        let mut w = self.fit_weights;
        if !has_fc {
            w.fc_weight = 0.0;
        }
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_shipped_model() {
        let cfg = ScoringConfig::default();
        assert_eq!(cfg.results_version, "v1.2.1");
        assert_eq!(cfg.fc_expected_min, 16);
        assert!((cfg.dim_thresholds.two - 3.0).abs() < f64::EPSILON);
        assert!((cfg.conf_raw_params.b - 0.35).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_toml_overrides_keep_defaults_elsewhere() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "results_version = \"v9.9\"\n[dim_thresholds]\none = 1.8").unwrap();
        let cfg = ScoringConfig::load(file.path()).unwrap();
        assert_eq!(cfg.results_version, "v9.9");
        assert!((cfg.dim_thresholds.one - 1.8).abs() < f64::EPSILON);
        // untouched keys fall back
        assert!((cfg.dim_thresholds.three - 3.8).abs() < f64::EPSILON);
        assert_eq!(cfg.fc_expected_min, 16);
    }

    #[test]
    fn toml_export_round_trips() {
        let cfg = ScoringConfig::default();
        let rendered = cfg.to_toml_string().unwrap();
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(rendered.as_bytes()).unwrap();
        let reloaded = ScoringConfig::load(file.path()).unwrap();
        assert_eq!(reloaded.results_version, cfg.results_version);
        assert!((reloaded.fit_weights.strengths_weight - cfg.fit_weights.strengths_weight).abs() < 1e-9);
        assert!((reloaded.seat_expectations.base - cfg.seat_expectations.base).abs() < 1e-9);
    }

    #[test]
    fn fc_weight_zeroes_without_signal() {
        let cfg = ScoringConfig::default();
        assert!((cfg.effective_fit_weights(false).fc_weight).abs() < f64::EPSILON);
        assert!(cfg.effective_fit_weights(true).fc_weight > 0.0);
    }
}
