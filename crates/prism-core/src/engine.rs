//! The scoring engine: one stateless, single-pass computation per session.
//!
//! All inputs — responses, scoring key, forced-choice records, configuration
//! — are expected synchronously before the pass starts; nothing here blocks
//! or caches across invocations, so concurrent runs for different sessions
//! share no mutable state. Re-running with unchanged inputs (and the same
//! injected timestamp) produces byte-identical output.

use crate::aggregate::{aggregate, blended_strengths};
use crate::calibration::{band_of, calibrated_confidence, raw_confidence, Band};
use crate::config::ScoringConfig;
use crate::dimensions::estimate;
use crate::error::ScoreError;
use crate::fc::FcScores;
use crate::profile::{ProfilePayload, TopType};
use crate::response::{ResponseRow, ScoringKey};
use crate::typefit::{dims_highlights, score_types, seat_coherence};
use crate::validity::assess;
use crate::{blocks, overlay};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Gap below which the top-two race is reported as a close call.
const CLOSE_CALL_GAP: f64 = 0.05;

/// Everything one scoring run reads. Assembled by the caller from the
/// storage collaborators; the engine itself performs no I/O.
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub session_id: String,
    pub responses: Vec<ResponseRow>,
    pub scoring_key: ScoringKey,
    /// Functions-basis forced-choice record, if one was scored.
    pub fc_functions: Option<FcScores>,
    /// Types-basis forced-choice record, if one was scored.
    pub fc_types: Option<FcScores>,
}

/// The engine. Cheap to construct; hold one per run or share read-only.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one session into a validated profile payload.
    ///
    /// `computed_at` is injected so recomputation can be made byte-identical
    /// and so the caller's clock is the only clock. An empty session still
    /// completes — with zeroed strengths and a failing validity status —
    /// because partial assessments are expected input.
    pub fn score(
        &self,
        input: &SessionInput,
        computed_at: DateTime<Utc>,
    ) -> Result<ProfilePayload, ScoreError> {
        let cfg = &self.config;
        tracing::debug!(session_id = %input.session_id, "scoring start");

        let agg = aggregate(&input.responses, &input.scoring_key);

        let fc_functions = input
            .fc_functions
            .as_ref()
            .filter(|r| r.blocks_answered > 0);
        let fc_types = input.fc_types.as_ref().filter(|r| r.blocks_answered > 0);

        let strengths = blended_strengths(&agg, fc_functions.map(|r| &r.scores));
        let dimensions = estimate(&strengths, &cfg.dim_thresholds);

        let fit = score_types(&strengths, &dimensions, fc_types.map(|r| &r.scores), cfg);
        let top_code = fit.top_code();

        let top_types: Vec<TopType> = fit
            .ranking
            .iter()
            .take(3)
            .map(|m| TopType {
                code: m.code.as_str().to_string(),
                fit: m.norm,
                share: round4(fit.shares[&m.code]),
            })
            .collect();

        let conf_raw = round4(raw_confidence(
            fit.top_gap,
            fit.share_margin(),
            fit.share_entropy(),
            &cfg.conf_raw_params,
        ));
        let conf_calibrated = round4(calibrated_confidence(conf_raw, cfg.calibration.as_ref()));
        let confidence = if fit.tie_at_top {
            // Exact top-two tie: deterministic winner, but never confident.
            Band::Low
        } else {
            band_of(conf_calibrated, &cfg.conf_band_cuts)
        };
        let fit_band = band_of(fit.ranking[0].norm, &cfg.fit_band_cuts);

        let overlays = overlay::compute(&agg, cfg);
        let (validity_status, validity) = assess(&agg, &cfg.validity);

        let blocks_norm = blocks::blend(
            top_code,
            &agg.strengths(),
            fc_functions.map(|r| &r.scores),
            &cfg.block_blend,
        );

        let highlights = dims_highlights(top_code, &dimensions);
        let fc_answered_ct = fc_functions.map(|r| r.blocks_answered).unwrap_or(0);
        let fc_coverage_bucket = match fc_functions {
            Some(r) => r.coverage_bucket(cfg.fc_expected_min),
            None => "low",
        };

        let payload = ProfilePayload {
            results_version: cfg.results_version.clone(),
            session_id: input.session_id.clone(),
            type_code: top_code,
            base_func: top_code.base_func(),
            creative_func: top_code.creative_func(),
            confidence,
            conf_raw,
            conf_calibrated,
            fit_band,
            top_gap: fit.top_gap,
            close_call: fit.top_gap < CLOSE_CALL_GAP,
            top_types,
            strengths: round_map(&strengths),
            dimensions,
            dims_highlights: highlights,
            seat_coherence: seat_coherence(top_code, &strengths, cfg),
            fit_parts: fit.weights,
            blocks_norm,
            distance_metrics: Some(fit.ranking.clone()),
            overlay: overlays.overlay,
            overlay_neuro: overlays.overlay_neuro,
            overlay_state: overlays.overlay_state,
            neuro_mean: overlays.neuro_mean,
            neuro_z: overlays.neuro_z,
            state_index: overlays.state_index,
            validity_status,
            validity,
            fc_answered_ct,
            fc_coverage_bucket: fc_coverage_bucket.to_string(),
            scoring_version: cfg.scoring_version.clone(),
            computed_at,
        };

        payload.validate()?;
        tracing::debug!(
            session_id = %input.session_id,
            type_code = top_code.as_str(),
            confidence = payload.confidence.as_str(),
            validity = payload.validity_status.as_str(),
            "scoring complete"
        );
        Ok(payload)
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn round_map(
    strengths: &BTreeMap<crate::types::Func, f64>,
) -> BTreeMap<crate::types::Func, f64> {
    strengths
        .iter()
        .map(|(f, v)| (*f, (v * 1_000.0).round() / 1_000.0))
        .collect()
}
