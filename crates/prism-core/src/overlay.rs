//! Overlay/state module: two independent signed overlays computed side by
//! side — a neuroticism-like channel and a current-state channel — each
//! z-scored against its own stored population norms. They use different item
//! sets and different norm tables and are not guaranteed to agree.

use crate::aggregate::AggregatedSession;
use crate::config::ScoringConfig;
use crate::response::StateChannel;
use serde::{Deserialize, Serialize};

/// Signed overlay band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverlaySign {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "0")]
    #[default]
    Zero,
}

impl OverlaySign {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlaySign::Plus => "+",
            OverlaySign::Minus => "-",
            OverlaySign::Zero => "0",
        }
    }
}

/// Both overlay channels plus the blended headline overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayOutcome {
    /// Headline overlay: neuro z blended with the state z.
    pub overlay: OverlaySign,
    pub overlay_neuro: OverlaySign,
    pub overlay_state: OverlaySign,
    pub neuro_mean: Option<f64>,
    pub neuro_z: Option<f64>,
    pub state_index: Option<f64>,
}

/// Compute both overlay channels from the session's meta items.
pub fn compute(agg: &AggregatedSession, cfg: &ScoringConfig) -> OverlayOutcome {
    let cut = cfg.overlay.cut;

    let neuro = channel_stats(&agg.neuro_values, cfg.neuro_norms.mean, cfg.neuro_norms.sd);
    let state_index = state_index(agg, cfg);
    let state_z = state_index
        .map(|idx| z_score(idx, cfg.state_norms.mean, cfg.state_norms.sd));

    let overlay_neuro = neuro.map(|(_, z)| band(z, cut)).unwrap_or_default();
    let overlay_state = state_z.map(|z| band(z, cut)).unwrap_or_default();

    // Headline channel: neuro carries the signal, state shades it.
    let combined = match (neuro, state_z) {
        (Some((_, nz)), Some(sz)) => Some(nz + cfg.overlay.state_blend * sz),
        (Some((_, nz)), None) => Some(nz),
        (None, Some(sz)) => Some(cfg.overlay.state_blend * sz),
        (None, None) => None,
    };
    let overlay = combined.map(|z| band(z, cut)).unwrap_or_default();

    OverlayOutcome {
        overlay,
        overlay_neuro,
        overlay_state,
        neuro_mean: neuro.map(|(m, _)| round3(m)),
        neuro_z: neuro.map(|(_, z)| round3(z)),
        state_index: state_index.map(round3),
    }
}

fn channel_stats(values: &[f64], mean: f64, sd: f64) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    Some((m, z_score(m, mean, sd)))
}

/// Weighted mean of the answered state channels. Missing channels simply
/// drop out of the weighting.
fn state_index(agg: &AggregatedSession, cfg: &ScoringConfig) -> Option<f64> {
    let w = &cfg.state_weights;
    let channel_weight = |c: StateChannel| match c {
        StateChannel::Stress => w.stress,
        StateChannel::Time => w.time,
        StateChannel::Sleep => w.sleep,
        StateChannel::Focus => w.focus,
    };

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for (channel, values) in &agg.state_values {
        if values.is_empty() {
            continue;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let weight = channel_weight(*channel);
        weighted += weight * mean;
        total_weight += weight;
    }
    (total_weight > 0.0).then(|| weighted / total_weight)
}

fn z_score(value: f64, mean: f64, sd: f64) -> f64 {
    let sd = if sd.abs() < f64::EPSILON { 1.0 } else { sd };
    (value - mean) / sd
}

fn band(z: f64, cut: f64) -> OverlaySign {
    if z >= cut {
        OverlaySign::Plus
    } else if z <= -cut {
        OverlaySign::Minus
    } else {
        OverlaySign::Zero
    }
}

fn round3(v: f64) -> f64 {
    (v * 1_000.0).round() / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn session_with(neuro: Vec<f64>, state: Vec<(StateChannel, Vec<f64>)>) -> AggregatedSession {
        AggregatedSession {
            neuro_values: neuro,
            state_values: state.into_iter().collect::<BTreeMap<_, _>>(),
            ..AggregatedSession::default()
        }
    }

    #[test]
    fn elevated_neuro_bands_plus() {
        let cfg = ScoringConfig::default();
        let out = compute(&session_with(vec![4.5, 4.0, 4.5], vec![]), &cfg);
        assert_eq!(out.overlay_neuro, OverlaySign::Plus);
        assert!(out.neuro_z.unwrap() > 0.0);
        assert_eq!(out.overlay_state, OverlaySign::Zero); // no state items
    }

    #[test]
    fn suppressed_neuro_bands_minus() {
        let cfg = ScoringConfig::default();
        let out = compute(&session_with(vec![1.5, 2.0], vec![]), &cfg);
        assert_eq!(out.overlay_neuro, OverlaySign::Minus);
    }

    #[test]
    fn channels_can_disagree() {
        let cfg = ScoringConfig::default();
        let out = compute(
            &session_with(
                vec![4.8, 4.6],
                vec![(StateChannel::Stress, vec![1.0]), (StateChannel::Sleep, vec![1.5])],
            ),
            &cfg,
        );
        assert_eq!(out.overlay_neuro, OverlaySign::Plus);
        assert_eq!(out.overlay_state, OverlaySign::Minus);
    }

    #[test]
    fn no_meta_items_yields_neutral_overlay() {
        let cfg = ScoringConfig::default();
        let out = compute(&session_with(vec![], vec![]), &cfg);
        assert_eq!(out.overlay, OverlaySign::Zero);
        assert!(out.neuro_mean.is_none());
        assert!(out.state_index.is_none());
    }

    #[test]
    fn state_weights_shape_the_index() {
        let mut cfg = ScoringConfig::default();
        cfg.state_weights.stress = 3.0;
        cfg.state_weights.sleep = 1.0;
        let out = compute(
            &session_with(
                vec![],
                vec![(StateChannel::Stress, vec![5.0]), (StateChannel::Sleep, vec![1.0])],
            ),
            &cfg,
        );
        // (3*5 + 1*1) / 4 = 4.0
        assert!((out.state_index.unwrap() - 4.0).abs() < 1e-9);
    }
}
