//! Block composition blending: the 8 functions grouped into the four
//! behavioral blocks of the winning type's seat map, computed separately
//! from the Likert channel and the forced-choice channel, then blended into
//! one normalized composition.
//!
//! Invariant: `blended` sums to ~100 across its four keys regardless of
//! which sources were available.

use crate::config::BlockBlendWeights;
use crate::types::{prototype, BlockKind, Func, TypeCode, BLOCK_KINDS, FUNCS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const EPS: f64 = 1e-9;

/// A percentage composition over the four blocks.
pub type BlockDistribution = BTreeMap<BlockKind, f64>;

/// The reported block composition: the blended headline plus the per-source
/// distributions when their channel carried signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlocksNorm {
    pub blended: BlockDistribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likert: Option<BlockDistribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc: Option<BlockDistribution>,
}

/// Group per-function values into block means using the winning type's seat
/// map, then renormalize to a percentage composition. Returns `None` when
/// the source carries no mass.
fn block_percentages(
    code: TypeCode,
    per_func: &BTreeMap<Func, f64>,
) -> Option<BlockDistribution> {
    let proto = prototype(code);
    let mut sums: BTreeMap<BlockKind, f64> = BTreeMap::new();
    let mut counts: BTreeMap<BlockKind, u32> = BTreeMap::new();
    for f in FUNCS {
        let block = proto[&f].block();
        *sums.entry(block).or_insert(0.0) += per_func.get(&f).copied().unwrap_or(0.0);
        *counts.entry(block).or_insert(0) += 1;
    }

    let means: BTreeMap<BlockKind, f64> = BLOCK_KINDS
        .iter()
        .map(|b| (*b, sums[b] / counts[b].max(1) as f64))
        .collect();
    let total: f64 = means.values().sum();
    if total <= EPS {
        return None;
    }
    Some(
        means
            .into_iter()
            .map(|(b, v)| (b, round1(v / total * 100.0)))
            .collect(),
    )
}

/// Blend Likert- and forced-choice-derived compositions.
///
/// Both present: weighted average. One present: that source stands alone.
/// Neither: a uniform composition, so downstream consumers always see a
/// well-formed distribution.
pub fn blend(
    code: TypeCode,
    likert_strengths: &BTreeMap<Func, f64>,
    fc_functions: Option<&BTreeMap<String, f64>>,
    weights: &BlockBlendWeights,
) -> BlocksNorm {
    let likert = block_percentages(code, likert_strengths);
    let fc = fc_functions
        .map(|scores| {
            FUNCS
                .iter()
                .map(|f| (*f, scores.get(f.as_str()).copied().unwrap_or(0.0)))
                .collect::<BTreeMap<Func, f64>>()
        })
        .and_then(|per_func| block_percentages(code, &per_func));

    let blended = match (&likert, &fc) {
        (Some(l), Some(f)) => {
            let total = (weights.likert + weights.fc).max(EPS);
            BLOCK_KINDS
                .iter()
                .map(|b| {
                    let v = (weights.likert * l[b] + weights.fc * f[b]) / total;
                    (*b, round1(v))
                })
                .collect()
        }
        (Some(l), None) => l.clone(),
        (None, Some(f)) => f.clone(),
        (None, None) => BLOCK_KINDS.iter().map(|b| (*b, 25.0)).collect(),
    };

    BlocksNorm { blended, likert, fc }
}

impl BlocksNorm {
    /// Sum of the blended composition; ~100 by construction.
    pub fn blended_sum(&self) -> f64 {
        self.blended.values().sum()
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockBlendWeights;

    fn uniform_strengths(v: f64) -> BTreeMap<Func, f64> {
        FUNCS.iter().map(|f| (*f, v)).collect()
    }

    #[test]
    fn both_sources_blend_to_100() {
        let strengths = uniform_strengths(3.0);
        let fc: BTreeMap<String, f64> = FUNCS
            .iter()
            .enumerate()
            .map(|(i, f)| (f.as_str().to_string(), 20.0 + 10.0 * i as f64))
            .collect();
        let out = blend(
            TypeCode::Lie,
            &strengths,
            Some(&fc),
            &BlockBlendWeights::default(),
        );
        assert!((out.blended_sum() - 100.0).abs() <= 0.5);
        assert!(out.likert.is_some());
        assert!(out.fc.is_some());
    }

    #[test]
    fn likert_only_falls_back_cleanly() {
        let out = blend(
            TypeCode::Sei,
            &uniform_strengths(4.0),
            None,
            &BlockBlendWeights::default(),
        );
        assert!((out.blended_sum() - 100.0).abs() <= 0.5);
        assert!(out.fc.is_none());
        assert_eq!(out.likert.as_ref(), Some(&out.blended));
    }

    #[test]
    fn fc_only_falls_back_cleanly() {
        let fc: BTreeMap<String, f64> = FUNCS
            .iter()
            .map(|f| (f.as_str().to_string(), 50.0))
            .collect();
        let out = blend(
            TypeCode::Ile,
            &uniform_strengths(0.0),
            Some(&fc),
            &BlockBlendWeights::default(),
        );
        assert!((out.blended_sum() - 100.0).abs() <= 0.5);
        assert!(out.likert.is_none());
        assert!(out.fc.is_some());
    }

    #[test]
    fn no_signal_yields_uniform_composition() {
        let out = blend(
            TypeCode::Eii,
            &uniform_strengths(0.0),
            None,
            &BlockBlendWeights::default(),
        );
        assert!((out.blended_sum() - 100.0).abs() <= 0.5);
        assert!(out.blended.values().all(|v| (*v - 25.0).abs() < 1e-9));
    }

    #[test]
    fn uneven_strengths_shift_block_mass() {
        // Pump LIE's Core seats (Te base, Ni creative) above everything else.
        let mut strengths = uniform_strengths(1.0);
        strengths.insert(Func::Te, 5.0);
        strengths.insert(Func::Ni, 5.0);
        let out = blend(
            TypeCode::Lie,
            &strengths,
            None,
            &BlockBlendWeights::default(),
        );
        let core = out.blended[&BlockKind::Core];
        for b in [BlockKind::Critic, BlockKind::Hidden, BlockKind::Instinct] {
            assert!(core > out.blended[&b]);
        }
    }
}
