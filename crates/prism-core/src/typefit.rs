//! Type-fit distance engine: scores all 16 candidate types against the
//! respondent's strength vector, dimensionality map, and (when present) the
//! types-basis forced-choice distribution.
//!
//! Per candidate: Euclidean distance to the canonical seat-expectation
//! vector, inverse-transformed into [0,1], blended with an ego-coherence
//! term and the forced-choice share, minus an opposition penalty. The blend
//! weights are named quantities persisted alongside every result.

use crate::config::{FitWeights, ScoringConfig};
use crate::types::{prototype, Func, Seat, TypeCode, FUNCS, TYPE_CODES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-candidate diagnostics, reported for all 16 types.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceMetric {
    pub code: TypeCode,
    /// Blended fit before clamping.
    pub raw: f64,
    /// Euclidean distance to the canonical vector.
    pub dist: f64,
    /// Clamped [0,1] fit used for ranking.
    pub norm: f64,
}

/// Ego-seat dimensionality highlights for the winning candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimsHighlights {
    /// Functions whose ego seats carry 3D/4D dimensionality.
    pub coherent_dims: Vec<Func>,
    /// Functions at 3D/4D outside the ego seats.
    pub unique_dims: Vec<Func>,
}

/// Full outcome of the distance engine for one session.
#[derive(Debug, Clone)]
pub struct TypeFitOutcome {
    /// All 16 candidates ranked descending by `norm` (ties lexicographic).
    pub ranking: Vec<DistanceMetric>,
    /// Softmax shares over the raw fits.
    pub shares: BTreeMap<TypeCode, f64>,
    /// `norm[0] - norm[1]`, always >= 0.
    pub top_gap: f64,
    /// Exact tie at the top; confidence must be forced Low.
    pub tie_at_top: bool,
    /// The weights this run blended with.
    pub weights: FitWeights,
}

impl TypeFitOutcome {
    pub fn top_code(&self) -> TypeCode {
        self.ranking[0].code
    }

    /// Share margin between the two leading candidates.
    pub fn share_margin(&self) -> f64 {
        let first = self.shares[&self.ranking[0].code];
        let second = self.shares[&self.ranking[1].code];
        (first - second).max(0.0)
    }

    /// Shannon entropy (log2) of the share distribution; feeds the raw
    /// confidence sigmoid.
    pub fn share_entropy(&self) -> f64 {
        -self
            .shares
            .values()
            .filter(|p| **p > 0.0)
            .map(|p| p * p.log2())
            .sum::<f64>()
    }
}

/// Score all 16 candidates.
pub fn score_types(
    strengths: &BTreeMap<Func, f64>,
    dims: &BTreeMap<Func, u8>,
    fc_types: Option<&BTreeMap<String, f64>>,
    cfg: &ScoringConfig,
) -> TypeFitOutcome {
    let weights = cfg.effective_fit_weights(fc_types.is_some_and(|m| !m.is_empty()));

    let mut raw_by_code: BTreeMap<TypeCode, f64> = BTreeMap::new();
    let mut metrics: Vec<DistanceMetric> = Vec::with_capacity(16);

    for code in TYPE_CODES {
        let proto = prototype(code);

        let mut sq_sum = 0.0;
        for f in FUNCS {
            let expected = cfg.seat_expectations.expected(proto[&f]);
            let diff = strengths.get(&f).copied().unwrap_or(0.0) - expected;
            sq_sum += diff * diff;
        }
        let dist = sq_sum.sqrt();
        let transform = 1.0 / (1.0 + dist);

        let ego_coherence = seat_fraction(proto, dims, Seat::is_ego, |d| d >= 3);
        let opposition = seat_strength_fraction(proto, strengths, cfg.opposition_cut);
        let fc_share = fc_types
            .and_then(|m| m.get(code.as_str()))
            .copied()
            .unwrap_or(0.0);

        let raw = weights.strengths_weight * transform
            + weights.dims_weight * ego_coherence
            + weights.fc_weight * fc_share
            - weights.penalty_opp * opposition;
        let norm = raw.clamp(0.0, 1.0);

        raw_by_code.insert(code, raw);
        metrics.push(DistanceMetric {
            code,
            raw: round3(raw),
            dist: round3(dist),
            norm: round4(norm),
        });
    }

    metrics.sort_by(|a, b| {
        b.norm
            .partial_cmp(&a.norm)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.code.as_str().cmp(b.code.as_str()))
    });

    let shares = softmax(&raw_by_code, cfg.softmax_temp);
    let top_gap = (metrics[0].norm - metrics[1].norm).max(0.0);
    let tie_at_top = metrics[0].norm == metrics[1].norm;

    tracing::debug!(
        top = metrics[0].code.as_str(),
        top_gap,
        tie_at_top,
        "type fit ranked"
    );

    TypeFitOutcome {
        ranking: metrics,
        shares,
        top_gap: round4(top_gap),
        tie_at_top,
        weights,
    }
}

/// Fraction of functions, among those whose seat matches `seat_filter`,
/// that satisfy the dimensionality predicate.
fn seat_fraction(
    proto: &BTreeMap<Func, Seat>,
    dims: &BTreeMap<Func, u8>,
    seat_filter: fn(&Seat) -> bool,
    pred: fn(u8) -> bool,
) -> f64 {
    let seats: Vec<Func> = proto
        .iter()
        .filter(|(_, s)| seat_filter(s))
        .map(|(f, _)| *f)
        .collect();
    if seats.is_empty() {
        return 0.0;
    }
    let hits = seats
        .iter()
        .filter(|f| pred(dims.get(f).copied().unwrap_or(1)))
        .count();
    hits as f64 / seats.len() as f64
}

/// Fraction of opposition-seat functions expressed above the opposition cut.
fn seat_strength_fraction(
    proto: &BTreeMap<Func, Seat>,
    strengths: &BTreeMap<Func, f64>,
    cut: f64,
) -> f64 {
    let seats: Vec<Func> = proto
        .iter()
        .filter(|(_, s)| s.is_opposition())
        .map(|(f, _)| *f)
        .collect();
    if seats.is_empty() {
        return 0.0;
    }
    let hits = seats
        .iter()
        .filter(|f| strengths.get(f).copied().unwrap_or(0.0) >= cut)
        .count();
    hits as f64 / seats.len() as f64
}

/// Max-subtracted temperature softmax over the raw fits.
fn softmax(raw: &BTreeMap<TypeCode, f64>, temp: f64) -> BTreeMap<TypeCode, f64> {
    let temp = if temp > 0.0 { temp } else { 1.0 };
    let max = raw.values().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: BTreeMap<TypeCode, f64> = raw
        .iter()
        .map(|(c, v)| (*c, ((v - max) / temp).exp()))
        .collect();
    let sum: f64 = exps.values().sum();
    exps.into_iter().map(|(c, e)| (c, e / sum)).collect()
}

/// How well the observed strengths align with the winner's expected seat
/// profile: fraction of functions within the alignment window.
pub fn seat_coherence(
    code: TypeCode,
    strengths: &BTreeMap<Func, f64>,
    cfg: &ScoringConfig,
) -> f64 {
    const ALIGN_WINDOW: f64 = 0.75;
    let proto = prototype(code);
    let aligned = FUNCS
        .iter()
        .filter(|f| {
            let expected = cfg.seat_expectations.expected(proto[f]);
            (strengths.get(f).copied().unwrap_or(0.0) - expected).abs() <= ALIGN_WINDOW
        })
        .count();
    round3(aligned as f64 / FUNCS.len() as f64)
}

/// Dimensionality highlights relative to the winner's seat map.
pub fn dims_highlights(code: TypeCode, dims: &BTreeMap<Func, u8>) -> DimsHighlights {
    let proto = prototype(code);
    let mut coherent = Vec::new();
    let mut unique = Vec::new();
    for f in FUNCS {
        let d = dims.get(&f).copied().unwrap_or(1);
        if d < 3 {
            continue;
        }
        if proto[&f].is_ego() {
            coherent.push(f);
        } else {
            unique.push(f);
        }
    }
    DimsHighlights {
        coherent_dims: coherent,
        unique_dims: unique,
    }
}

fn round3(v: f64) -> f64 {
    (v * 1_000.0).round() / 1_000.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strengths_for(code: TypeCode, cfg: &ScoringConfig) -> BTreeMap<Func, f64> {
        // A respondent matching the candidate's canonical vector exactly.
        let proto = prototype(code);
        FUNCS
            .iter()
            .map(|f| (*f, cfg.seat_expectations.expected(proto[f])))
            .collect()
    }

    fn high_dims() -> BTreeMap<Func, u8> {
        FUNCS.iter().map(|f| (*f, 4)).collect()
    }

    #[test]
    fn canonical_respondent_wins_their_type() {
        let cfg = ScoringConfig::default();
        for code in [TypeCode::Lie, TypeCode::Sei, TypeCode::Iee] {
            let out = score_types(&strengths_for(code, &cfg), &high_dims(), None, &cfg);
            assert_eq!(out.top_code(), code, "expected {code} to rank first");
            assert!(out.ranking[0].dist < out.ranking[15].dist);
        }
    }

    #[test]
    fn ranking_covers_all_sixteen_and_gap_nonnegative() {
        let cfg = ScoringConfig::default();
        let out = score_types(&strengths_for(TypeCode::Lii, &cfg), &high_dims(), None, &cfg);
        assert_eq!(out.ranking.len(), 16);
        assert!(out.top_gap >= 0.0);
        let mut codes: Vec<&str> = out.ranking.iter().map(|m| m.code.as_str()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 16);
    }

    #[test]
    fn flat_profile_ties_break_lexicographically() {
        let cfg = ScoringConfig::default();
        let flat: BTreeMap<Func, f64> = FUNCS.iter().map(|f| (*f, 3.0)).collect();
        let dims: BTreeMap<Func, u8> = FUNCS.iter().map(|f| (*f, 2)).collect();
        let a = score_types(&flat, &dims, None, &cfg);
        let b = score_types(&flat, &dims, None, &cfg);
        assert_eq!(a.top_code(), b.top_code());
        if a.tie_at_top {
            // lexicographically first among the tied leaders
            let tied_norm = a.ranking[0].norm;
            let first = a
                .ranking
                .iter()
                .filter(|m| m.norm == tied_norm)
                .map(|m| m.code.as_str())
                .min()
                .unwrap();
            assert_eq!(a.top_code().as_str(), first);
        }
    }

    #[test]
    fn shares_are_a_distribution() {
        let cfg = ScoringConfig::default();
        let out = score_types(&strengths_for(TypeCode::Ese, &cfg), &high_dims(), None, &cfg);
        let sum: f64 = out.shares.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(out.share_entropy() >= 0.0);
        assert!(out.share_margin() >= 0.0);
    }

    #[test]
    fn fc_distribution_boosts_its_candidate() {
        let cfg = ScoringConfig::default();
        let flat: BTreeMap<Func, f64> = FUNCS.iter().map(|f| (*f, 3.0)).collect();
        let dims: BTreeMap<Func, u8> = FUNCS.iter().map(|f| (*f, 2)).collect();
        let fc = BTreeMap::from([("SLE".to_string(), 0.9)]);
        let out = score_types(&flat, &dims, Some(&fc), &cfg);
        assert_eq!(out.top_code(), TypeCode::Sle);
        assert!(out.weights.fc_weight > 0.0);
    }

    #[test]
    fn opposition_expression_penalizes_fit() {
        let cfg = ScoringConfig::default();
        let mut strengths = strengths_for(TypeCode::Lie, &cfg);
        let base = score_types(&strengths, &high_dims(), None, &cfg);
        let base_raw = base.ranking.iter().find(|m| m.code == TypeCode::Lie).unwrap().raw;
        // LIE's vulnerable seat holds Fi; over-expressing it must cost fit.
        strengths.insert(Func::Fi, 4.8);
        let bumped = score_types(&strengths, &high_dims(), None, &cfg);
        let bumped_raw = bumped
            .ranking
            .iter()
            .find(|m| m.code == TypeCode::Lie)
            .unwrap()
            .raw;
        assert!(bumped_raw < base_raw);
    }

    #[test]
    fn highlights_split_by_ego_seats() {
        let mut dims: BTreeMap<Func, u8> = FUNCS.iter().map(|f| (*f, 1)).collect();
        dims.insert(Func::Te, 4); // LIE base
        dims.insert(Func::Se, 3); // LIE role
        let h = dims_highlights(TypeCode::Lie, &dims);
        assert_eq!(h.coherent_dims, vec![Func::Te]);
        assert_eq!(h.unique_dims, vec![Func::Se]);
    }

    #[test]
    fn seat_coherence_is_unit_interval_and_peaks_on_match() {
        let cfg = ScoringConfig::default();
        let exact = seat_coherence(TypeCode::Lie, &strengths_for(TypeCode::Lie, &cfg), &cfg);
        assert!((exact - 1.0).abs() < 1e-9);
        let flat: BTreeMap<Func, f64> = FUNCS.iter().map(|f| (*f, 0.0)).collect();
        let none = seat_coherence(TypeCode::Lie, &flat, &cfg);
        assert!((0.0..=1.0).contains(&none));
        assert!(none < exact);
    }
}
