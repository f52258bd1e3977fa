//! Validity checking: three independent signals — an inconsistency index
//! over paired items expected to agree, a social-desirability index, and
//! attention-check failures — combined into one ordered status.
//!
//! The status never blocks profile creation; it rides along as metadata so
//! consumers can discount or flag low-quality results. Scoring always
//! completes.

use crate::aggregate::AggregatedSession;
use crate::config::ValidityCuts;
use serde::{Deserialize, Serialize};

/// Overall validity verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidityStatus {
    Pass,
    Warning,
    Fail,
}

impl ValidityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidityStatus::Pass => "pass",
            ValidityStatus::Warning => "warning",
            ValidityStatus::Fail => "fail",
        }
    }
}

/// The raw validity signals attached to every profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidityReport {
    pub inconsistency_index: f64,
    pub sd_index: f64,
    pub attention_fails: u32,
}

/// Assess one aggregated session against the ordered thresholds.
pub fn assess(agg: &AggregatedSession, cuts: &ValidityCuts) -> (ValidityStatus, ValidityReport) {
    let diffs: Vec<f64> = agg
        .inc_pairs
        .values()
        .filter_map(|pair| match (pair.a, pair.b) {
            (Some(a), Some(b)) => Some((a - b).abs()),
            _ => None,
        })
        .collect();
    let inconsistency_index = if diffs.is_empty() {
        0.0
    } else {
        diffs.iter().sum::<f64>() / diffs.len() as f64
    };

    let sd_index = if agg.sd_values.is_empty() {
        0.0
    } else {
        agg.sd_values.iter().sum::<f64>() / agg.sd_values.len() as f64
    };

    let attention_fails = agg
        .attention_checks
        .iter()
        .filter(|check| match check.expected {
            Some(expected) => (check.value - expected).abs() > 0.5,
            None => false,
        })
        .count() as u32;

    let report = ValidityReport {
        inconsistency_index: round3(inconsistency_index),
        sd_index: round3(sd_index),
        attention_fails,
    };

    // Ordered: absence of signal or hard thresholds fail; softer ones warn.
    let status = if agg.is_empty() {
        ValidityStatus::Fail
    } else if inconsistency_index >= cuts.inconsistency_fail
        || attention_fails >= cuts.attention_fail_ct
    {
        ValidityStatus::Fail
    } else if inconsistency_index >= cuts.inconsistency_warn
        || sd_index >= cuts.sd_warn
        || attention_fails > 0
    {
        ValidityStatus::Warning
    } else {
        ValidityStatus::Pass
    };

    if status != ValidityStatus::Pass {
        tracing::debug!(
            status = status.as_str(),
            inconsistency = report.inconsistency_index,
            sd = report.sd_index,
            attention_fails,
            "validity flags raised"
        );
    }

    (status, report)
}

fn round3(v: f64) -> f64 {
    (v * 1_000.0).round() / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AttentionCheck, PairValues};

    fn base_session() -> AggregatedSession {
        AggregatedSession {
            answered_ct: 40,
            ..AggregatedSession::default()
        }
    }

    #[test]
    fn clean_session_passes() {
        let mut agg = base_session();
        agg.inc_pairs.insert(
            "01".into(),
            PairValues { a: Some(4.0), b: Some(4.0) },
        );
        agg.sd_values = vec![3.0];
        let (status, report) = assess(&agg, &ValidityCuts::default());
        assert_eq!(status, ValidityStatus::Pass);
        assert!((report.inconsistency_index).abs() < 1e-9);
    }

    #[test]
    fn any_attention_fail_is_at_least_warning() {
        let mut agg = base_session();
        agg.attention_checks.push(AttentionCheck { value: 2.0, expected: Some(4.0) });
        let (status, report) = assess(&agg, &ValidityCuts::default());
        assert_eq!(report.attention_fails, 1);
        assert_eq!(status, ValidityStatus::Warning);
    }

    #[test]
    fn repeated_attention_fails_escalate_to_fail() {
        let mut agg = base_session();
        for _ in 0..2 {
            agg.attention_checks.push(AttentionCheck { value: 1.0, expected: Some(5.0) });
        }
        let (status, _) = assess(&agg, &ValidityCuts::default());
        assert_eq!(status, ValidityStatus::Fail);
    }

    #[test]
    fn high_inconsistency_fails_moderate_warns() {
        let mut agg = base_session();
        agg.inc_pairs.insert("01".into(), PairValues { a: Some(1.0), b: Some(3.0) });
        let (status, report) = assess(&agg, &ValidityCuts::default());
        assert!((report.inconsistency_index - 2.0).abs() < 1e-9);
        assert_eq!(status, ValidityStatus::Fail);

        let mut agg = base_session();
        agg.inc_pairs.insert("01".into(), PairValues { a: Some(2.0), b: Some(3.2) });
        let (status, _) = assess(&agg, &ValidityCuts::default());
        assert_eq!(status, ValidityStatus::Warning);
    }

    #[test]
    fn incomplete_pairs_do_not_count() {
        let mut agg = base_session();
        agg.inc_pairs.insert("01".into(), PairValues { a: Some(1.0), b: None });
        let (status, report) = assess(&agg, &ValidityCuts::default());
        assert!((report.inconsistency_index).abs() < 1e-9);
        assert_eq!(status, ValidityStatus::Pass);
    }

    #[test]
    fn elevated_social_desirability_warns() {
        let mut agg = base_session();
        agg.sd_values = vec![4.5, 4.8];
        let (status, _) = assess(&agg, &ValidityCuts::default());
        assert_eq!(status, ValidityStatus::Warning);
    }

    #[test]
    fn empty_session_reflects_absent_signal() {
        let agg = AggregatedSession::default();
        let (status, _) = assess(&agg, &ValidityCuts::default());
        assert_eq!(status, ValidityStatus::Fail);
    }
}
