//! Response aggregation: raw rows in, per-function strength sums and routed
//! meta buckets out.
//!
//! Function items accumulate into weighted per-function means; meta-tagged
//! items (neuroticism, state, social desirability, inconsistency pairs,
//! attention checks) are routed to their own buckets for the overlay and
//! validity stages. A function with zero contributing items yields a defined
//! 0.0 — surfaced downstream as a low-confidence signal, never a division
//! error.

use crate::response::{
    latest_per_question, PairSide, ResponseRow, ScoringKey, StateChannel, TagKind,
};
use crate::types::{Func, FUNCS};
use std::collections::BTreeMap;

/// One inconsistency pair's observed sides.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairValues {
    pub a: Option<f64>,
    pub b: Option<f64>,
}

/// One answered attention check.
#[derive(Debug, Clone, Copy)]
pub struct AttentionCheck {
    pub value: f64,
    pub expected: Option<f64>,
}

/// Everything the downstream stages need from one session's raw answers.
#[derive(Debug, Clone, Default)]
pub struct AggregatedSession {
    /// Weighted common-scale values per function.
    pub function_values: BTreeMap<Func, Vec<f64>>,
    /// Neuroticism items, reverse-keyed items already flipped.
    pub neuro_values: Vec<f64>,
    /// State items per channel.
    pub state_values: BTreeMap<StateChannel, Vec<f64>>,
    /// Social-desirability items.
    pub sd_values: Vec<f64>,
    /// Inconsistency pairs keyed by pair group.
    pub inc_pairs: BTreeMap<String, PairValues>,
    /// Answered attention checks.
    pub attention_checks: Vec<AttentionCheck>,
    /// Scorable answers seen (after last-answer dedup and key matching).
    pub answered_ct: usize,
}

impl AggregatedSession {
    /// Weighted mean strength per function. Zero items yields 0.0.
    pub fn strengths(&self) -> BTreeMap<Func, f64> {
        FUNCS
            .iter()
            .map(|f| {
                let vals = self.function_values.get(f);
                let mean = match vals {
                    Some(v) if !v.is_empty() => v.iter().sum::<f64>() / v.len() as f64,
                    _ => 0.0,
                };
                (*f, mean)
            })
            .collect()
    }

    /// True when the session carried no scorable answers at all.
    pub fn is_empty(&self) -> bool {
        self.answered_ct == 0
    }
}

/// Aggregate one session's raw rows against the scoring key.
///
/// Rows without a key entry or without a parseable numeric value are skipped;
/// partial assessments are expected input, not failures.
pub fn aggregate(rows: &[ResponseRow], key: &ScoringKey) -> AggregatedSession {
    let mut agg = AggregatedSession::default();
    for f in FUNCS {
        agg.function_values.insert(f, Vec::new());
    }

    for row in latest_per_question(rows) {
        let Some(rec) = key.get(&row.question_id) else {
            continue;
        };
        let Some(raw) = row.value.as_number() else {
            continue;
        };

        let native = if rec.reverse_scored {
            rec.scale_type.reverse(raw)
        } else {
            raw
        };
        let common = rec.scale_type.to_common(native);
        agg.answered_ct += 1;

        match rec.kind() {
            TagKind::Strength(func) => {
                agg.function_values
                    .entry(func)
                    .or_default()
                    .push(common * rec.weight);
            }
            TagKind::Neuro { reversed } => {
                // `_R` items flip on the common scale so the channel mean is
                // directly comparable to the stored norms.
                let v = if reversed { 6.0 - common } else { common };
                agg.neuro_values.push(v);
            }
            TagKind::State(channel) => {
                agg.state_values.entry(channel).or_default().push(common);
            }
            TagKind::SocialDesirability => agg.sd_values.push(common),
            TagKind::Inconsistency { group, side } => {
                let pair = agg.inc_pairs.entry(group).or_default();
                match side {
                    PairSide::A => pair.a = Some(common),
                    PairSide::B => pair.b = Some(common),
                }
            }
            TagKind::AttentionCheck => agg.attention_checks.push(AttentionCheck {
                value: native,
                expected: rec.expected_answer,
            }),
            TagKind::Other => {
                agg.answered_ct -= 1;
            }
        }
    }

    tracing::debug!(
        answered = agg.answered_ct,
        neuro_items = agg.neuro_values.len(),
        inc_pairs = agg.inc_pairs.len(),
        "session aggregated"
    );
    agg
}

/// Blend Likert strengths with functions-basis forced-choice scores
/// (0–100, rescaled onto 1–5). With no forced-choice record the Likert means
/// stand alone.
pub fn blended_strengths(
    agg: &AggregatedSession,
    fc_functions: Option<&BTreeMap<String, f64>>,
) -> BTreeMap<Func, f64> {
    let likert = agg.strengths();
    let Some(fc) = fc_functions else {
        return likert;
    };
    FUNCS
        .iter()
        .map(|f| {
            let fc5 = fc
                .get(f.as_str())
                .copied()
                .filter(|v| v.is_finite())
                .map(|v| v / 100.0 * 5.0)
                .unwrap_or(0.0);
            (*f, 0.5 * likert[f] + 0.5 * fc5)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{AnswerValue, KeyRecord, ScaleType};
    use std::collections::HashMap;

    fn row(qid: &str, v: f64) -> ResponseRow {
        ResponseRow {
            question_id: qid.into(),
            value: AnswerValue::Number(v),
            created_at: None,
            row_id: None,
        }
    }

    fn key(tag: &str) -> KeyRecord {
        KeyRecord {
            tag: Some(tag.into()),
            ..KeyRecord::default()
        }
    }

    #[test]
    fn function_items_average_per_function() {
        let mut sk: ScoringKey = HashMap::new();
        sk.insert("q1".into(), key("Ti_S"));
        sk.insert("q2".into(), key("Ti_S"));
        sk.insert("q3".into(), key("Se_S"));
        let rows = vec![row("q1", 4.0), row("q2", 2.0), row("q3", 5.0)];
        let agg = aggregate(&rows, &sk);
        let strengths = agg.strengths();
        assert!((strengths[&Func::Ti] - 3.0).abs() < 1e-9);
        assert!((strengths[&Func::Se] - 5.0).abs() < 1e-9);
        assert!((strengths[&Func::Fe]).abs() < 1e-9); // zero items => 0.0
    }

    #[test]
    fn reverse_scored_items_flip_before_accumulation() {
        let mut sk: ScoringKey = HashMap::new();
        sk.insert(
            "q1".into(),
            KeyRecord {
                tag: Some("Ni_S".into()),
                reverse_scored: true,
                ..KeyRecord::default()
            },
        );
        let agg = aggregate(&[row("q1", 1.0)], &sk);
        assert!((agg.strengths()[&Func::Ni] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn meta_tags_route_away_from_strengths() {
        let mut sk: ScoringKey = HashMap::new();
        sk.insert("n1".into(), key("N"));
        sk.insert("n2".into(), key("N_R"));
        sk.insert("sd".into(), key("SD"));
        sk.insert("ia".into(), key("INC_01_A"));
        sk.insert("ib".into(), key("INC_01_B"));
        let rows = vec![
            row("n1", 4.0),
            row("n2", 2.0), // reversed to 4.0
            row("sd", 5.0),
            row("ia", 2.0),
            row("ib", 4.0),
        ];
        let agg = aggregate(&rows, &sk);
        assert_eq!(agg.neuro_values, vec![4.0, 4.0]);
        assert_eq!(agg.sd_values, vec![5.0]);
        let pair = &agg.inc_pairs["01"];
        assert_eq!((pair.a, pair.b), (Some(2.0), Some(4.0)));
        assert!(agg.strengths().values().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn fc_blend_halves_both_sources() {
        let mut sk: ScoringKey = HashMap::new();
        sk.insert("q1".into(), key("Te_S"));
        let agg = aggregate(&[row("q1", 4.0)], &sk);
        let fc = BTreeMap::from([("Te".to_string(), 100.0)]);
        let blended = blended_strengths(&agg, Some(&fc));
        assert!((blended[&Func::Te] - 4.5).abs() < 1e-9); // 0.5*4 + 0.5*5
        assert!((blended[&Func::Ti]).abs() < 1e-9);
    }

    #[test]
    fn empty_session_is_defined_not_fatal() {
        let sk: ScoringKey = HashMap::new();
        let agg = aggregate(&[], &sk);
        assert!(agg.is_empty());
        assert!(agg.strengths().values().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn seven_point_state_items_normalize() {
        let mut sk: ScoringKey = HashMap::new();
        sk.insert(
            "s1".into(),
            KeyRecord {
                tag: Some("STATE_STRESS".into()),
                scale_type: ScaleType::State17,
                ..KeyRecord::default()
            },
        );
        let agg = aggregate(&[row("s1", 7.0)], &sk);
        let vals = &agg.state_values[&StateChannel::Stress];
        assert!((vals[0] - 5.0).abs() < 1e-9);
    }
}
