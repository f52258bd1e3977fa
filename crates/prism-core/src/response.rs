//! Raw response rows and the static scoring key.
//!
//! Responses are owned by the assessment-taking flow and immutable once
//! written; the engine only reads them. Answer values arrive loosely typed
//! (numbers, numeric strings, verbal anchors, multi-selects) and are
//! sanitized here, at the boundary, so core logic only ever sees clean
//! numbers on the common 1–5 scale.

use crate::types::Func;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single recorded answer. `row_id` breaks ties when two rows for the same
/// question carry the same timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRow {
    pub question_id: String,
    pub value: AnswerValue,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub row_id: Option<i64>,
}

/// Loosely-typed answer payload as stored by the assessment flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Text(String),
    Multi(Vec<String>),
}

impl AnswerValue {
    /// Lenient numeric parse: native numbers pass through, strings accept a
    /// leading integer (`"4 - Agree"`) or a known verbal anchor. Anything
    /// else (including multi-selects) is not a scalar answer.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Number(n) if n.is_finite() => Some(*n),
            AnswerValue::Number(_) => None,
            AnswerValue::Text(s) => parse_text_answer(s),
            AnswerValue::Multi(_) => None,
        }
    }
}

fn parse_text_answer(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<f64>() {
        return n.is_finite().then_some(n);
    }
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        return digits.parse::<f64>().ok();
    }
    let anchor = trimmed.to_lowercase();
    let v = match anchor.as_str() {
        "strongly disagree" | "never" | "very low" => 1.0,
        "disagree" | "rarely" | "low" | "slightly low" => 2.0,
        "neutral" | "sometimes" | "moderate" => 3.0,
        "agree" | "often" | "slightly high" | "high" => 4.0,
        "strongly agree" | "always" | "very high" => 5.0,
        _ => return None,
    };
    Some(v)
}

/// Native scale an item was administered on. Reverse scoring and the common
/// 1–5 mapping both depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScaleType {
    #[serde(rename = "LIKERT_1_5")]
    #[default]
    Likert15,
    #[serde(rename = "LIKERT_1_7")]
    Likert17,
    #[serde(rename = "STATE_1_7")]
    State17,
    #[serde(rename = "CATEGORICAL_5")]
    Categorical5,
    #[serde(rename = "FREQUENCY")]
    Frequency,
    #[serde(rename = "META")]
    Meta,
}

impl ScaleType {
    /// Flip a value on its native scale: `(max + min) - v`.
    pub fn reverse(&self, v: f64) -> f64 {
        match self {
            ScaleType::Likert17 | ScaleType::State17 => 8.0 - v,
            _ => 6.0 - v,
        }
    }

    /// Map a native value onto the common 1–5 scale.
    pub fn to_common(&self, v: f64) -> f64 {
        match self {
            ScaleType::Likert17 | ScaleType::State17 => 1.0 + (v - 1.0) * (4.0 / 6.0),
            _ => v,
        }
    }
}

/// Which side of an inconsistency pair an item sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairSide {
    A,
    B,
}

/// Semantic routing of a scoring-key tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagKind {
    /// `<Func>_S`: contributes to a function strength.
    Strength(Func),
    /// `N` / `N_R`: neuroticism overlay item, `_R` reverse-keyed.
    Neuro { reversed: bool },
    /// `STATE_<CHANNEL>`: state overlay item.
    State(StateChannel),
    /// `SD`: social-desirability item.
    SocialDesirability,
    /// `INC_<group>_<A|B>`: one side of an inconsistency pair.
    Inconsistency { group: String, side: PairSide },
    /// `AC_<n>`: attention check with a keyed expected answer.
    AttentionCheck,
    /// Anything the engine does not score.
    Other,
}

/// State overlay channels, each with a configured weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateChannel {
    Stress,
    Time,
    Sleep,
    Focus,
}

/// Parse a raw tag string into its routing kind.
pub fn parse_tag(tag: &str) -> TagKind {
    if let Some(code) = tag.strip_suffix("_S") {
        if let Some(func) = Func::parse(code) {
            return TagKind::Strength(func);
        }
    }
    match tag {
        "N" => return TagKind::Neuro { reversed: false },
        "N_R" => return TagKind::Neuro { reversed: true },
        "SD" => return TagKind::SocialDesirability,
        _ => {}
    }
    if let Some(channel) = tag.strip_prefix("STATE_") {
        let channel = match channel {
            "STRESS" => Some(StateChannel::Stress),
            "TIME" => Some(StateChannel::Time),
            "SLEEP" => Some(StateChannel::Sleep),
            "FOCUS" => Some(StateChannel::Focus),
            _ => None,
        };
        if let Some(c) = channel {
            return TagKind::State(c);
        }
    }
    if tag.starts_with("AC_") {
        return TagKind::AttentionCheck;
    }
    if let Some(rest) = tag.strip_prefix("INC_") {
        if let Some(group) = rest.strip_suffix("_A") {
            return TagKind::Inconsistency {
                group: group.to_string(),
                side: PairSide::A,
            };
        }
        if let Some(group) = rest.strip_suffix("_B") {
            return TagKind::Inconsistency {
                group: group.to_string(),
                side: PairSide::B,
            };
        }
    }
    TagKind::Other
}

/// Static per-question scoring metadata. Read-only reference data, loaded
/// fresh per computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub scale_type: ScaleType,
    #[serde(default)]
    pub reverse_scored: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub pair_group: Option<String>,
    /// Expected answer for attention-check items.
    #[serde(default)]
    pub expected_answer: Option<f64>,
}

fn default_weight() -> f64 {
    1.0
}

impl Default for KeyRecord {
    fn default() -> Self {
        Self {
            tag: None,
            scale_type: ScaleType::default(),
            reverse_scored: false,
            weight: 1.0,
            pair_group: None,
            expected_answer: None,
        }
    }
}

impl KeyRecord {
    pub fn kind(&self) -> TagKind {
        self.tag.as_deref().map(parse_tag).unwrap_or(TagKind::Other)
    }
}

/// The full scoring key: question id to key record.
pub type ScoringKey = HashMap<String, KeyRecord>;

/// Collapse raw rows to the last answer per question: newest `created_at`
/// wins, then highest `row_id`. Re-answering overwrites, never duplicates.
pub fn latest_per_question(rows: &[ResponseRow]) -> Vec<&ResponseRow> {
    let mut latest: HashMap<&str, &ResponseRow> = HashMap::new();
    for row in rows {
        match latest.get(row.question_id.as_str()) {
            Some(prev) if !is_newer(row, prev) => {}
            _ => {
                latest.insert(row.question_id.as_str(), row);
            }
        }
    }
    let mut out: Vec<&ResponseRow> = latest.into_values().collect();
    out.sort_by(|a, b| a.question_id.cmp(&b.question_id));
    out
}

fn is_newer(candidate: &ResponseRow, current: &ResponseRow) -> bool {
    match (candidate.created_at, current.created_at) {
        (Some(a), Some(b)) if a != b => a > b,
        _ => candidate.row_id.unwrap_or(0) >= current.row_id.unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbal_anchors_and_prefixed_digits_parse() {
        assert_eq!(AnswerValue::Text("Strongly Agree".into()).as_number(), Some(5.0));
        assert_eq!(AnswerValue::Text("4 - Agree".into()).as_number(), Some(4.0));
        assert_eq!(AnswerValue::Text("nonsense".into()).as_number(), None);
        assert_eq!(AnswerValue::Number(f64::NAN).as_number(), None);
        assert_eq!(AnswerValue::Multi(vec!["a".into()]).as_number(), None);
    }

    #[test]
    fn reverse_respects_native_scale() {
        assert!((ScaleType::Likert15.reverse(2.0) - 4.0).abs() < 1e-9);
        assert!((ScaleType::Likert17.reverse(2.0) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn seven_point_maps_onto_common_scale() {
        assert!((ScaleType::Likert17.to_common(1.0) - 1.0).abs() < 1e-9);
        assert!((ScaleType::Likert17.to_common(7.0) - 5.0).abs() < 1e-9);
        assert!((ScaleType::Likert17.to_common(4.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn tags_route_to_their_kinds() {
        assert_eq!(parse_tag("Ti_S"), TagKind::Strength(Func::Ti));
        assert_eq!(parse_tag("N_R"), TagKind::Neuro { reversed: true });
        assert_eq!(parse_tag("STATE_SLEEP"), TagKind::State(StateChannel::Sleep));
        assert_eq!(
            parse_tag("INC_03_B"),
            TagKind::Inconsistency { group: "03".into(), side: PairSide::B }
        );
        assert_eq!(parse_tag("AC_1"), TagKind::AttentionCheck);
        assert_eq!(parse_tag("XX_S"), TagKind::Other);
    }

    #[test]
    fn latest_answer_wins_per_question() {
        let t0 = "2025-01-01T00:00:00Z".parse().unwrap();
        let t1 = "2025-01-02T00:00:00Z".parse().unwrap();
        let rows = vec![
            ResponseRow {
                question_id: "q1".into(),
                value: AnswerValue::Number(2.0),
                created_at: Some(t0),
                row_id: Some(1),
            },
            ResponseRow {
                question_id: "q1".into(),
                value: AnswerValue::Number(5.0),
                created_at: Some(t1),
                row_id: Some(2),
            },
        ];
        let latest = latest_per_question(&rows);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].value.as_number(), Some(5.0));
    }
}
