//! Confidence calibration: the gap between the top two candidates becomes a
//! raw confidence through a parameterized sigmoid, then a calibrated value
//! through a version-pinned curve fit against historical data.
//!
//! The curve is configuration, not logic — swappable without touching the
//! engine. Training helpers (pool-adjacent-violators isotonic regression and
//! a conservative Platt-style knot generator) produce curves the
//! interpolator consumes.

use crate::config::{BandCuts, ConfRawParams};
use serde::{Deserialize, Serialize};

/// One knot of a calibration curve: raw confidence x maps to calibrated
/// probability y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub x: f64,
    pub y: f64,
}

/// How a calibration curve was fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMethod {
    Isotonic,
    Platt,
    PlattFallback,
    Identity,
}

/// A version-pinned calibration curve: sorted knots interpolated linearly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub version: String,
    pub method: CalibrationMethod,
    pub knots: Vec<CalibrationPoint>,
}

impl CalibrationCurve {
    /// Apply the curve to a raw confidence. Out-of-range inputs clamp to the
    /// boundary knots; an empty curve is the identity.
    pub fn apply(&self, raw: f64) -> f64 {
        if self.knots.is_empty() {
            return raw.clamp(0.0, 1.0);
        }
        if self.knots.len() == 1 {
            return self.knots[0].y.clamp(0.0, 1.0);
        }
        let mut knots = self.knots.clone();
        knots.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        if raw <= knots[0].x {
            return knots[0].y.clamp(0.0, 1.0);
        }
        if raw >= knots[knots.len() - 1].x {
            return knots[knots.len() - 1].y.clamp(0.0, 1.0);
        }
        for pair in knots.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            if raw >= lower.x && raw <= upper.x {
                if (upper.x - lower.x).abs() < f64::EPSILON {
                    return lower.y.clamp(0.0, 1.0);
                }
                let t = (raw - lower.x) / (upper.x - lower.x);
                return (lower.y + t * (upper.y - lower.y)).clamp(0.0, 1.0);
            }
        }
        raw.clamp(0.0, 1.0)
    }

    /// Fit an isotonic curve with pool-adjacent-violators: duplicate x
    /// values average first, then violating neighbors merge until the knot
    /// sequence is monotone.
    pub fn isotonic(version: &str, points: &[CalibrationPoint]) -> CalibrationCurve {
        let mut sorted: Vec<CalibrationPoint> = points.to_vec();
        sorted.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let mut knots: Vec<CalibrationPoint> = Vec::new();
        for p in sorted {
            match knots.last_mut() {
                Some(last) if (last.x - p.x).abs() < f64::EPSILON => {
                    last.y = (last.y + p.y) / 2.0;
                }
                _ => knots.push(p),
            }
        }

        let mut i = 1;
        while i < knots.len() {
            if knots[i].y < knots[i - 1].y {
                let merged = CalibrationPoint {
                    x: (knots[i - 1].x + knots[i].x) / 2.0,
                    y: (knots[i - 1].y + knots[i].y) / 2.0,
                };
                knots[i - 1] = merged;
                knots.remove(i);
                if i > 1 {
                    i -= 1;
                }
            } else {
                i += 1;
            }
        }

        CalibrationCurve {
            version: version.to_string(),
            method: CalibrationMethod::Isotonic,
            knots,
        }
    }

    /// Fit a conservative Platt-style curve. With too few points, returns an
    /// identity-like mapping rather than overfitting.
    pub fn platt(version: &str, points: &[CalibrationPoint]) -> CalibrationCurve {
        let knots = if points.len() < 5 {
            vec![
                CalibrationPoint { x: 0.0, y: 0.1 },
                CalibrationPoint { x: 0.5, y: 0.5 },
                CalibrationPoint { x: 1.0, y: 0.9 },
            ]
        } else {
            let mean_y = points.iter().map(|p| p.y).sum::<f64>() / points.len() as f64;
            vec![
                CalibrationPoint { x: 0.0, y: (mean_y - 0.1).clamp(0.05, 0.3) },
                CalibrationPoint { x: 0.25, y: (mean_y - 0.05).clamp(0.1, 0.5) },
                CalibrationPoint { x: 0.5, y: mean_y.clamp(0.2, 0.8) },
                CalibrationPoint { x: 0.75, y: (mean_y + 0.05).clamp(0.5, 0.9) },
                CalibrationPoint { x: 1.0, y: (mean_y + 0.1).clamp(0.7, 0.95) },
            ]
        };
        CalibrationCurve {
            version: version.to_string(),
            method: CalibrationMethod::Platt,
            knots,
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Raw confidence from the top-two gap, the share margin, and the share
/// entropy. Monotone increasing in the gap.
pub fn raw_confidence(top_gap: f64, share_margin: f64, share_entropy: f64, p: &ConfRawParams) -> f64 {
    sigmoid(p.a * top_gap + p.b * share_margin - p.c * share_entropy).clamp(0.0, 1.0)
}

/// Calibrate a raw confidence: the pinned curve when configured, Platt
/// fallback otherwise.
pub fn calibrated_confidence(raw: f64, curve: Option<&CalibrationCurve>) -> f64 {
    match curve {
        Some(c) => c.apply(raw),
        None => platt_fallback(raw),
    }
}

/// Platt-scaling fallback tuned against historical cohorts.
fn platt_fallback(raw: f64) -> f64 {
    sigmoid(-0.5 + 1.2 * raw).clamp(0.0, 1.0)
}

/// The three reliability/quality bands shared by `confidence` and
/// `fit_band`. Related but distinct fields; never conflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Band {
    High,
    Moderate,
    Low,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::High => "High",
            Band::Moderate => "Moderate",
            Band::Low => "Low",
        }
    }
}

/// Discretize a [0,1] value against band cuts.
pub fn band_of(value: f64, cuts: &BandCuts) -> Band {
    if value >= cuts.high {
        Band::High
    } else if value >= cuts.moderate {
        Band::Moderate
    } else {
        Band::Low
    }
}
