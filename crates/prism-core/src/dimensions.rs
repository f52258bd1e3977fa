//! Dimensionality estimation: each function's strength mapped to a discrete
//! 1D–4D band through ordered thresholds. Pure classification, no
//! cross-function interaction; the thresholds are the single tunable knob.

use crate::config::DimThresholds;
use crate::types::{Func, FUNCS};
use std::collections::BTreeMap;

/// Band one strength value against the ordered thresholds.
pub fn band(value: f64, t: &DimThresholds) -> u8 {
    if value < t.one {
        1
    } else if value < t.two {
        2
    } else if value < t.three {
        3
    } else {
        4
    }
}

/// Band the full strength vector.
pub fn estimate(strengths: &BTreeMap<Func, f64>, t: &DimThresholds) -> BTreeMap<Func, u8> {
    FUNCS
        .iter()
        .map(|f| (*f, band(strengths.get(f).copied().unwrap_or(0.0), t)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_half_open_ascending() {
        let t = DimThresholds { one: 2.1, two: 3.0, three: 3.8 };
        assert_eq!(band(0.0, &t), 1);
        assert_eq!(band(2.09, &t), 1);
        assert_eq!(band(2.1, &t), 2);
        assert_eq!(band(2.99, &t), 2);
        assert_eq!(band(3.0, &t), 3);
        assert_eq!(band(3.8, &t), 4);
        assert_eq!(band(5.0, &t), 4);
    }

    #[test]
    fn missing_functions_band_as_1d() {
        let t = DimThresholds::default();
        let dims = estimate(&BTreeMap::new(), &t);
        assert_eq!(dims.len(), 8);
        assert!(dims.values().all(|d| *d == 1));
    }
}
