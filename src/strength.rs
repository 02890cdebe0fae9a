//! Divergence strength scoring.
//!
//! Three sub-scores of 0..=3 each, summed to 0..=9:
//!
//! | sub-score   | bearish (p1 / fall / slope)       | bullish (p1 / rise / slope)       |
//! |-------------|-----------------------------------|-----------------------------------|
//! | extremeness | > OB+5 / > OB / > OB-10           | < OS-5 / < OS / < OS+10           |
//! | movement    | fall > 25 / 15 / 5                | rise > 25 / 15 / 5                |
//! | momentum    | slope < -7 / -3 / -1              | slope > 7 / 3 / 1                 |

use serde::{Deserialize, Serialize};

use crate::divergence::DivergenceKind;
use crate::Sample;

/// Oscillator reference levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub oversold: f64,
    pub overbought: f64,
}

/// Coarse strength band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StrengthLabel {
    Weak,
    Medium,
    MediumHigh,
    Strong,
    VeryStrong,
}

impl StrengthLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            StrengthLabel::Weak => "Weak",
            StrengthLabel::Medium => "Medium",
            StrengthLabel::MediumHigh => "Medium-High",
            StrengthLabel::Strong => "Strong",
            StrengthLabel::VeryStrong => "Very Strong",
        }
    }
}

impl std::fmt::Display for StrengthLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summed strength score in 0..=9
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StrengthScore(u8);

impl StrengthScore {
    pub const MAX: u8 = 9;

    /// Clamps to [`Self::MAX`]
    #[inline]
    pub fn new(score: u8) -> Self {
        Self(score.min(Self::MAX))
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    pub fn label(self) -> StrengthLabel {
        match self.0 {
            8.. => StrengthLabel::VeryStrong,
            6..=7 => StrengthLabel::Strong,
            4..=5 => StrengthLabel::MediumHigh,
            2..=3 => StrengthLabel::Medium,
            _ => StrengthLabel::Weak,
        }
    }

    /// Score rescaled to 1..=10
    pub fn signal_strength(self) -> u8 {
        let scaled = (f64::from(self.0) / f64::from(Self::MAX) * 9.0).round() as u8 + 1;
        scaled.clamp(1, 10)
    }

    /// Score rescaled to 0..=100
    pub fn percent(self) -> u8 {
        (f64::from(self.0) / f64::from(Self::MAX) * 100.0).round() as u8
    }
}

/// 3 if `value` clears `hi`, 2 for `mid`, 1 for `lo`, else 0
#[inline]
fn bucket(value: f64, [hi, mid, lo]: [f64; 3]) -> u8 {
    if value > hi {
        3
    } else if value > mid {
        2
    } else if value > lo {
        1
    } else {
        0
    }
}

/// Score a divergence from its %K endpoints and the %K slope at the signal bar.
///
/// An unavailable slope contributes 0.
pub fn score_divergence(
    kind: DivergenceKind,
    p1_oscillator: f64,
    p2_oscillator: f64,
    slope: Sample,
    levels: &Levels,
) -> StrengthScore {
    let (ob, os) = (levels.overbought, levels.oversold);

    // Bullish thresholds are mirrored by negation
    let (extremeness, movement, momentum) = match kind {
        DivergenceKind::Bearish => (
            bucket(p1_oscillator, [ob + 5.0, ob, ob - 10.0]),
            bucket(p1_oscillator - p2_oscillator, [25.0, 15.0, 5.0]),
            slope.map_or(0, |s| bucket(-s, [7.0, 3.0, 1.0])),
        ),
        DivergenceKind::Bullish => (
            bucket(-p1_oscillator, [-(os - 5.0), -os, -(os + 10.0)]),
            bucket(p2_oscillator - p1_oscillator, [25.0, 15.0, 5.0]),
            slope.map_or(0, |s| bucket(s, [7.0, 3.0, 1.0])),
        ),
    };

    StrengthScore::new(extremeness + movement + momentum)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: Levels = Levels {
        oversold: 20.0,
        overbought: 80.0,
    };

    #[test]
    fn test_max_bearish() {
        let s = score_divergence(DivergenceKind::Bearish, 90.0, 60.0, Some(-10.0), &LEVELS);
        assert_eq!(s.get(), 9);
        assert_eq!(s.label(), StrengthLabel::VeryStrong);
        assert_eq!(s.signal_strength(), 10);
        assert_eq!(s.percent(), 100);
    }

    #[test]
    fn test_bearish_buckets_are_strict() {
        // 85 is not above OB+5, 15 not above 15, -3 not below -3
        let s = score_divergence(DivergenceKind::Bearish, 85.0, 70.0, Some(-3.0), &LEVELS);
        assert_eq!(s.get(), 2 + 1 + 1);
        assert_eq!(s.label(), StrengthLabel::MediumHigh);
    }

    #[test]
    fn test_bullish_mirrors_bearish() {
        let s = score_divergence(DivergenceKind::Bullish, 10.0, 40.0, Some(8.0), &LEVELS);
        assert_eq!(s.get(), 9);

        let s = score_divergence(DivergenceKind::Bullish, 25.0, 32.0, Some(2.0), &LEVELS);
        assert_eq!(s.get(), 1 + 1 + 1);
        assert_eq!(s.label(), StrengthLabel::Medium);
    }

    #[test]
    fn test_wrong_direction_slope_scores_zero() {
        let s = score_divergence(DivergenceKind::Bearish, 50.0, 48.0, Some(5.0), &LEVELS);
        assert_eq!(s.get(), 0);
        assert_eq!(s.label(), StrengthLabel::Weak);
        assert_eq!(s.signal_strength(), 1);
        assert_eq!(s.percent(), 0);
    }

    #[test]
    fn test_missing_slope() {
        let with = score_divergence(DivergenceKind::Bearish, 90.0, 60.0, Some(-10.0), &LEVELS);
        let without = score_divergence(DivergenceKind::Bearish, 90.0, 60.0, None, &LEVELS);
        assert_eq!(with.get() - without.get(), 3);
    }

    #[test]
    fn test_labels() {
        let labels: Vec<StrengthLabel> = (0..=9).map(|s| StrengthScore::new(s).label()).collect();
        assert_eq!(
            labels,
            vec![
                StrengthLabel::Weak,
                StrengthLabel::Weak,
                StrengthLabel::Medium,
                StrengthLabel::Medium,
                StrengthLabel::MediumHigh,
                StrengthLabel::MediumHigh,
                StrengthLabel::Strong,
                StrengthLabel::Strong,
                StrengthLabel::VeryStrong,
                StrengthLabel::VeryStrong,
            ]
        );
        assert_eq!(StrengthLabel::MediumHigh.to_string(), "Medium-High");
    }

    #[test]
    fn test_rescaling() {
        for s in 0..=9u8 {
            assert_eq!(StrengthScore::new(s).signal_strength(), s + 1);
        }
        assert_eq!(StrengthScore::new(4).percent(), 44);
        assert_eq!(StrengthScore::new(200).get(), 9);
    }
}
