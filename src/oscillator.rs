//! Stochastic oscillator (%K / %D).

use serde::Serialize;

use crate::rolling::{moving_average, rolling_max, rolling_min};
use crate::{Period, Sample};

/// Raw stochastic plus its two smoothing stages, aligned with the input bars
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stochastic {
    pub raw: Vec<Sample>,
    pub k: Vec<Sample>,
    pub d: Vec<Sample>,
}

/// Compute the smoothed stochastic.
///
/// `raw[i] = 100 * (close - lowest low) / (highest high - lowest low)` over
/// the trailing `k_len` bars. A flat window (zero or non-finite denominator)
/// or a non-finite result yields `None`, which then flows through both
/// moving averages.
pub fn stochastic(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    k_len: Period,
    smooth_k: Period,
    smooth_d: Period,
) -> Stochastic {
    let highest = rolling_max(high, k_len);
    let lowest = rolling_min(low, k_len);

    let raw: Vec<Sample> = close
        .iter()
        .zip(highest.iter().zip(&lowest))
        .map(|(&c, (&hh, &ll))| {
            let (hh, ll) = (hh?, ll?);
            let denom = hh - ll;
            if denom == 0.0 || !denom.is_finite() {
                return None;
            }
            let value = 100.0 * (c - ll) / denom;
            value.is_finite().then_some(value)
        })
        .collect();

    let k = moving_average(&raw, smooth_k);
    let d = moving_average(&k, smooth_d);

    Stochastic { raw, k, d }
}

/// `a` crosses above `b` between two consecutive bars
#[inline]
pub fn crossover(prev_a: f64, a: f64, prev_b: f64, b: f64) -> bool {
    prev_a <= prev_b && a > b
}

/// `a` crosses below `b` between two consecutive bars
#[inline]
pub fn crossunder(prev_a: f64, a: f64, prev_b: f64, b: f64) -> bool {
    prev_a >= prev_b && a < b
}

impl Stochastic {
    #[inline]
    pub fn len(&self) -> usize {
        self.k.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.k.is_empty()
    }

    #[inline]
    pub fn k_at(&self, index: usize) -> Sample {
        self.k.get(index).copied().flatten()
    }

    #[inline]
    pub fn d_at(&self, index: usize) -> Sample {
        self.d.get(index).copied().flatten()
    }

    /// One-bar change of %K
    pub fn slope(&self, index: usize) -> Sample {
        let prev = self.k_at(index.checked_sub(1)?)?;
        Some(self.k_at(index)? - prev)
    }

    /// %K crossed above %D on this bar. False while either line is unavailable.
    pub fn crosses_over(&self, index: usize) -> bool {
        self.lines_around(index)
            .is_some_and(|(pk, k, pd, d)| crossover(pk, k, pd, d))
    }

    /// %K crossed below %D on this bar. False while either line is unavailable.
    pub fn crosses_under(&self, index: usize) -> bool {
        self.lines_around(index)
            .is_some_and(|(pk, k, pd, d)| crossunder(pk, k, pd, d))
    }

    /// Raw stochastic value bar `index` would need for %K to reach the current %D.
    ///
    /// Solves `(x + raw[i-1] + .. + raw[i-smooth_k+1]) / smooth_k = d[i]` for `x`.
    pub fn required_raw_for_cross(&self, smooth_k: Period, index: usize) -> Sample {
        let target = self.d_at(index)?;
        let len = smooth_k.get();

        let mut prior = 0.0;
        for back in 1..len {
            let i = index.checked_sub(back)?;
            prior += self.raw.get(i).copied().flatten()?;
        }

        Some(target * len as f64 - prior)
    }

    fn lines_around(&self, index: usize) -> Option<(f64, f64, f64, f64)> {
        let prev = index.checked_sub(1)?;
        Some((
            self.k_at(prev)?,
            self.k_at(index)?,
            self.d_at(prev)?,
            self.d_at(index)?,
        ))
    }
}
