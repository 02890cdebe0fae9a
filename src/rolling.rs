//! Trailing-window statistics over sample series.
//!
//! Every function returns a vector aligned with its input. A slot is `None`
//! while the window is not yet full or while any value inside it is missing.
//! NaN inputs count as missing.

use std::collections::VecDeque;

use crate::{Period, Sample};

/// Which extreme a [`MonotonicWindow`] tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Max,
    Min,
}

impl Extreme {
    /// True if `candidate` evicts `held` from the back of the deque.
    /// Equal values evict too, so the most recent index wins ties.
    #[inline]
    fn dominates(self, candidate: f64, held: f64) -> bool {
        match self {
            Extreme::Max => candidate >= held,
            Extreme::Min => candidate <= held,
        }
    }
}

/// Finite value of a sample, or `None`
#[inline]
pub(crate) fn finite(sample: Sample) -> Sample {
    sample.filter(|v| v.is_finite())
}

/// Sliding-window max/min with amortized O(1) updates.
///
/// Holds `(index, value)` pairs whose values are monotonic from front to
/// back; the front is always the extreme of the current window.
#[derive(Debug, Clone)]
pub struct MonotonicWindow {
    extreme: Extreme,
    window: usize,
    deque: VecDeque<(usize, f64)>,
    last_gap: Option<usize>,
    next_index: usize,
}

impl MonotonicWindow {
    pub fn new(extreme: Extreme, window: Period) -> Self {
        Self {
            extreme,
            window: window.get(),
            deque: VecDeque::new(),
            last_gap: None,
            next_index: 0,
        }
    }

    /// Push the next sample.
    ///
    /// Returns the `(index, value)` of the window extreme once the window is
    /// full and holds no missing values.
    pub fn push(&mut self, sample: Sample) -> Option<(usize, f64)> {
        let index = self.next_index;
        self.next_index += 1;

        while let Some(&(front, _)) = self.deque.front() {
            if index - front >= self.window {
                self.deque.pop_front();
            } else {
                break;
            }
        }

        match finite(sample) {
            Some(value) => {
                while let Some(&(_, held)) = self.deque.back() {
                    if self.extreme.dominates(value, held) {
                        self.deque.pop_back();
                    } else {
                        break;
                    }
                }
                self.deque.push_back((index, value));
            }
            None => self.last_gap = Some(index),
        }

        if index < self.window - 1 {
            return None;
        }
        if matches!(self.last_gap, Some(gap) if index - gap < self.window) {
            return None;
        }
        self.deque.front().copied()
    }
}

fn rolling_extreme<S: Copy + Into<Sample>>(series: &[S], window: Period, extreme: Extreme) -> Vec<Sample> {
    let mut tracker = MonotonicWindow::new(extreme, window);
    series
        .iter()
        .map(|&s| tracker.push(s.into()).map(|(_, v)| v))
        .collect()
}

/// Highest value over the trailing `window` samples
pub fn rolling_max<S: Copy + Into<Sample>>(series: &[S], window: Period) -> Vec<Sample> {
    rolling_extreme(series, window, Extreme::Max)
}

/// Lowest value over the trailing `window` samples
pub fn rolling_min<S: Copy + Into<Sample>>(series: &[S], window: Period) -> Vec<Sample> {
    rolling_extreme(series, window, Extreme::Min)
}

/// Simple moving average with a running sum
pub fn moving_average<S: Copy + Into<Sample>>(series: &[S], window: Period) -> Vec<Sample> {
    let len = window.get();
    let defined = |s: S| -> Sample { finite(s.into()) };

    let mut out = Vec::with_capacity(series.len());
    let mut sum = 0.0;
    let mut last_gap: Option<usize> = None;

    for (i, &s) in series.iter().enumerate() {
        match defined(s) {
            Some(v) => sum += v,
            None => last_gap = Some(i),
        }
        if i >= len {
            if let Some(old) = defined(series[i - len]) {
                sum -= old;
            }
        }

        let full = i >= len - 1;
        let clean = !matches!(last_gap, Some(gap) if i - gap < len);
        out.push((full && clean).then(|| sum / len as f64));
    }

    out
}

/// Highest value over the last `len` entries ending at `index`, truncated at the series start.
pub fn trailing_max(series: &[f64], len: usize, index: usize) -> f64 {
    let start = (index + 1).saturating_sub(len.max(1));
    series[start..=index]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Lowest value over the last `len` entries ending at `index`, truncated at the series start.
pub fn trailing_min(series: &[f64], len: usize, index: usize) -> f64 {
    let start = (index + 1).saturating_sub(len.max(1));
    series[start..=index]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min)
}
