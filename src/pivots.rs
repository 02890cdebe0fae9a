//! Swing pivot detection.
//!
//! A bar `p` is a pivot high when no value in `[p - left, p + right]` is
//! strictly greater than `series[p]`; equal neighbours do not disqualify it.
//! Pivot lows mirror this. A pivot is only knowable once bar `p + right`
//! has closed, and the detectors never report anything earlier.

use serde::{Deserialize, Serialize};

use crate::rolling::{Extreme, MonotonicWindow};
use crate::{Period, Sample};

/// Bars required on each side of a pivot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotWindow {
    pub left: usize,
    pub right: usize,
}

impl PivotWindow {
    pub const fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    /// Total bars covered by the window. Saturates, so an oversized window never fills.
    #[inline]
    pub fn span(&self) -> usize {
        self.left.saturating_add(self.right).saturating_add(1)
    }
}

/// Pivot found in a single series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PivotPoint {
    pub bar: usize,
    pub value: f64,
}

impl PivotPoint {
    /// First bar at which this pivot can be known
    #[inline]
    pub fn known_at(&self, window: PivotWindow) -> usize {
        self.bar.saturating_add(window.right)
    }
}

/// Price pivot with the %K value at the same bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pivot {
    pub bar: usize,
    pub price: f64,
    pub oscillator: Sample,
}

/// Pivot highs in bar order
pub fn pivot_highs<S: Copy + Into<Sample>>(series: &[S], window: PivotWindow) -> Vec<PivotPoint> {
    find_pivots(series, window, Extreme::Max)
}

/// Pivot lows in bar order
pub fn pivot_lows<S: Copy + Into<Sample>>(series: &[S], window: PivotWindow) -> Vec<PivotPoint> {
    find_pivots(series, window, Extreme::Min)
}

fn find_pivots<S: Copy + Into<Sample>>(
    series: &[S],
    window: PivotWindow,
    extreme: Extreme,
) -> Vec<PivotPoint> {
    // span >= 1 for any window
    let mut tracker = MonotonicWindow::new(extreme, Period::new_const(window.span()));
    let mut out = Vec::new();

    for (i, &s) in series.iter().enumerate() {
        let Some((_, best)) = tracker.push(s.into()) else {
            continue;
        };
        // Full window is [i - span + 1, i]; the candidate sits `right` bars back
        let bar = i - window.right;
        let at: Sample = series[bar].into();
        if let Some(value) = at {
            if value == best {
                out.push(PivotPoint { bar, value });
            }
        }
    }

    out
}

/// Attach the oscillator value at each pivot bar
pub fn with_oscillator(points: &[PivotPoint], oscillator: &[Sample]) -> Vec<Pivot> {
    points
        .iter()
        .map(|p| Pivot {
            bar: p.bar,
            price: p.value,
            oscillator: oscillator.get(p.bar).copied().flatten(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(points: &[PivotPoint]) -> Vec<usize> {
        points.iter().map(|p| p.bar).collect()
    }

    #[test]
    fn test_single_peak() {
        let data = [1.0, 2.0, 5.0, 3.0, 2.0, 1.0];
        let highs = pivot_highs(&data, PivotWindow::new(2, 1));
        assert_eq!(bars(&highs), vec![2]);
        assert_eq!(highs[0].value, 5.0);
        assert_eq!(highs[0].known_at(PivotWindow::new(2, 1)), 3);
    }

    #[test]
    fn test_plateau_reports_every_bar() {
        let data = [1.0, 2.0, 3.0, 3.0, 2.0, 1.0];
        let highs = pivot_highs(&data, PivotWindow::new(1, 1));
        assert_eq!(bars(&highs), vec![2, 3]);
    }

    #[test]
    fn test_pivot_lows() {
        let data = [5.0, 4.0, 1.0, 4.0, 5.0, 2.0, 6.0];
        let lows = pivot_lows(&data, PivotWindow::new(1, 1));
        assert_eq!(bars(&lows), vec![2, 5]);
    }

    #[test]
    fn test_no_interior_peak() {
        let data = [9.0, 1.0, 2.0, 3.0, 9.0];
        let highs = pivot_highs(&data, PivotWindow::new(1, 1));
        assert!(highs.is_empty());
    }

    #[test]
    fn test_unavailable_values_are_skipped() {
        let data = [None, Some(1.0), Some(4.0), Some(2.0), None, Some(1.0)];
        let highs = pivot_highs(&data, PivotWindow::new(1, 1));
        assert_eq!(bars(&highs), vec![2]);

        let near_gap = [Some(1.0), Some(5.0), None];
        assert!(pivot_highs(&near_gap, PivotWindow::new(1, 1)).is_empty());
    }

    #[test]
    fn test_zero_width_window() {
        let data = [3.0, 1.0, 2.0];
        let highs = pivot_highs(&data, PivotWindow::new(0, 0));
        assert_eq!(bars(&highs), vec![0, 1, 2]);
    }

    #[test]
    fn test_oversized_window_finds_nothing() {
        let data = [1.0, 5.0, 2.0];
        assert!(pivot_highs(&data, PivotWindow::new(usize::MAX, 1)).is_empty());
        assert!(pivot_lows(&data, PivotWindow::new(1, usize::MAX)).is_empty());
        assert_eq!(PivotWindow::new(usize::MAX, usize::MAX).span(), usize::MAX);
    }

    #[test]
    fn test_infinite_value_is_never_a_pivot() {
        let data = [1.0, f64::INFINITY, 2.0, 3.0, 1.0];
        let highs = pivot_highs(&data, PivotWindow::new(1, 1));
        assert_eq!(bars(&highs), vec![3]);
    }

    #[test]
    fn test_with_oscillator() {
        let points = [PivotPoint { bar: 1, value: 10.0 }, PivotPoint { bar: 3, value: 12.0 }];
        let k = [None, Some(70.0), None, None];
        let pivots = with_oscillator(&points, &k);
        assert_eq!(pivots[0].oscillator, Some(70.0));
        assert_eq!(pivots[1].oscillator, None);
        assert_eq!(pivots[1].price, 12.0);
    }
}
