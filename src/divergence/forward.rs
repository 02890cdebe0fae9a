//! Bar-by-bar divergence tracking.
//!
//! Each kind keeps its own [`KindState`]:
//!
//! ```text
//!   pivot shift ──qualifies──▶ pending ──trigger && bar >= p2──▶ confirmed
//!        ▲                        │
//!        └──────── newer qualifying shift replaces it ◀──────────┘
//! ```
//!
//! Per bar the order is: pivot shifts (highs, then lows), the early signal
//! on the last bar (bearish, then bullish), confirmation (bullish, then
//! bearish).

use tracing::{debug, trace};

use super::{Detection, DivergenceCandidate, DivergenceKind, PairingCriteria};
use crate::oscillator::Stochastic;
use crate::pivots::Pivot;
use crate::rolling::{trailing_max, trailing_min};
use crate::{Config, Series};

/// Tracking state for one divergence kind
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KindState {
    pub last: Option<Pivot>,
    pub previous: Option<Pivot>,
    pub pending: Option<DivergenceCandidate>,
}

impl KindState {
    /// Shift in a newly knowable pivot.
    ///
    /// The candidate is evaluated only on the shift itself: a pair that
    /// fails here is never revisited, and a non-qualifying shift leaves an
    /// existing pending candidate in place.
    pub fn on_pivot(self, pivot: Pivot, kind: DivergenceKind, criteria: &PairingCriteria) -> Self {
        let previous = self.last;
        let fresh = previous.and_then(|p1| criteria.qualify(kind, &p1, &pivot));

        if let Some(candidate) = fresh {
            debug!(
                kind = ?kind,
                p1 = candidate.p1.bar,
                p2 = candidate.p2.bar,
                "divergence pending"
            );
        }

        Self {
            last: Some(pivot),
            previous,
            pending: fresh.or(self.pending),
        }
    }

    /// Confirm the pending candidate when `triggered` and the bar has reached its second pivot.
    pub fn on_bar(self, bar: usize, triggered: bool) -> (Self, Option<DivergenceCandidate>) {
        match self.pending {
            Some(candidate) if triggered && bar >= candidate.p2.bar => (
                Self {
                    pending: None,
                    ..self
                },
                Some(candidate),
            ),
            _ => (self, None),
        }
    }
}

/// Forward-strategy switches taken from [`Config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardOptions {
    pub pivot_left: usize,
    pub pivot_right: usize,
    pub enable_early: bool,
    pub wait_for_crossover: bool,
}

impl ForwardOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pivot_left: config.pivot_left,
            pivot_right: config.pivot_right,
            enable_early: config.enable_early,
            wait_for_crossover: config.wait_for_crossover,
        }
    }
}

/// Walk the series once, shifting pivots in as they become knowable.
///
/// `highs` and `lows` must be in bar order.
pub fn detect_forward(
    series: &Series,
    stoch: &Stochastic,
    highs: &[Pivot],
    lows: &[Pivot],
    criteria: &PairingCriteria,
    options: ForwardOptions,
) -> Vec<Detection> {
    let bars = series.len();
    let right = options.pivot_right;

    let mut bearish = KindState::default();
    let mut bullish = KindState::default();
    let mut next_high = highs.iter().peekable();
    let mut next_low = lows.iter().peekable();
    let mut out = Vec::new();

    for i in 0..bars {
        while let Some(p) = next_high.next_if(|p| p.bar.saturating_add(right) <= i) {
            trace!(bar = p.bar, known_at = i, "pivot high");
            bearish = bearish.on_pivot(*p, DivergenceKind::Bearish, criteria);
        }
        while let Some(p) = next_low.next_if(|p| p.bar.saturating_add(right) <= i) {
            trace!(bar = p.bar, known_at = i, "pivot low");
            bullish = bullish.on_pivot(*p, DivergenceKind::Bullish, criteria);
        }

        if options.enable_early && i + 1 == bars {
            for (kind, state) in [
                (DivergenceKind::Bearish, &bearish),
                (DivergenceKind::Bullish, &bullish),
            ] {
                if let Some(candidate) =
                    early_candidate(kind, state, series, stoch, i, criteria, options.pivot_left)
                {
                    debug!(kind = ?kind, p1 = candidate.p1.bar, bar = i, "early divergence");
                    out.push(Detection::early(candidate, i));
                }
            }
        }

        let bull_trigger = !options.wait_for_crossover || stoch.crosses_over(i);
        let (state, confirmed) = bullish.on_bar(i, bull_trigger);
        bullish = state;
        if let Some(candidate) = confirmed {
            debug!(p1 = candidate.p1.bar, p2 = candidate.p2.bar, bar = i, "bullish divergence confirmed");
            out.push(Detection::confirmed(candidate, i));
        }

        let bear_trigger = !options.wait_for_crossover || stoch.crosses_under(i);
        let (state, confirmed) = bearish.on_bar(i, bear_trigger);
        bearish = state;
        if let Some(candidate) = confirmed {
            debug!(p1 = candidate.p1.bar, p2 = candidate.p2.bar, bar = i, "bearish divergence confirmed");
            out.push(Detection::confirmed(candidate, i));
        }
    }

    out
}

/// Provisional divergence against the current bar.
///
/// The current bar must be the extreme of the last `pivot_left + 1` bars
/// (truncated at the series start) and pair with the most recent confirmed
/// pivot under the usual criteria.
pub fn early_candidate(
    kind: DivergenceKind,
    state: &KindState,
    series: &Series,
    stoch: &Stochastic,
    bar: usize,
    criteria: &PairingCriteria,
    pivot_left: usize,
) -> Option<DivergenceCandidate> {
    let anchor = state.last?;
    let span = pivot_left.saturating_add(1);

    let price = match kind {
        DivergenceKind::Bearish => {
            let high = series.high()[bar];
            (high == trailing_max(series.high(), span, bar)).then_some(high)?
        }
        DivergenceKind::Bullish => {
            let low = series.low()[bar];
            (low == trailing_min(series.low(), span, bar)).then_some(low)?
        }
    };

    let current = Pivot {
        bar,
        price,
        oscillator: stoch.k_at(bar),
    };
    criteria.qualify(kind, &anchor, &current)
}
