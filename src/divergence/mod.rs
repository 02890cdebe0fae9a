//! Divergence candidates and pivot pairing.
//!
//! A bearish divergence pairs two price highs whose prices are nearly equal
//! while %K made a lower reading at the second one; bullish mirrors this on
//! price lows. [`pair_pivots`] does the offline pairing, [`forward`] the
//! bar-by-bar variant.

pub mod forward;

use serde::{Deserialize, Serialize};

use crate::pivots::{Pivot, PivotWindow};
use crate::{Config, DivergenceError, Result};

/// Divergence direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DivergenceKind {
    /// Price highs hold while %K weakens
    Bearish,
    /// Price lows hold while %K strengthens
    Bullish,
}

/// Pivot endpoint with a defined oscillator value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DivergencePoint {
    pub bar: usize,
    pub price: f64,
    pub oscillator: f64,
}

impl Pivot {
    /// None while %K is unavailable at the pivot bar
    #[inline]
    pub fn resolve(&self) -> Option<DivergencePoint> {
        Some(DivergencePoint {
            bar: self.bar,
            price: self.price,
            oscillator: self.oscillator?,
        })
    }
}

/// Qualifying pair of pivots. `p1` always precedes `p2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DivergenceCandidate {
    pub kind: DivergenceKind,
    pub p1: DivergencePoint,
    pub p2: DivergencePoint,
}

impl DivergenceCandidate {
    #[inline]
    pub fn bars_apart(&self) -> usize {
        self.p2.bar - self.p1.bar
    }

    /// `|p2.price - p1.price| / p1.price`
    #[inline]
    pub fn price_diff_pct(&self) -> f64 {
        (self.p2.price - self.p1.price).abs() / self.p1.price
    }

    /// `p2.oscillator - p1.oscillator`
    #[inline]
    pub fn oscillator_diff(&self) -> f64 {
        self.p2.oscillator - self.p1.oscillator
    }
}

/// How far %K must move between the two pivots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OscillatorGate {
    /// Any strict move in the divergent direction
    Strict,
    /// A move of at least this many points
    AtLeast(f64),
}

impl OscillatorGate {
    pub fn admits(self, kind: DivergenceKind, diff: f64) -> bool {
        match (self, kind) {
            (OscillatorGate::Strict, DivergenceKind::Bearish) => diff < 0.0,
            (OscillatorGate::Strict, DivergenceKind::Bullish) => diff > 0.0,
            (OscillatorGate::AtLeast(min), DivergenceKind::Bearish) => diff <= -min,
            (OscillatorGate::AtLeast(min), DivergenceKind::Bullish) => diff >= min,
        }
    }
}

/// Pairing thresholds that differ between strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairingRules {
    pub oscillator_gate: OscillatorGate,
    /// Pairs further apart than this are never considered
    pub max_lookback: Option<usize>,
}

impl PairingRules {
    /// Offline pairing: a 10-point %K move within 60 bars
    pub const fn historical() -> Self {
        Self {
            oscillator_gate: OscillatorGate::AtLeast(10.0),
            max_lookback: Some(60),
        }
    }

    /// Forward pairing: any strict %K move, no lookback cap
    pub const fn forward() -> Self {
        Self {
            oscillator_gate: OscillatorGate::Strict,
            max_lookback: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let OscillatorGate::AtLeast(min) = self.oscillator_gate {
            if !min.is_finite() || min < 0.0 {
                return Err(DivergenceError::InvalidConfig(format!(
                    "oscillator gate must be a finite non-negative number, got {min}"
                )));
            }
        }
        if self.max_lookback == Some(0) {
            return Err(DivergenceError::InvalidValue("max_lookback must be > 0"));
        }
        Ok(())
    }

    #[inline]
    pub fn exceeds_lookback(&self, bars_apart: usize) -> bool {
        self.max_lookback.is_some_and(|max| bars_apart > max)
    }
}

/// Everything needed to decide whether two pivots form a divergence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairingCriteria {
    pub min_bars_between: usize,
    pub price_tolerance: f64,
    pub rules: PairingRules,
}

impl PairingCriteria {
    pub fn from_config(config: &Config, rules: PairingRules) -> Self {
        Self {
            min_bars_between: config.min_bars_between_pivots,
            price_tolerance: config.price_tolerance.get(),
            rules,
        }
    }

    /// Candidate when `p1 -> p2` passes spacing, lookback, price and %K checks
    pub fn qualify(&self, kind: DivergenceKind, p1: &Pivot, p2: &Pivot) -> Option<DivergenceCandidate> {
        let bars_apart = p2.bar.checked_sub(p1.bar)?;
        if bars_apart < self.min_bars_between || self.rules.exceeds_lookback(bars_apart) {
            return None;
        }

        let candidate = DivergenceCandidate {
            kind,
            p1: p1.resolve()?,
            p2: p2.resolve()?,
        };
        let price_ok = candidate.price_diff_pct() <= self.price_tolerance;
        let oscillator_ok = self
            .rules
            .oscillator_gate
            .admits(kind, candidate.oscillator_diff());

        (price_ok && oscillator_ok).then_some(candidate)
    }
}

/// Offline pairing over a full pivot list.
///
/// For each `p2` in order, scans older pivots backward and keeps the nearest
/// qualifying `p1`. Pivots closer than the minimum spacing are skipped; the
/// scan stops once the lookback cap is exceeded. Output follows `p2` order.
pub fn pair_pivots(
    pivots: &[Pivot],
    kind: DivergenceKind,
    criteria: &PairingCriteria,
) -> Vec<DivergenceCandidate> {
    let mut out = Vec::new();

    for (b, p2) in pivots.iter().enumerate() {
        for p1 in pivots[..b].iter().rev() {
            let bars_apart = p2.bar - p1.bar;
            if bars_apart < criteria.min_bars_between {
                continue;
            }
            if criteria.rules.exceeds_lookback(bars_apart) {
                break;
            }
            if let Some(candidate) = criteria.qualify(kind, p1, p2) {
                out.push(candidate);
                break;
            }
        }
    }

    out
}

/// Stage at which a candidate became an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Confirmed,
    /// Provisional signal on the last bar; may repaint
    Early,
}

/// Candidate plus the bar its event is emitted on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub candidate: DivergenceCandidate,
    pub signal_bar: usize,
    pub stage: Stage,
}

impl Detection {
    pub fn confirmed(candidate: DivergenceCandidate, signal_bar: usize) -> Self {
        Self {
            candidate,
            signal_bar,
            stage: Stage::Confirmed,
        }
    }

    pub fn early(candidate: DivergenceCandidate, signal_bar: usize) -> Self {
        Self {
            candidate,
            signal_bar,
            stage: Stage::Early,
        }
    }

    #[inline]
    pub fn is_early(&self) -> bool {
        self.stage == Stage::Early
    }
}

/// Historical strategy: bearish pairs from highs first, then bullish pairs from lows.
///
/// Each event is emitted when its second pivot becomes knowable, clamped to
/// the last bar.
pub fn detect_historical(
    highs: &[Pivot],
    lows: &[Pivot],
    criteria: &PairingCriteria,
    window: PivotWindow,
    bars: usize,
) -> Vec<Detection> {
    let last_bar = bars.saturating_sub(1);
    let bearish = pair_pivots(highs, DivergenceKind::Bearish, criteria);
    let bullish = pair_pivots(lows, DivergenceKind::Bullish, criteria);

    bearish
        .into_iter()
        .chain(bullish)
        .map(|c| Detection::confirmed(c, c.p2.bar.saturating_add(window.right).min(last_bar)))
        .collect()
}
