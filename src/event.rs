//! Divergence events.

use serde::Serialize;

use crate::context::{PatternMatch, Pressure, SignalContext};
use crate::divergence::{Detection, DivergenceCandidate, DivergenceKind, DivergencePoint};
use crate::oscillator::Stochastic;
use crate::strength::{score_divergence, Levels, StrengthLabel, StrengthScore};
use crate::{Config, Period, Series};

/// How many bars back from `p1` the extreme-zone run is counted
const EXTREME_RUN_LIMIT: usize = 100;

/// What %K would need to reach %D on the signal bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossoverTarget {
    /// Raw stochastic value that makes %K equal the current %D
    pub required_raw: f64,
    /// How close the current raw value is to that target, 0..=100
    pub convergence_pct: f64,
}

/// A scored, explainable divergence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergenceEvent {
    pub kind: DivergenceKind,
    /// Provisional, computed against the still-forming last bar
    pub is_early: bool,
    pub p1: DivergencePoint,
    pub p2: DivergencePoint,
    pub bars_apart: usize,
    pub price_diff_pct: f64,
    pub oscillator_diff: f64,
    pub signal_bar: usize,
    pub signal_time: i64,
    pub strength: StrengthScore,
    /// One-bar %K change at the signal bar
    pub k_slope: Option<f64>,
    /// Consecutive bars in the extreme zone ending at `p1`
    pub extreme_run: usize,
    /// Volume change from `p1` to `p2` in percent; confirmed events only
    pub volume_change_pct: Option<f64>,
    pub pattern: Option<PatternMatch>,
    pub pressure: Option<Pressure>,
    /// Early events only
    pub crossover: Option<CrossoverTarget>,
}

impl DivergenceEvent {
    #[inline]
    pub fn label(&self) -> StrengthLabel {
        self.strength.label()
    }

    #[inline]
    pub fn signal_strength(&self) -> u8 {
        self.strength.signal_strength()
    }

    /// `atan(k_slope)` in degrees
    pub fn slope_angle_deg(&self) -> Option<f64> {
        self.k_slope.map(|s| s.atan().to_degrees())
    }
}

/// Turns detections into events. Pure, no I/O.
pub struct EventAssembler<'a> {
    series: &'a Series,
    stoch: &'a Stochastic,
    levels: Levels,
    smooth_k: Period,
}

impl<'a> EventAssembler<'a> {
    pub fn new(series: &'a Series, stoch: &'a Stochastic, config: &Config) -> Self {
        Self {
            series,
            stoch,
            levels: config.levels(),
            smooth_k: config.smooth_k,
        }
    }

    pub fn assemble(&self, detection: &Detection, context: SignalContext) -> DivergenceEvent {
        let c = &detection.candidate;
        let bar = detection.signal_bar;
        let is_early = detection.is_early();
        let k_slope = self.stoch.slope(bar);

        DivergenceEvent {
            kind: c.kind,
            is_early,
            p1: c.p1,
            p2: c.p2,
            bars_apart: c.bars_apart(),
            price_diff_pct: c.price_diff_pct(),
            oscillator_diff: c.oscillator_diff(),
            signal_bar: bar,
            signal_time: self.series.time()[bar],
            strength: score_divergence(c.kind, c.p1.oscillator, c.p2.oscillator, k_slope, &self.levels),
            k_slope,
            extreme_run: self.extreme_run(c),
            volume_change_pct: (!is_early).then(|| self.volume_change(c)),
            pattern: context.pattern,
            pressure: context.pressure,
            crossover: if is_early {
                self.crossover_target(c.kind, bar)
            } else {
                None
            },
        }
    }

    /// Walk back from `p1` while %K stays beyond the kind's level
    fn extreme_run(&self, c: &DivergenceCandidate) -> usize {
        let stop = c.p1.bar.saturating_sub(EXTREME_RUN_LIMIT);
        (stop..=c.p1.bar)
            .rev()
            .take_while(|&b| {
                self.stoch.k_at(b).is_some_and(|k| match c.kind {
                    DivergenceKind::Bearish => k > self.levels.overbought,
                    DivergenceKind::Bullish => k < self.levels.oversold,
                })
            })
            .count()
    }

    fn volume_change(&self, c: &DivergenceCandidate) -> f64 {
        let volume = self.series.volume();
        let (v1, v2) = (volume[c.p1.bar], volume[c.p2.bar]);
        if v1 <= 0.0 {
            return 0.0;
        }
        (v2 - v1) / v1 * 100.0
    }

    fn crossover_target(&self, kind: DivergenceKind, bar: usize) -> Option<CrossoverTarget> {
        let required = self.stoch.required_raw_for_cross(self.smooth_k, bar)?;
        let raw = self.stoch.raw.get(bar).copied().flatten()?;

        let convergence_pct = match kind {
            DivergenceKind::Bearish if required <= 0.0 => 100.0,
            DivergenceKind::Bearish => (100.0 * (1.0 - raw / required)).max(0.0),
            DivergenceKind::Bullish if required >= 100.0 || required <= 0.0 => 100.0,
            DivergenceKind::Bullish => (100.0 * raw / required).max(0.0),
        };

        Some(CrossoverTarget {
            required_raw: required,
            convergence_pct,
        })
    }
}
