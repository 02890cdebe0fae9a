//! # stochdiv - Stochastic Divergence Detector
//!
//! Detects stochastic-oscillator / price divergences in OHLCV series and emits
//! scored, explainable divergence events with candlestick context.
//!
//! ## Quick Start
//!
//! ```rust
//! use stochdiv::prelude::*;
//!
//! // Any type implementing OHLCV can be turned into a Series
//! let bars: Vec<Bar> = (0..120)
//!     .map(|i| {
//!         let c = 100.0 + (i as f64 * 0.3).sin() * 5.0;
//!         Bar::new(i as i64, c, c + 1.0, c - 1.0, c, 1_000.0)
//!     })
//!     .collect();
//! let series = Series::from_bars(&bars);
//!
//! // Create engine with the reference configuration
//! let engine = EngineBuilder::new()
//!     .config(Config::default())
//!     .strategy(Strategy::Forward)
//!     .build()
//!     .unwrap();
//!
//! let report = engine.scan(&series).unwrap();
//! assert_eq!(report.k.len(), series.len());
//! ```

pub mod context;
pub mod divergence;
pub mod event;
pub mod oscillator;
pub mod params;
pub mod pivots;
pub mod rolling;
pub mod strength;

pub mod prelude {
    pub use crate::{
        // Context
        context::{
            Bias, CandleContext, CandlePattern, ContextProvider, NoContext, PatternMatch,
            Pressure, SignalContext,
        },
        // Pairing
        divergence::{
            forward::KindState, pair_pivots, DivergenceCandidate, DivergenceKind,
            DivergencePoint, OscillatorGate, PairingCriteria, PairingRules,
        },
        // Events
        event::{CrossoverTarget, DivergenceEvent, EventAssembler},
        // Indicators
        oscillator::{stochastic, Stochastic},
        // Parameters
        params::{ParamMeta, ParamType, Parameterized},
        // Pivots
        pivots::{pivot_highs, pivot_lows, Pivot, PivotPoint, PivotWindow},
        // Rolling statistics
        rolling::{moving_average, rolling_max, rolling_min, Extreme, MonotonicWindow},
        // Parallel
        scan_parallel,
        // Strength
        strength::{score_divergence, Levels, StrengthLabel, StrengthScore},
        // Types
        Bar,
        Config,
        Direction,
        DivergenceEngine,
        // Errors
        DivergenceError,
        DivergenceReport,
        EngineBuilder,
        OHLCVExt,
        Period,
        Ratio,
        Result,
        Sample,
        ScanError,
        ScanResult,
        Series,
        Signal,
        SignalSummary,
        Strategy,
        OHLCV,
    };
}

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use context::{CandleContext, ContextProvider};
use divergence::{DivergenceKind, PairingCriteria, PairingRules};
use event::{DivergenceEvent, EventAssembler};
use pivots::{Pivot, PivotPoint, PivotWindow};
use strength::Levels;

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, DivergenceError>;

/// Errors that can occur during divergence detection
#[derive(Debug, Clone, thiserror::Error)]
pub enum DivergenceError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Input shape mismatch: column `{column}` has {got} values, expected {expected}")]
    InputShape {
        column: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// A value that may not be available yet.
///
/// `None` marks insufficient history or a degenerate window; it propagates
/// through every downstream computation instead of raising.
pub type Sample = Option<f64>;

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(DivergenceError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(DivergenceError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(DivergenceError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed candle properties
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
            || self.volume().is_nan()
        {
            return Err(DivergenceError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(DivergenceError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(DivergenceError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// One time step of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.time)
    }
}

// ============================================================
// SERIES
// ============================================================

/// Column-oriented OHLCV series. All six columns share one length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    time: Vec<i64>,
}

impl Series {
    /// Build a series from six columns, rejecting unequal lengths.
    pub fn from_columns(
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
        time: Vec<i64>,
    ) -> Result<Self> {
        let expected = close.len();
        let lengths = [
            ("open", open.len()),
            ("high", high.len()),
            ("low", low.len()),
            ("volume", volume.len()),
            ("time", time.len()),
        ];
        if let Some(&(column, got)) = lengths.iter().find(|(_, len)| *len != expected) {
            return Err(DivergenceError::InputShape {
                column,
                expected,
                got,
            });
        }

        Ok(Self {
            open,
            high,
            low,
            close,
            volume,
            time,
        })
    }

    /// Build a series from any OHLCV rows. Rows without a timestamp use their index.
    pub fn from_bars<T: OHLCV>(bars: &[T]) -> Self {
        let len = bars.len();
        let mut series = Self {
            open: Vec::with_capacity(len),
            high: Vec::with_capacity(len),
            low: Vec::with_capacity(len),
            close: Vec::with_capacity(len),
            volume: Vec::with_capacity(len),
            time: Vec::with_capacity(len),
        };

        for (i, bar) in bars.iter().enumerate() {
            series.open.push(bar.open());
            series.high.push(bar.high());
            series.low.push(bar.low());
            series.close.push(bar.close());
            series.volume.push(bar.volume());
            series.time.push(bar.timestamp().unwrap_or(i as i64));
        }

        series
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.close.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// Row view at `index`. Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn bar(&self, index: usize) -> Bar {
        Bar {
            time: self.time[index],
            open: self.open[index],
            high: self.high[index],
            low: self.low[index],
            close: self.close[index],
            volume: self.volume[index],
        }
    }

    pub fn open(&self) -> &[f64] {
        &self.open
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    pub fn time(&self) -> &[i64] {
        &self.time
    }
}

// ============================================================
// DIRECTION & SIGNAL
// ============================================================

/// Directional bias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// Summary signal of a series: the kind of the most recently produced event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Bullish,
    Bearish,
    #[default]
    None,
}

impl Signal {
    pub fn from_events(events: &[DivergenceEvent]) -> Self {
        match events.last().map(|e| e.kind) {
            Some(DivergenceKind::Bullish) => Signal::Bullish,
            Some(DivergenceKind::Bearish) => Signal::Bearish,
            None => Signal::None,
        }
    }
}

// ============================================================
// CONFIGURATION
// ============================================================

/// Detection parameters.
///
/// Every field is required when deserializing. `Default` mirrors the
/// reference settings and is meant for callers; the engine never fills in
/// missing values itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// %K lookback (highest high / lowest low window)
    pub stoch_length: Period,
    /// SMA length applied to the raw stochastic
    pub smooth_k: Period,
    /// SMA length applied to %K
    pub smooth_d: Period,
    pub oversold: f64,
    pub overbought: f64,
    pub pivot_left: usize,
    pub pivot_right: usize,
    /// Max relative price difference between paired pivots
    pub price_tolerance: Ratio,
    pub min_bars_between_pivots: usize,
    /// Evaluate the repainting early signal on the last bar
    pub enable_early: bool,
    /// Forward strategy: hold pending divergences until %K crosses %D
    pub wait_for_crossover: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stoch_length: Period::new_const(12),
            smooth_k: Period::new_const(3),
            smooth_d: Period::new_const(3),
            oversold: 20.0,
            overbought: 80.0,
            pivot_left: 5,
            pivot_right: 1,
            price_tolerance: Ratio::new_const(0.012),
            min_bars_between_pivots: 7,
            enable_early: true,
            wait_for_crossover: true,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("oversold", self.oversold), ("overbought", self.overbought)] {
            if !value.is_finite() {
                return Err(DivergenceError::InvalidValue("Level must be finite"));
            }
            if !(0.0..=100.0).contains(&value) {
                return Err(DivergenceError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: 100.0,
                });
            }
        }
        if self.oversold >= self.overbought {
            return Err(DivergenceError::InvalidConfig(format!(
                "oversold ({}) must be below overbought ({})",
                self.oversold, self.overbought
            )));
        }
        if self.min_bars_between_pivots == 0 {
            return Err(DivergenceError::InvalidValue(
                "min_bars_between_pivots must be > 0",
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn levels(&self) -> Levels {
        Levels {
            oversold: self.oversold,
            overbought: self.overbought,
        }
    }

    #[inline]
    pub fn pivot_window(&self) -> PivotWindow {
        PivotWindow::new(self.pivot_left, self.pivot_right)
    }
}

/// How pivot pairs become events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Offline pairing over the full pivot lists. Never repaints.
    Historical,
    /// Bar-by-bar pairing with pending/confirm states and the early signal.
    #[default]
    Forward,
}

impl Strategy {
    /// Pairing thresholds each strategy uses unless overridden
    pub fn default_rules(self) -> PairingRules {
        match self {
            Strategy::Historical => PairingRules::historical(),
            Strategy::Forward => PairingRules::forward(),
        }
    }
}

/// Post-detection event filters
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub min_strength: Option<u8>,
    pub validate_data: bool,
    pub kind_filter: Option<DivergenceKind>,
}

// ============================================================
// OUTPUT
// ============================================================

/// Full output of one engine run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DivergenceReport {
    pub k: Vec<Sample>,
    pub d: Vec<Sample>,
    /// Events in detection order
    pub events: Vec<DivergenceEvent>,
    pub price_highs: Vec<Pivot>,
    pub price_lows: Vec<Pivot>,
    pub oscillator_highs: Vec<PivotPoint>,
    pub oscillator_lows: Vec<PivotPoint>,
}

impl DivergenceReport {
    pub fn signal(&self) -> Signal {
        Signal::from_events(&self.events)
    }

    pub fn last_event(&self) -> Option<&DivergenceEvent> {
        self.events.last()
    }
}

/// Per-series summary row: latest oscillator values plus the last signal
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalSummary {
    pub k: Sample,
    pub d: Sample,
    pub signal: Signal,
    pub latest: Option<DivergenceEvent>,
}

// ============================================================
// ENGINE
// ============================================================

/// Series shorter than this summarize to an empty [`SignalSummary`]
pub const MIN_SUMMARY_BARS: usize = 50;

/// Main divergence detection engine. Stateless between runs.
pub struct DivergenceEngine<C: ContextProvider = CandleContext> {
    config: Config,
    strategy: Strategy,
    rules: PairingRules,
    context_provider: C,
    settings: EngineSettings,
}

impl<C: ContextProvider> DivergenceEngine<C> {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn rules(&self) -> PairingRules {
        self.rules
    }

    /// Run detection over a complete series.
    pub fn scan(&self, series: &Series) -> Result<DivergenceReport> {
        if self.settings.validate_data {
            self.validate_bars(series)?;
        }
        Ok(self.scan_unchecked(series))
    }

    /// Convenience wrapper over [`Series::from_bars`] + [`Self::scan`].
    pub fn scan_bars<T: OHLCV>(&self, bars: &[T]) -> Result<DivergenceReport> {
        self.scan(&Series::from_bars(bars))
    }

    /// Latest %K/%D and last signal.
    ///
    /// A series shorter than [`MIN_SUMMARY_BARS`] is not scanned; it yields
    /// no values and [`Signal::None`].
    pub fn summarize(&self, series: &Series) -> Result<SignalSummary> {
        if series.len() < MIN_SUMMARY_BARS {
            debug!(bars = series.len(), "series too short to summarize");
            return Ok(SignalSummary::default());
        }

        let report = self.scan(series)?;
        Ok(SignalSummary {
            k: report.k.last().copied().flatten(),
            d: report.d.last().copied().flatten(),
            signal: report.signal(),
            latest: report.events.last().cloned(),
        })
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn scan_unchecked(&self, series: &Series) -> DivergenceReport {
        if series.is_empty() {
            return DivergenceReport::default();
        }

        let config = &self.config;
        debug!(
            bars = series.len(),
            strategy = ?self.strategy,
            "scanning series"
        );

        let stoch = oscillator::stochastic(
            series.high(),
            series.low(),
            series.close(),
            config.stoch_length,
            config.smooth_k,
            config.smooth_d,
        );

        let window = config.pivot_window();
        let price_highs = pivots::with_oscillator(&pivots::pivot_highs(series.high(), window), &stoch.k);
        let price_lows = pivots::with_oscillator(&pivots::pivot_lows(series.low(), window), &stoch.k);
        let oscillator_highs = pivots::pivot_highs(&stoch.k, window);
        let oscillator_lows = pivots::pivot_lows(&stoch.k, window);

        let criteria = PairingCriteria::from_config(config, self.rules);
        let detections = match self.strategy {
            Strategy::Historical => divergence::detect_historical(
                &price_highs,
                &price_lows,
                &criteria,
                window,
                series.len(),
            ),
            Strategy::Forward => divergence::forward::detect_forward(
                series,
                &stoch,
                &price_highs,
                &price_lows,
                &criteria,
                divergence::forward::ForwardOptions::from_config(config),
            ),
        };

        let levels = config.levels();
        let events: Vec<DivergenceEvent> = {
            let assembler = EventAssembler::new(series, &stoch, config);
            detections
                .iter()
                .map(|detection| {
                    let bar = detection.candidate.p2.bar;
                    let context = self.context_provider.context_at(series, stoch.k_at(bar), bar, &levels);
                    assembler.assemble(detection, context)
                })
                .filter(|event| self.should_include(event))
                .collect()
        };

        debug!(
            events = events.len(),
            price_highs = price_highs.len(),
            price_lows = price_lows.len(),
            "scan finished"
        );

        DivergenceReport {
            k: stoch.k,
            d: stoch.d,
            events,
            price_highs,
            price_lows,
            oscillator_highs,
            oscillator_lows,
        }
    }

    fn should_include(&self, event: &DivergenceEvent) -> bool {
        if let Some(min) = self.settings.min_strength {
            if event.strength.get() < min {
                return false;
            }
        }
        if let Some(kind) = self.settings.kind_filter {
            if event.kind != kind {
                return false;
            }
        }
        true
    }

    fn validate_bars(&self, series: &Series) -> Result<()> {
        for i in 0..series.len() {
            series.bar(i).validate().map_err(|e| match e {
                DivergenceError::InvalidOHLCV { reason, .. } => {
                    DivergenceError::InvalidOHLCV { index: i, reason }
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating DivergenceEngine instances
pub struct EngineBuilder<C: ContextProvider = CandleContext> {
    config: Config,
    strategy: Strategy,
    rules: Option<PairingRules>,
    context_provider: C,
    settings: EngineSettings,
}

impl Default for EngineBuilder<CandleContext> {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder<CandleContext> {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            strategy: Strategy::default(),
            rules: None,
            context_provider: CandleContext::default(),
            settings: EngineSettings::default(),
        }
    }
}

impl<C: ContextProvider> EngineBuilder<C> {
    /// Change context provider
    pub fn context_provider<C2: ContextProvider>(self, provider: C2) -> EngineBuilder<C2> {
        EngineBuilder {
            config: self.config,
            strategy: self.strategy,
            rules: self.rules,
            context_provider: provider,
            settings: self.settings,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Override the strategy's default pairing thresholds
    pub fn pairing_rules(mut self, rules: PairingRules) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Drop events scoring below `score` (0..=9)
    pub fn min_strength(mut self, score: u8) -> Self {
        self.settings.min_strength = Some(score);
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.settings.validate_data = enable;
        self
    }

    /// Keep only events of one kind
    pub fn only_kind(mut self, kind: DivergenceKind) -> Self {
        self.settings.kind_filter = Some(kind);
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<DivergenceEngine<C>> {
        self.config.validate()?;
        let rules = self.rules.unwrap_or_else(|| self.strategy.default_rules());
        rules.validate()?;
        if let Some(min) = self.settings.min_strength {
            if min > strength::StrengthScore::MAX {
                return Err(DivergenceError::OutOfRange {
                    field: "min_strength",
                    value: f64::from(min),
                    min: 0.0,
                    max: f64::from(strength::StrengthScore::MAX),
                });
            }
        }

        Ok(DivergenceEngine {
            config: self.config,
            strategy: self.strategy,
            rules,
            context_provider: self.context_provider,
            settings: self.settings,
        })
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub summary: SignalSummary,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: DivergenceError,
}

/// Parallel summary of multiple instruments. A failing series never affects the others.
pub fn scan_parallel<'a, I, C>(
    engine: &DivergenceEngine<C>,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a Series)>,
    C: ContextProvider,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, series)| {
            engine
                .summarize(series)
                .map(|summary| ScanResult {
                    symbol: symbol.to_string(),
                    summary,
                })
                .map_err(|error| {
                    warn!(symbol, %error, "scan failed");
                    ScanError {
                        symbol: symbol.to_string(),
                        error,
                    }
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TYPE ALIASES
// ============================================================

/// Default engine with CandleContext
pub type DefaultEngine = DivergenceEngine<CandleContext>;

// ============================================================
// TESTS
// ============================================================
