//! Parameter metadata for detection settings
//!
//! Describes every tunable knob of [`Config`] and [`CandleContext`] so callers
//! can build them from a flat name/value map, e.g. for grid search.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use stochdiv::params::Parameterized;
//! use stochdiv::prelude::*;
//!
//! for param in Config::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut values = HashMap::new();
//! values.insert("stoch_length", 14.0);
//! let config = Config::with_params(&values).unwrap();
//! assert_eq!(config.stoch_length.get(), 14);
//! ```

use std::collections::HashMap;

use crate::context::CandleContext;
use crate::{Config, DivergenceError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value (0.0..=1.0)
  Ratio,
  /// Period value (positive integer)
  Period,
  /// Bar count (non-negative integer)
  Bars,
  /// Oscillator level (0.0..=100.0)
  Level,
  /// On/off switch, 0.0 or 1.0
  Flag,
}

/// Metadata for a single parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "stoch_length")
  pub name: &'static str,
  pub param_type: ParamType,
  /// Default value
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn bars(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Bars, default, range, description }
  }

  pub const fn level(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Level, default, range, description }
  }

  pub const fn flag(name: &'static str, default: bool, description: &'static str) -> Self {
    let default = if default { 1.0 } else { 0.0 };
    Self { name, param_type: ParamType::Flag, default, range: (0.0, 1.0, 1.0), description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(DivergenceError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio | ParamType::Level => Ok(()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(DivergenceError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Bars => {
        if value.fract() != 0.0 {
          return Err(DivergenceError::InvalidValue("Bar count must be an integer"));
        }
        Ok(())
      },
      ParamType::Flag => {
        if value != 0.0 && value != 1.0 {
          return Err(DivergenceError::InvalidValue("Flag must be 0 or 1"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Settings that can be built from a flat parameter map
pub trait Parameterized: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates settings from a HashMap
  ///
  /// Missing parameters use their default values. Every supplied value is
  /// validated against its metadata.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

/// Check every known key that is present in `params`
fn validate_present(meta: &[ParamMeta], params: &HashMap<&str, f64>) -> Result<()> {
  for m in meta {
    if let Some(&value) = params.get(m.name) {
      m.validate(value)?;
    }
  }
  Ok(())
}

static CONFIG_PARAMS: [ParamMeta; 11] = [
  ParamMeta::period("stoch_length", 12.0, (5.0, 30.0, 1.0), "%K lookback window"),
  ParamMeta::period("smooth_k", 3.0, (1.0, 10.0, 1.0), "SMA length applied to raw %K"),
  ParamMeta::period("smooth_d", 3.0, (1.0, 10.0, 1.0), "SMA length applied to %K"),
  ParamMeta::level("oversold", 20.0, (5.0, 40.0, 5.0), "Oversold level"),
  ParamMeta::level("overbought", 80.0, (60.0, 95.0, 5.0), "Overbought level"),
  ParamMeta::bars("pivot_left", 5.0, (1.0, 15.0, 1.0), "Bars left of a pivot"),
  ParamMeta::bars("pivot_right", 1.0, (0.0, 10.0, 1.0), "Bars right of a pivot"),
  ParamMeta::ratio(
    "price_tolerance",
    0.012,
    (0.004, 0.024, 0.004),
    "Max relative price difference between paired pivots",
  ),
  ParamMeta::period("min_bars_between_pivots", 7.0, (3.0, 20.0, 1.0), "Min bars between paired pivots"),
  ParamMeta::flag("enable_early", true, "Evaluate the early signal on the last bar"),
  ParamMeta::flag("wait_for_crossover", true, "Confirm only on a %K/%D crossover"),
];

impl Parameterized for Config {
  fn param_meta() -> &'static [ParamMeta] {
    &CONFIG_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    validate_present(&CONFIG_PARAMS, params)?;
    let d = Config::default();

    let config = Config {
      stoch_length: get_period(params, "stoch_length", d.stoch_length.get())?,
      smooth_k: get_period(params, "smooth_k", d.smooth_k.get())?,
      smooth_d: get_period(params, "smooth_d", d.smooth_d.get())?,
      oversold: params.get("oversold").copied().unwrap_or(d.oversold),
      overbought: params.get("overbought").copied().unwrap_or(d.overbought),
      pivot_left: get_bars(params, "pivot_left", d.pivot_left),
      pivot_right: get_bars(params, "pivot_right", d.pivot_right),
      price_tolerance: get_ratio(params, "price_tolerance", d.price_tolerance.get())?,
      min_bars_between_pivots: get_bars(params, "min_bars_between_pivots", d.min_bars_between_pivots),
      enable_early: get_flag(params, "enable_early", d.enable_early),
      wait_for_crossover: get_flag(params, "wait_for_crossover", d.wait_for_crossover),
    };
    config.validate()?;
    Ok(config)
  }
}

static CONTEXT_PARAMS: [ParamMeta; 2] = [
  ParamMeta::period("trend_lookback", 10.0, (3.0, 30.0, 1.0), "Bars used to judge the prior trend"),
  ParamMeta::period("volume_lookback", 20.0, (5.0, 50.0, 5.0), "Bars in the average volume"),
];

impl Parameterized for CandleContext {
  fn param_meta() -> &'static [ParamMeta] {
    &CONTEXT_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    validate_present(&CONTEXT_PARAMS, params)?;
    let d = CandleContext::default();
    Ok(CandleContext {
      trend_lookback: get_period(params, "trend_lookback", d.trend_lookback.get())?,
      volume_lookback: get_period(params, "volume_lookback", d.volume_lookback.get())?,
    })
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  Period::new(value as usize)
}

/// Helper to get a bar count from params with default fallback
pub fn get_bars(params: &HashMap<&str, f64>, key: &str, default: usize) -> usize {
  params.get(key).map_or(default, |&v| v as usize)
}

/// Helper to get a flag from params with default fallback; any non-zero value is on
pub fn get_flag(params: &HashMap<&str, f64>, key: &str, default: bool) -> bool {
  params.get(key).map_or(default, |&v| v != 0.0)
}

// ============================================================
// TESTS
// ============================================================
