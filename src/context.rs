//! Candlestick context attached to divergence events.
//!
//! Pattern recognition runs on an ordered table; the first pattern that
//! matches a bar wins, so multi-bar reversals shadow the single-bar shapes
//! they contain.

use serde::Serialize;

use crate::strength::Levels;
use crate::{Bar, Direction, OHLCVExt, Period, Sample, Series};

/// Computes context for a bar. Must be cheap and free of I/O.
pub trait ContextProvider: Send + Sync {
    /// `k` is %K at `index`, possibly unavailable
    fn context_at(&self, series: &Series, k: Sample, index: usize, levels: &Levels) -> SignalContext;
}

/// Context attached to one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SignalContext {
    pub pattern: Option<PatternMatch>,
    pub pressure: Option<Pressure>,
}

/// Recognised candlestick pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandlePattern {
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    MorningStar,
    EveningStar,
    BullishEngulfing,
    BearishEngulfing,
    PiercingLine,
    DarkCloudCover,
    HaramiCross,
    BullishHarami,
    BearishHarami,
    Hammer,
    HangingMan,
    InvertedHammer,
    ShootingStar,
    Doji,
}

impl CandlePattern {
    /// Score before oscillator and volume bonuses
    pub fn base_score(self) -> u8 {
        match self {
            CandlePattern::ThreeWhiteSoldiers | CandlePattern::ThreeBlackCrows => 90,
            CandlePattern::MorningStar | CandlePattern::EveningStar => 85,
            CandlePattern::BullishEngulfing | CandlePattern::BearishEngulfing => 75,
            CandlePattern::PiercingLine | CandlePattern::DarkCloudCover => 70,
            CandlePattern::HaramiCross => 65,
            CandlePattern::BullishHarami | CandlePattern::BearishHarami => 60,
            CandlePattern::Hammer | CandlePattern::HangingMan => 50,
            CandlePattern::InvertedHammer | CandlePattern::ShootingStar => 45,
            CandlePattern::Doji => 30,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CandlePattern::ThreeWhiteSoldiers => "Three White Soldiers",
            CandlePattern::ThreeBlackCrows => "Three Black Crows",
            CandlePattern::MorningStar => "Morning Star",
            CandlePattern::EveningStar => "Evening Star",
            CandlePattern::BullishEngulfing => "Bullish Engulfing",
            CandlePattern::BearishEngulfing => "Bearish Engulfing",
            CandlePattern::PiercingLine => "Piercing Line",
            CandlePattern::DarkCloudCover => "Dark Cloud Cover",
            CandlePattern::HaramiCross => "Harami Cross",
            CandlePattern::BullishHarami => "Bullish Harami",
            CandlePattern::BearishHarami => "Bearish Harami",
            CandlePattern::Hammer => "Hammer",
            CandlePattern::HangingMan => "Hanging Man",
            CandlePattern::InvertedHammer => "Inverted Hammer",
            CandlePattern::ShootingStar => "Shooting Star",
            CandlePattern::Doji => "Doji",
        }
    }
}

/// Trade bias implied by a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bias {
    Long,
    /// Long, pending confirmation by the next bars
    LongTentative,
    Short,
    ShortTentative,
    Neutral,
}

impl Bias {
    #[inline]
    pub fn is_long(self) -> bool {
        matches!(self, Bias::Long | Bias::LongTentative)
    }

    #[inline]
    pub fn is_short(self) -> bool {
        matches!(self, Bias::Short | Bias::ShortTentative)
    }

    pub fn direction(self) -> Direction {
        if self.is_long() {
            Direction::Bullish
        } else if self.is_short() {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatternMatch {
    pub pattern: CandlePattern,
    pub bias: Bias,
    /// 0..=100
    pub score: u8,
}

/// Where the close sits in the bar's range, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pressure {
    pub buying: f64,
    pub selling: f64,
}

impl Pressure {
    /// None for a zero-range bar
    pub fn of(bar: &Bar) -> Option<Self> {
        let range = bar.range();
        if range <= 0.0 {
            return None;
        }
        Some(Self {
            buying: (bar.close - bar.low) / range * 100.0,
            selling: (bar.high - bar.close) / range * 100.0,
        })
    }
}

/// Pattern score with oscillator and volume bonuses, capped at 100.
///
/// +15 when the bias agrees with an extreme %K reading; +15 when volume
/// exceeds 1.5x its average, +5 when it merely exceeds it.
pub fn pattern_score(
    base: u8,
    bias: Bias,
    k: Sample,
    volume: f64,
    avg_volume: Sample,
    levels: &Levels,
) -> u8 {
    let mut score = u32::from(base);

    let direction = bias.direction();
    let extreme = k.is_some_and(|k| {
        (direction.is_bullish() && k < levels.oversold)
            || (direction.is_bearish() && k > levels.overbought)
    });
    if extreme {
        score += 15;
    }

    if let Some(avg) = avg_volume {
        if volume > avg * 1.5 {
            score += 15;
        } else if volume > avg {
            score += 5;
        }
    }

    score.min(100) as u8
}

// ============================================================
// PATTERN TABLE
// ============================================================

/// View of the bars ending at `index`
struct Frame<'a> {
    series: &'a Series,
    index: usize,
    trend_lookback: usize,
}

impl Frame<'_> {
    /// Bar `back` steps before the current one
    fn bar(&self, back: usize) -> Option<Bar> {
        self.index.checked_sub(back).map(|i| self.series.bar(i))
    }

    /// Close of the previous bar against the close `trend_lookback` bars back
    fn prior_closes(&self) -> Option<(f64, f64)> {
        let prev = self.index.checked_sub(1)?;
        let start = self.index.saturating_sub(self.trend_lookback);
        let close = self.series.close();
        Some((close[prev], close[start]))
    }

    fn prior_up(&self) -> bool {
        self.prior_closes().is_some_and(|(prev, start)| prev > start)
    }

    fn prior_down(&self) -> bool {
        self.prior_closes().is_some_and(|(prev, start)| prev < start)
    }
}

#[inline]
fn midpoint(bar: &Bar) -> f64 {
    (bar.open + bar.close) / 2.0
}

#[inline]
fn is_doji_body(bar: &Bar) -> bool {
    let range = bar.range();
    range > 0.0 && bar.body() <= range * 0.1
}

/// Long lower wick, small upper wick
#[inline]
fn hammer_shape(bar: &Bar) -> bool {
    let body = bar.body();
    body > 0.0 && bar.lower_shadow() >= 2.0 * body && bar.upper_shadow() < body
}

/// Long upper wick, small lower wick
#[inline]
fn inverted_shape(bar: &Bar) -> bool {
    let body = bar.body();
    body > 0.0 && bar.upper_shadow() >= 2.0 * body && bar.lower_shadow() < body
}

type Rule = fn(&Frame<'_>) -> Option<Bias>;

const RULES: [(CandlePattern, Rule); 16] = [
    (CandlePattern::ThreeWhiteSoldiers, three_white_soldiers),
    (CandlePattern::ThreeBlackCrows, three_black_crows),
    (CandlePattern::MorningStar, morning_star),
    (CandlePattern::EveningStar, evening_star),
    (CandlePattern::BullishEngulfing, bullish_engulfing),
    (CandlePattern::BearishEngulfing, bearish_engulfing),
    (CandlePattern::PiercingLine, piercing_line),
    (CandlePattern::DarkCloudCover, dark_cloud_cover),
    (CandlePattern::HaramiCross, harami_cross),
    (CandlePattern::BullishHarami, bullish_harami),
    (CandlePattern::BearishHarami, bearish_harami),
    (CandlePattern::Hammer, hammer),
    (CandlePattern::HangingMan, hanging_man),
    (CandlePattern::InvertedHammer, inverted_hammer),
    (CandlePattern::ShootingStar, shooting_star),
    (CandlePattern::Doji, doji),
];

fn three_white_soldiers(f: &Frame<'_>) -> Option<Bias> {
    let (a, b, c) = (f.bar(2)?, f.bar(1)?, f.bar(0)?);
    (f.prior_down()
        && a.is_bullish()
        && b.is_bullish()
        && c.is_bullish()
        && b.close > a.close
        && c.close > b.close
        && b.open > a.open
        && b.open < a.close
        && c.open > b.open
        && c.open < b.close)
        .then_some(Bias::Long)
}

fn three_black_crows(f: &Frame<'_>) -> Option<Bias> {
    let (a, b, c) = (f.bar(2)?, f.bar(1)?, f.bar(0)?);
    (f.prior_up()
        && a.is_bearish()
        && b.is_bearish()
        && c.is_bearish()
        && b.close < a.close
        && c.close < b.close
        && b.open < a.open
        && b.open > a.close
        && c.open < b.open
        && c.open > b.close)
        .then_some(Bias::Short)
}

fn morning_star(f: &Frame<'_>) -> Option<Bias> {
    let (a, b, c) = (f.bar(2)?, f.bar(1)?, f.bar(0)?);
    (f.prior_down()
        && a.is_bearish()
        && a.body() > b.body()
        && b.open.min(b.close) < a.close
        && c.is_bullish()
        && c.close > midpoint(&a))
        .then_some(Bias::Long)
}

fn evening_star(f: &Frame<'_>) -> Option<Bias> {
    let (a, b, c) = (f.bar(2)?, f.bar(1)?, f.bar(0)?);
    (f.prior_up()
        && a.is_bullish()
        && a.body() > b.body()
        && b.open.max(b.close) > a.close
        && c.is_bearish()
        && c.close < midpoint(&a))
        .then_some(Bias::Short)
}

fn bullish_engulfing(f: &Frame<'_>) -> Option<Bias> {
    let (prev, cur) = (f.bar(1)?, f.bar(0)?);
    (f.prior_down()
        && prev.is_bearish()
        && cur.is_bullish()
        && cur.close > prev.open
        && cur.open < prev.close)
        .then_some(Bias::Long)
}

fn bearish_engulfing(f: &Frame<'_>) -> Option<Bias> {
    let (prev, cur) = (f.bar(1)?, f.bar(0)?);
    (f.prior_up()
        && prev.is_bullish()
        && cur.is_bearish()
        && cur.close < prev.open
        && cur.open > prev.close)
        .then_some(Bias::Short)
}

fn piercing_line(f: &Frame<'_>) -> Option<Bias> {
    let (prev, cur) = (f.bar(1)?, f.bar(0)?);
    (f.prior_down()
        && prev.is_bearish()
        && cur.is_bullish()
        && cur.open < prev.close
        && cur.close > midpoint(&prev)
        && cur.close < prev.open)
        .then_some(Bias::Long)
}

fn dark_cloud_cover(f: &Frame<'_>) -> Option<Bias> {
    let (prev, cur) = (f.bar(1)?, f.bar(0)?);
    (f.prior_up()
        && prev.is_bullish()
        && cur.is_bearish()
        && cur.open > prev.close
        && cur.close < midpoint(&prev)
        && cur.close > prev.open)
        .then_some(Bias::Short)
}

fn harami_cross(f: &Frame<'_>) -> Option<Bias> {
    let (prev, cur) = (f.bar(1)?, f.bar(0)?);
    let matched = (f.prior_up() || f.prior_down())
        && prev.body() > cur.body() * 3.0
        && is_doji_body(&cur)
        && cur.high < prev.high
        && cur.low > prev.low;
    matched.then(|| {
        if prev.is_bearish() {
            Bias::LongTentative
        } else {
            Bias::ShortTentative
        }
    })
}

fn bullish_harami(f: &Frame<'_>) -> Option<Bias> {
    let (prev, cur) = (f.bar(1)?, f.bar(0)?);
    (f.prior_down()
        && prev.is_bearish()
        && cur.is_bullish()
        && cur.open > prev.close
        && cur.close < prev.open)
        .then_some(Bias::LongTentative)
}

fn bearish_harami(f: &Frame<'_>) -> Option<Bias> {
    let (prev, cur) = (f.bar(1)?, f.bar(0)?);
    (f.prior_up()
        && prev.is_bullish()
        && cur.is_bearish()
        && cur.open < prev.close
        && cur.close > prev.open)
        .then_some(Bias::ShortTentative)
}

fn hammer(f: &Frame<'_>) -> Option<Bias> {
    (f.prior_down() && hammer_shape(&f.bar(0)?)).then_some(Bias::Long)
}

fn hanging_man(f: &Frame<'_>) -> Option<Bias> {
    (f.prior_up() && hammer_shape(&f.bar(0)?)).then_some(Bias::Short)
}

fn inverted_hammer(f: &Frame<'_>) -> Option<Bias> {
    (f.prior_down() && inverted_shape(&f.bar(0)?)).then_some(Bias::LongTentative)
}

fn shooting_star(f: &Frame<'_>) -> Option<Bias> {
    (f.prior_up() && inverted_shape(&f.bar(0)?)).then_some(Bias::Short)
}

fn doji(f: &Frame<'_>) -> Option<Bias> {
    is_doji_body(&f.bar(0)?).then_some(Bias::Neutral)
}

// ============================================================
// PROVIDERS
// ============================================================

/// Candlestick pattern plus buying/selling pressure at the bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleContext {
    /// Bars used to judge the preceding trend
    pub trend_lookback: Period,
    /// Bars in the average volume the bonus compares against
    pub volume_lookback: Period,
}

impl Default for CandleContext {
    fn default() -> Self {
        Self {
            trend_lookback: Period::new_const(10),
            volume_lookback: Period::new_const(20),
        }
    }
}

impl CandleContext {
    /// First matching pattern at `index`, scored
    pub fn pattern_at(&self, series: &Series, k: Sample, index: usize, levels: &Levels) -> Option<PatternMatch> {
        if index >= series.len() {
            return None;
        }

        let frame = Frame {
            series,
            index,
            trend_lookback: self.trend_lookback.get(),
        };
        let (pattern, bias) = RULES
            .iter()
            .find_map(|&(pattern, rule)| rule(&frame).map(|bias| (pattern, bias)))?;

        let score = pattern_score(
            pattern.base_score(),
            bias,
            k,
            series.volume()[index],
            self.average_volume(series, index),
            levels,
        );

        Some(PatternMatch {
            pattern,
            bias,
            score,
        })
    }

    /// Mean volume over the window ending at `index`; None with too little history
    fn average_volume(&self, series: &Series, index: usize) -> Sample {
        let len = self.volume_lookback.get();
        let start = (index + 1).checked_sub(len)?;
        let window = &series.volume()[start..=index];
        Some(window.iter().sum::<f64>() / len as f64)
    }
}

impl ContextProvider for CandleContext {
    fn context_at(&self, series: &Series, k: Sample, index: usize, levels: &Levels) -> SignalContext {
        if index >= series.len() {
            return SignalContext::default();
        }
        SignalContext {
            pattern: self.pattern_at(series, k, index, levels),
            pressure: Pressure::of(&series.bar(index)),
        }
    }
}

/// Provider that attaches nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl ContextProvider for NoContext {
    fn context_at(&self, _: &Series, _: Sample, _: usize, _: &Levels) -> SignalContext {
        SignalContext::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: Levels = Levels {
        oversold: 20.0,
        overbought: 80.0,
    };

    fn downtrend(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 100.0 - i as f64 * 2.0;
                Bar::new(i as i64, base + 1.0, base + 2.0, base - 1.0, base - 0.5, 1000.0)
            })
            .collect()
    }

    fn uptrend(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                Bar::new(i as i64, base - 0.5, base + 1.5, base - 1.5, base + 1.0, 1000.0)
            })
            .collect()
    }

    fn pattern_of(bars: &[Bar]) -> Option<PatternMatch> {
        let series = Series::from_bars(bars);
        CandleContext::default().pattern_at(&series, None, bars.len() - 1, &LEVELS)
    }

    #[test]
    fn test_hammer_after_downtrend() {
        let mut bars = downtrend(10);
        bars.push(Bar::new(10, 80.0, 80.15, 75.0, 80.1, 1000.0));

        let m = pattern_of(&bars).unwrap();
        assert_eq!(m.pattern, CandlePattern::Hammer);
        assert_eq!(m.bias, Bias::Long);
        assert_eq!(m.score, 50);
    }

    #[test]
    fn test_same_shape_after_uptrend_is_hanging_man() {
        let mut bars = uptrend(10);
        // Opens above the prior candle, body 0.1, long lower wick
        bars.push(Bar::new(10, 121.0, 121.15, 116.0, 121.1, 1000.0));

        let m = pattern_of(&bars).unwrap();
        assert_eq!(m.pattern, CandlePattern::HangingMan);
        assert_eq!(m.bias.direction(), Direction::Bearish);
    }

    #[test]
    fn test_harami_cross_shadows_doji() {
        let mut bars = uptrend(10);
        bars.push(Bar::new(10, 118.2, 118.6, 117.9, 118.2, 1000.0));

        let m = pattern_of(&bars).unwrap();
        assert_eq!(m.pattern, CandlePattern::HaramiCross);
        // Prior candle was bullish
        assert_eq!(m.bias, Bias::ShortTentative);
        assert_eq!(m.score, 65);
    }

    #[test]
    fn test_lone_doji() {
        let bars = vec![Bar::new(0, 100.0, 101.0, 99.0, 100.05, 1000.0)];
        let m = pattern_of(&bars).unwrap();
        assert_eq!(m.pattern, CandlePattern::Doji);
        assert_eq!(m.bias, Bias::Neutral);
    }

    #[test]
    fn test_bullish_engulfing() {
        let mut bars = downtrend(10);
        // Previous: open 83, close 81.5
        bars.push(Bar::new(10, 81.0, 84.5, 80.5, 84.0, 1000.0));

        let m = pattern_of(&bars).unwrap();
        assert_eq!(m.pattern, CandlePattern::BullishEngulfing);
        assert_eq!(m.score, 75);
    }

    #[test]
    fn test_no_pattern() {
        let mut bars = uptrend(10);
        // Plain bullish candle continuing the trend
        bars.push(Bar::new(10, 119.5, 122.0, 119.0, 121.5, 1000.0));
        assert!(pattern_of(&bars).is_none());
    }

    #[test]
    fn test_pattern_score_bonuses() {
        assert_eq!(pattern_score(50, Bias::Long, Some(10.0), 1000.0, None, &LEVELS), 65);
        assert_eq!(pattern_score(50, Bias::Long, Some(90.0), 1000.0, None, &LEVELS), 50);
        assert_eq!(pattern_score(50, Bias::ShortTentative, Some(90.0), 1000.0, None, &LEVELS), 65);
        assert_eq!(pattern_score(50, Bias::Neutral, Some(10.0), 1000.0, None, &LEVELS), 50);
        assert_eq!(pattern_score(50, Bias::Long, None, 1600.0, Some(1000.0), &LEVELS), 65);
        assert_eq!(pattern_score(50, Bias::Long, None, 1200.0, Some(1000.0), &LEVELS), 55);
        assert_eq!(pattern_score(90, Bias::Long, Some(5.0), 2000.0, Some(1000.0), &LEVELS), 100);
    }

    #[test]
    fn test_volume_bonus_from_series() {
        let mut bars = downtrend(25);
        let last = bars.len() - 1;
        // Turn the last bar into a hammer on heavy volume
        let base = bars[last - 1].close - 1.0;
        bars[last] = Bar::new(last as i64, base, base + 0.15, base - 5.0, base + 0.1, 3000.0);

        let series = Series::from_bars(&bars);
        let m = CandleContext::default()
            .pattern_at(&series, Some(15.0), last, &LEVELS)
            .unwrap();
        assert_eq!(m.pattern, CandlePattern::Hammer);
        assert_eq!(m.score, 50 + 15 + 15);
    }

    #[test]
    fn test_pressure() {
        let p = Pressure::of(&Bar::new(0, 100.0, 110.0, 90.0, 105.0, 1.0)).unwrap();
        assert_eq!(p.buying, 75.0);
        assert_eq!(p.selling, 25.0);
        assert!(Pressure::of(&Bar::new(0, 1.0, 1.0, 1.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn test_no_context_provider() {
        let series = Series::from_bars(&downtrend(5));
        let ctx = NoContext.context_at(&series, Some(10.0), 4, &LEVELS);
        assert_eq!(ctx, SignalContext::default());

        let ctx = CandleContext::default().context_at(&series, None, 4, &LEVELS);
        assert!(ctx.pressure.is_some());
    }
}
