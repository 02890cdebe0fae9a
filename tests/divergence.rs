//! Integration tests for stochastic divergence detection.
//!
//! These tests exercise the public API end to end.

use stochdiv::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone, Copy)]
struct TestBar {
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

impl TestBar {
    fn new(h: f64, l: f64, c: f64) -> Self {
        Self { h, l, c, v: 1000.0 }
    }
}

impl OHLCV for TestBar {
    fn open(&self) -> f64 {
        self.c
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> f64 {
        self.v
    }
}

/// Deterministic oscillating bars
fn make_wave(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let c = 100.0 + (x * 0.35).sin() * 6.0 + (x * 0.11).cos() * 3.0;
            TestBar::new(c + 1.0 + (x * 0.7).sin().abs(), c - 1.0, c)
        })
        .collect()
}

/// Two nearly equal highs with a much weaker close at the second one
fn make_double_top() -> Vec<TestBar> {
    [
        (101.0, 99.0, 100.0),
        (102.0, 100.0, 101.0),
        (104.0, 101.0, 103.0),
        (110.0, 103.0, 109.0),
        (106.0, 102.0, 103.0),
        (104.0, 100.0, 101.0),
        (105.0, 101.0, 104.0),
        (107.0, 103.0, 105.0),
        (110.5, 104.0, 105.0),
        (107.0, 103.0, 104.0),
        (106.0, 102.0, 103.0),
        (105.0, 101.0, 102.0),
    ]
    .iter()
    .map(|&(h, l, c)| TestBar::new(h, l, c))
    .collect()
}

/// Mirror image of the double top: two nearly equal lows, stronger close at the second
fn make_double_bottom() -> Vec<TestBar> {
    make_double_top()
        .iter()
        .map(|b| TestBar::new(200.0 - b.l, 200.0 - b.h, 200.0 - b.c))
        .collect()
}

fn tight_config() -> Config {
    Config {
        stoch_length: Period::new(3).unwrap(),
        smooth_k: Period::new(1).unwrap(),
        smooth_d: Period::new(1).unwrap(),
        pivot_left: 2,
        pivot_right: 1,
        min_bars_between_pivots: 3,
        enable_early: false,
        wait_for_crossover: false,
        ..Config::default()
    }
}

fn pivot(bar: usize, price: f64, osc: f64) -> Pivot {
    Pivot {
        bar,
        price,
        oscillator: Some(osc),
    }
}

fn historical_criteria() -> PairingCriteria {
    PairingCriteria::from_config(&Config::default(), PairingRules::historical())
}

// ============================================================
// PAIRING SCENARIOS
// ============================================================

#[test]
fn test_bearish_pair_ten_bars_apart() {
    let highs = [pivot(10, 100.0, 85.0), pivot(20, 100.5, 70.0)];
    let pairs = pair_pivots(&highs, DivergenceKind::Bearish, &historical_criteria());

    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].kind, DivergenceKind::Bearish);
    assert_eq!((pairs[0].p1.bar, pairs[0].p2.bar), (10, 20));
}

#[test]
fn test_seven_point_drop_is_not_enough() {
    let highs = [pivot(10, 100.0, 85.0), pivot(20, 100.5, 78.0)];
    assert!(pair_pivots(&highs, DivergenceKind::Bearish, &historical_criteria()).is_empty());
}

#[test]
fn test_pivots_five_bars_apart_rejected() {
    let highs = [pivot(10, 100.0, 85.0), pivot(15, 100.5, 60.0)];
    assert!(pair_pivots(&highs, DivergenceKind::Bearish, &historical_criteria()).is_empty());
}

// ============================================================
// ENGINE SCENARIOS
// ============================================================

#[test]
fn test_flat_series_has_no_events() {
    let bars: Vec<TestBar> = (0..80).map(|_| TestBar::new(100.0, 100.0, 100.0)).collect();
    let engine = EngineBuilder::new().build().unwrap();

    let report = engine.scan_bars(&bars).unwrap();
    assert_eq!(report.k.len(), 80);
    assert!(report.k.iter().all(Option::is_none));
    assert!(report.d.iter().all(Option::is_none));
    assert!(report.events.is_empty());
}

#[test]
fn test_short_series_reports_unavailable_values() {
    let bars = make_wave(5);
    let engine = EngineBuilder::new().build().unwrap();

    let report = engine.scan_bars(&bars).unwrap();
    assert_eq!(report.k, vec![None; 5]);
    assert_eq!(report.d, vec![None; 5]);
    assert!(report.events.is_empty());
}

#[test]
fn test_shape_mismatch_is_reported() {
    let err = Series::from_columns(
        vec![1.0; 4],
        vec![2.0; 4],
        vec![0.5; 4],
        vec![1.5; 4],
        vec![10.0; 3],
        vec![0, 1, 2, 3],
    )
    .unwrap_err();

    assert!(matches!(
        err,
        DivergenceError::InputShape {
            column: "volume",
            expected: 4,
            got: 3
        }
    ));
}

#[test]
fn test_double_top_forward_and_historical_agree() {
    let bars = make_double_top();

    for strategy in [Strategy::Forward, Strategy::Historical] {
        let engine = EngineBuilder::new()
            .config(tight_config())
            .strategy(strategy)
            .build()
            .unwrap();

        let report = engine.scan_bars(&bars).unwrap();
        assert_eq!(report.events.len(), 1, "{strategy:?}");
        let event = &report.events[0];
        assert_eq!(event.kind, DivergenceKind::Bearish);
        assert_eq!((event.p1.bar, event.p2.bar), (3, 8));
        assert_eq!(event.signal_bar, 9);
        assert_eq!(event.label(), StrengthLabel::VeryStrong);
        assert_eq!(report.signal(), Signal::Bearish);
    }
}

#[test]
fn test_double_bottom_is_bullish() {
    let engine = EngineBuilder::new().config(tight_config()).build().unwrap();

    let report = engine.scan_bars(&make_double_bottom()).unwrap();
    let bullish: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.kind == DivergenceKind::Bullish)
        .collect();

    assert_eq!(bullish.len(), 1);
    assert_eq!((bullish[0].p1.bar, bullish[0].p2.bar), (3, 8));
    assert!(bullish[0].oscillator_diff > 0.0);
}

#[test]
fn test_early_signal_only_on_last_bar() {
    let config = Config {
        enable_early: true,
        ..tight_config()
    };
    let engine = EngineBuilder::new().config(config).build().unwrap();

    let bars = make_double_top();
    let partial = engine.scan_bars(&bars[..9]).unwrap();
    assert_eq!(partial.events.len(), 1);
    assert!(partial.events[0].is_early);
    assert_eq!(partial.events[0].signal_bar, 8);

    // One more bar: the pivot is knowable and the early event is gone
    let grown = engine.scan_bars(&bars[..10]).unwrap();
    assert_eq!(grown.events.len(), 1);
    assert!(!grown.events[0].is_early);
    assert_eq!(grown.events[0].signal_bar, 9);
}

#[test]
fn test_min_strength_filter() {
    let engine = EngineBuilder::new()
        .config(tight_config())
        .min_strength(9)
        .build()
        .unwrap();
    assert_eq!(engine.scan_bars(&make_double_top()).unwrap().events.len(), 1);

    let strict = EngineBuilder::new()
        .config(tight_config())
        .pairing_rules(PairingRules {
            oscillator_gate: OscillatorGate::AtLeast(60.0),
            max_lookback: None,
        })
        .build()
        .unwrap();
    assert!(strict.scan_bars(&make_double_top()).unwrap().events.is_empty());
}

#[test]
fn test_no_context_provider() {
    let engine = EngineBuilder::new()
        .config(tight_config())
        .context_provider(NoContext)
        .build()
        .unwrap();

    let report = engine.scan_bars(&make_double_top()).unwrap();
    assert_eq!(report.events.len(), 1);
    assert!(report.events[0].pattern.is_none());
    assert!(report.events[0].pressure.is_none());
}

#[test]
fn test_events_respect_causality() {
    let bars = make_wave(300);
    let config = Config::default();
    let window = config.pivot_window();

    for strategy in [Strategy::Forward, Strategy::Historical] {
        let engine = EngineBuilder::new()
            .config(config)
            .strategy(strategy)
            .build()
            .unwrap();
        let report = engine.scan_bars(&bars).unwrap();

        for e in &report.events {
            assert!(e.p1.bar < e.p2.bar);
            assert!(e.bars_apart >= config.min_bars_between_pivots);
            assert!(e.price_diff_pct <= config.price_tolerance.get());
            assert!(e.signal_bar < bars.len());
            if !e.is_early {
                assert!(e.signal_bar >= e.p2.bar);
                assert!(e.signal_bar >= (e.p2.bar + window.right).min(bars.len() - 1));
            }
            match e.kind {
                DivergenceKind::Bearish => assert!(e.oscillator_diff < 0.0),
                DivergenceKind::Bullish => assert!(e.oscillator_diff > 0.0),
            }
        }
    }
}

#[test]
fn test_scan_is_idempotent() {
    let bars = make_wave(250);
    let engine = EngineBuilder::new().build().unwrap();

    let first = engine.scan_bars(&bars).unwrap();
    let second = engine.scan_bars(&bars).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_summary_on_wave() {
    let bars = make_wave(200);
    let engine = EngineBuilder::new().build().unwrap();
    let series = Series::from_bars(&bars);

    let summary = engine.summarize(&series).unwrap();
    let report = engine.scan(&series).unwrap();
    assert_eq!(summary.k, *report.k.last().unwrap());
    assert_eq!(summary.d, *report.d.last().unwrap());
    assert_eq!(summary.signal, report.signal());
    assert_eq!(summary.latest.as_ref(), report.last_event());
}

#[test]
fn test_event_serializes() {
    let engine = EngineBuilder::new().config(tight_config()).build().unwrap();
    let report = engine.scan_bars(&make_double_top()).unwrap();

    let json = serde_json::to_value(&report.events[0]).unwrap();
    assert_eq!(json["kind"], "Bearish");
    assert_eq!(json["p1"]["bar"], 3);
    assert_eq!(json["strength"], 9);
}
