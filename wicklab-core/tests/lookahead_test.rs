//! Look-ahead contamination tests.
//!
//! No value at bar t may depend on bars t+1 or later. Method: run on a
//! truncated series (bars 0..150) and on the full series (bars 0..300), then
//! assert the truncated output equals the prefix of the full output.

use chrono::NaiveDate;
use wicklab_core::domain::Bar;
use wicklab_core::indicators::{compute_indicators, Atr, BodyStd, Ema, Indicator};
use wicklab_core::params::{StopMethod, TradeDirection};
use wicklab_core::{evaluate, ParameterSet};

/// N five-minute bars from a deterministic LCG walk, with an occasional
/// oversized candle so displacement signals actually fire.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(14, 30, 0)
        .unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    let mut price = 18_000.0;

    for i in 0..n {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let r = (state >> 33) as f64 / (1u64 << 31) as f64;
        let mut body = (r - 0.5) * 8.0;
        if i % 23 == 11 {
            body *= 6.0;
        }
        let open = price;
        let close = open + body;
        let upper = 0.25 + 6.0 * ((state >> 7) % 100) as f64 / 100.0;
        let lower = 0.25 + 6.0 * ((state >> 17) % 100) as f64 / 100.0;
        bars.push(Bar {
            timestamp: start + chrono::Duration::minutes(5 * i as i64),
            open,
            high: open.max(close) + upper,
            low: open.min(close) - lower,
            close,
            volume: Some(100.0 + i as f64),
        });
        price = close;
    }
    bars
}

fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let full = indicator.compute(full_bars);
    let truncated = indicator.compute(&full_bars[..truncated_len]);
    assert_eq!(truncated.len(), truncated_len, "{}: length", indicator.name());
    assert_eq!(full.len(), full_bars.len(), "{}: length", indicator.name());

    for i in 0..truncated_len {
        let (t, f) = (truncated[i], full[i]);
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            (t - f).abs() < 1e-10,
            "{}: look-ahead contamination at bar {i}: truncated={t}, full={f}",
            indicator.name()
        );
    }
}

fn search_like_params() -> ParameterSet {
    ParameterSet {
        displacement_length: 20,
        trend_ema_length: 20,
        min_wick_pct: 10.0,
        min_wick_body_ratio: 0.15,
        trade_direction: TradeDirection::Both,
        ..ParameterSet::default()
    }
}

#[test]
fn lookahead_ema() {
    let bars = make_test_bars(300);
    assert_no_lookahead(&Ema::new(20), &bars, 150);
    assert_no_lookahead(&Ema::new(50), &bars, 150);
}

#[test]
fn lookahead_atr() {
    let bars = make_test_bars(300);
    assert_no_lookahead(&Atr::new(14), &bars, 150);
    assert_no_lookahead(&Atr::new(5), &bars, 150);
}

#[test]
fn lookahead_body_std() {
    let bars = make_test_bars(300);
    assert_no_lookahead(&BodyStd::new(20), &bars, 150);
    assert_no_lookahead(&BodyStd::new(100), &bars, 150);
}

#[test]
fn lookahead_indicator_records() {
    let bars = make_test_bars(300);
    let params = search_like_params();
    let full = compute_indicators(&bars, &params);
    let truncated = compute_indicators(&bars[..150], &params);
    assert_eq!(&full[..150], &truncated[..]);
}

#[test]
fn lookahead_signals_and_setups() {
    let bars = make_test_bars(300);
    for stop_method in [StopMethod::Atr, StopMethod::WickExtreme, StopMethod::FixedTicks] {
        let params = ParameterSet {
            stop_method,
            ..search_like_params()
        };
        let full = evaluate(&bars, &params).unwrap();
        let truncated = evaluate(&bars[..150], &params).unwrap();
        assert_eq!(&full.signals[..150], &truncated.signals[..]);
        assert_eq!(&full.setups[..150], &truncated.setups[..]);
    }
}

#[test]
fn trades_closed_early_do_not_change_with_more_data() {
    let bars = make_test_bars(300);
    let params = search_like_params();
    let full = evaluate(&bars, &params).unwrap();
    let truncated = evaluate(&bars[..150], &params).unwrap();

    assert!(!full.trades.is_empty(), "fixture should produce trades");
    assert!(truncated.trades.len() <= full.trades.len());
    assert_eq!(&full.trades[..truncated.trades.len()], &truncated.trades[..]);
}
