//! Per-bar feature record: candle geometry, displacement, trend, volatility.
//!
//! Built in one batch pass from the precomputed series. Every field at index
//! `t` depends only on bars `0..=t`.

use serde::{Deserialize, Serialize};

use super::{Atr, BodyStd, Ema, Indicator};
use crate::domain::Bar;
use crate::params::{ParameterSet, ATR_PERIOD};

use super::displacement::displacement_strength;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    // ── Geometry ──
    pub body: f64,
    pub range: f64,
    pub body_top: f64,
    pub body_bottom: f64,
    pub upper_wick: f64,
    pub lower_wick: f64,
    pub upper_wick_pct: f64,
    pub lower_wick_pct: f64,
    pub upper_wick_body_ratio: f64,
    pub lower_wick_body_ratio: f64,

    // ── Displacement ──
    /// `None` until `displacement_length` bars are available.
    pub body_std: Option<f64>,
    pub displacement_strength: u8,
    pub is_valid_displacement: bool,

    // ── Trend ──
    pub ema: f64,
    pub is_uptrend: bool,
    pub is_downtrend: bool,

    // ── Volatility ──
    /// `None` for the first `ATR_PERIOD - 1` bars.
    pub atr: Option<f64>,

    // ── Candle ──
    pub is_bullish: bool,
    pub is_bearish: bool,
    pub has_upper_wick: bool,
    pub has_lower_wick: bool,
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn pct_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// `part / whole`, or 0 when `whole` is 0.
pub fn ratio_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole
    } else {
        0.0
    }
}

fn defined(v: f64) -> Option<f64> {
    (!v.is_nan()).then_some(v)
}

impl IndicatorRecord {
    /// Build the record for one bar from its precomputed series values.
    pub fn from_bar(
        bar: &Bar,
        body_std: Option<f64>,
        ema: f64,
        atr: Option<f64>,
        params: &ParameterSet,
    ) -> Self {
        let body = (bar.close - bar.open).abs();
        let range = bar.high - bar.low;
        let body_top = bar.body_top();
        let body_bottom = bar.body_bottom();
        let upper_wick = bar.high - body_top;
        let lower_wick = body_bottom - bar.low;

        let upper_wick_pct = pct_of(upper_wick, range);
        let lower_wick_pct = pct_of(lower_wick, range);
        let upper_wick_body_ratio = ratio_of(upper_wick, body);
        let lower_wick_body_ratio = ratio_of(lower_wick, body);

        let strength = displacement_strength(body, body_std);
        let is_valid_displacement = body_std.is_some()
            && (params.min_displacement_strength..=params.max_displacement_strength)
                .contains(&strength);

        Self {
            body,
            range,
            body_top,
            body_bottom,
            upper_wick,
            lower_wick,
            upper_wick_pct,
            lower_wick_pct,
            upper_wick_body_ratio,
            lower_wick_body_ratio,
            body_std,
            displacement_strength: strength,
            is_valid_displacement,
            ema,
            is_uptrend: bar.close > ema,
            is_downtrend: bar.close < ema,
            atr,
            is_bullish: bar.close > bar.open,
            is_bearish: bar.close < bar.open,
            has_upper_wick: upper_wick_pct >= params.min_wick_pct
                && upper_wick_body_ratio >= params.min_wick_body_ratio,
            has_lower_wick: lower_wick_pct >= params.min_wick_pct
                && lower_wick_body_ratio >= params.min_wick_body_ratio,
        }
    }
}

/// Derive one `IndicatorRecord` per bar.
///
/// `params` must have passed [`ParameterSet::validated`]; `evaluate` does
/// this before calling in.
///
/// # Panics
/// If `displacement_length < 2` or `trend_ema_length == 0`.
pub fn compute_indicators(bars: &[Bar], params: &ParameterSet) -> Vec<IndicatorRecord> {
    let body_std = BodyStd::new(params.displacement_length).compute(bars);
    let ema = Ema::new(params.trend_ema_length).compute(bars);
    let atr = Atr::new(ATR_PERIOD).compute(bars);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            IndicatorRecord::from_bar(bar, defined(body_std[i]), ema[i], defined(atr[i]), params)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    fn record_for(bar: (f64, f64, f64, f64)) -> IndicatorRecord {
        let bars = make_ohlc_bars(&[bar]);
        IndicatorRecord::from_bar(&bars[0], Some(1.0), bars[0].close, None, &ParameterSet::default())
    }

    #[test]
    fn geometry_of_bullish_candle() {
        // open 100, high 106, low 99, close 104
        let r = record_for((100.0, 106.0, 99.0, 104.0));
        assert_approx(r.body, 4.0, DEFAULT_EPSILON);
        assert_approx(r.range, 7.0, DEFAULT_EPSILON);
        assert_approx(r.upper_wick, 2.0, DEFAULT_EPSILON);
        assert_approx(r.lower_wick, 1.0, DEFAULT_EPSILON);
        assert_approx(r.upper_wick_pct, 200.0 / 7.0, DEFAULT_EPSILON);
        assert_approx(r.upper_wick_body_ratio, 0.5, DEFAULT_EPSILON);
        assert!(r.is_bullish);
        assert!(!r.is_bearish);
        // 28.6% >= 15% and 0.5 >= 0.25
        assert!(r.has_upper_wick);
        // 14.3% < 15%
        assert!(!r.has_lower_wick);
    }

    #[test]
    fn zero_range_and_zero_body_yield_zero_ratios() {
        let r = record_for((100.0, 100.0, 100.0, 100.0));
        assert_eq!(r.upper_wick_pct, 0.0);
        assert_eq!(r.lower_wick_pct, 0.0);
        assert_eq!(r.upper_wick_body_ratio, 0.0);
        assert_eq!(r.lower_wick_body_ratio, 0.0);
        assert!(!r.is_bullish && !r.is_bearish);
    }

    #[test]
    fn significant_wick_needs_both_thresholds() {
        // open 100, close 110, high 112, low 100: wick 2 of range 12 (16.7%),
        // but only 0.2x the body.
        let r = record_for((100.0, 112.0, 100.0, 110.0));
        assert!(r.upper_wick_pct >= 15.0);
        assert!(r.upper_wick_body_ratio < 0.25);
        assert!(!r.has_upper_wick);
    }

    #[test]
    #[should_panic(expected = "body std length must be >= 2")]
    fn unvalidated_window_length_panics() {
        let bars = make_ohlc_bars(&[(100.0, 103.0, 99.0, 102.0); 5]);
        let params = ParameterSet {
            displacement_length: 1,
            ..ParameterSet::default()
        };
        assert!(params.clone().validated().is_err());
        compute_indicators(&bars, &params);
    }

    #[test]
    fn warmup_leaves_displacement_invalid() {
        let bars = make_ohlc_bars(&[(100.0, 103.0, 99.0, 102.0); 20]);
        let params = ParameterSet {
            displacement_length: 10,
            ..ParameterSet::default()
        };
        let records = compute_indicators(&bars, &params);
        assert_eq!(records.len(), 20);
        for r in &records[..9] {
            assert!(r.body_std.is_none());
            assert_eq!(r.displacement_strength, 0);
            assert!(!r.is_valid_displacement);
        }
        assert!(records[9].body_std.is_some());
        assert!(records[12].atr.is_none());
        assert!(records[13].atr.is_some());
    }

    #[test]
    fn trend_flags_follow_ema() {
        let bars = make_ohlc_bars(&[
            (100.0, 101.0, 99.0, 100.0),
            (100.0, 103.0, 99.0, 102.0),
            (102.0, 102.5, 97.0, 98.0),
        ]);
        let params = ParameterSet {
            trend_ema_length: 3,
            ..ParameterSet::default()
        };
        let records = compute_indicators(&bars, &params);
        // EMA: 100, 101, 99.5
        assert!(!records[0].is_uptrend && !records[0].is_downtrend);
        assert!(records[1].is_uptrend);
        assert!(records[2].is_downtrend);
    }
}
