//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), with
//! TR[0] = high-low since there is no previous close.
//! ATR is the simple rolling mean of TR over `period` bars.
//! Lookback: period - 1.

use std::collections::VecDeque;

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// Compute the True Range series from bars.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let hl = bar.high - bar.low;
        let value = match i.checked_sub(1).map(|p| bars[p].close) {
            Some(pc) if !pc.is_nan() => hl.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
            _ => hl,
        };
        tr.push(value);
    }

    tr
}

/// Trailing simple mean over a fixed-size window. NaN while the window is
/// not full or contains a NaN.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if period == 0 {
        return result;
    }

    let mut window: VecDeque<f64> = VecDeque::with_capacity(period);
    for (i, &v) in values.iter().enumerate() {
        if window.len() == period {
            window.pop_front();
        }
        window.push_back(v);
        if window.len() == period && window.iter().all(|x| !x.is_nan()) {
            result[i] = window.iter().sum::<f64>() / period as f64;
        }
    }

    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_mean(&true_range(bars), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 105-95 = 10
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, |108-102|, |100-102|) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, |107-106|, |98-106|) = 9
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        // Gap up: prev close 100, current bar 110-115-108
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // TR = max(7, |115-100|, |108-100|) = 15
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 10
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
        ]);
        let result = Atr::new(3).compute(&bars);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 9.0, DEFAULT_EPSILON); // (10+8+9)/3
        assert_approx(result[3], 23.0 / 3.0, DEFAULT_EPSILON); // (8+9+6)/3
    }

    #[test]
    fn atr_14_undefined_for_first_13_bars() {
        let bars = make_ohlc_bars(&[(100.0, 101.0, 99.0, 100.0); 20]);
        let result = Atr::new(14).compute(&bars);
        assert!(result[..13].iter().all(|v| v.is_nan()));
        assert_approx(result[13], 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_mean_nan_window() {
        let out = rolling_mean(&[1.0, f64::NAN, 3.0, 5.0, 7.0], 2);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert!(out[2].is_nan());
        assert_approx(out[3], 4.0, DEFAULT_EPSILON);
        assert_approx(out[4], 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::new(14).lookback(), 13);
    }
}
