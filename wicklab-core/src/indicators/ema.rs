//! Exponential Moving Average (EMA) of close.
//!
//! Recursive, no bias correction: EMA[0] = close[0],
//! EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (span + 1).
//! Lookback: 0 (defined from the first bar).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            name: format!("ema_{span}"),
        }
    }

    pub fn alpha(&self) -> f64 {
        2.0 / (self.span as f64 + 1.0)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.alpha())
    }
}

/// EMA of an arbitrary series with the given smoothing factor.
///
/// A NaN input leaves the running average untouched and yields the last
/// defined value (NaN until the first defined input).
pub fn ema_of_series(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &v in values {
        if !v.is_nan() {
            prev = Some(match prev {
                None => v,
                Some(p) => alpha * v + (1.0 - alpha) * p,
            });
        }
        result.push(prev.unwrap_or(f64::NAN));
    }

    result
}
