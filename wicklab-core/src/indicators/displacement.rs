//! Displacement: candle body size measured against its own recent volatility.
//!
//! `BodyStd` is the trailing sample standard deviation (n-1 denominator) of
//! `|close - open|` over `length` bars, the current bar included.
//! Lookback: length - 1.

use std::collections::VecDeque;

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct BodyStd {
    length: usize,
    name: String,
}

impl BodyStd {
    pub fn new(length: usize) -> Self {
        assert!(length >= 2, "body std length must be >= 2");
        Self {
            length,
            name: format!("body_std_{length}"),
        }
    }
}

impl Indicator for BodyStd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.length - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let bodies: Vec<f64> = bars.iter().map(|b| (b.close - b.open).abs()).collect();
        rolling_std(&bodies, self.length)
    }
}

/// Trailing sample standard deviation over a fixed-size window.
///
/// Each window is recomputed in two passes over the buffer rather than
/// from running sums, which drift over long series.
pub fn rolling_std(values: &[f64], length: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if length < 2 {
        return result;
    }

    let mut window: VecDeque<f64> = VecDeque::with_capacity(length);
    for (i, &v) in values.iter().enumerate() {
        if window.len() == length {
            window.pop_front();
        }
        window.push_back(v);
        if window.len() < length || window.iter().any(|x| x.is_nan()) {
            continue;
        }
        let n = length as f64;
        let mean = window.iter().sum::<f64>() / n;
        let var = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        result[i] = var.sqrt();
    }

    result
}

/// Score a body against the trailing deviation: 4 if body > 4σ, 3 if > 3σ,
/// 2 if > 2σ, 1 if > σ, else 0. An undefined σ scores 0.
pub fn displacement_strength(body: f64, body_std: Option<f64>) -> u8 {
    let Some(sigma) = body_std else {
        return 0;
    };
    (1..=4u8)
        .rev()
        .find(|&k| body > sigma * k as f64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn rolling_std_known_values() {
        // Window [1, 2, 3]: mean 2, sample var = (1 + 0 + 1) / 2 = 1
        let out = rolling_std(&[1.0, 2.0, 3.0, 5.0], 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_approx(out[2], 1.0, DEFAULT_EPSILON);
        // Window [2, 3, 5]: mean 10/3, var = (16/9 + 1/9 + 25/9) / 2 = 7/3
        assert_approx(out[3], (7.0f64 / 3.0).sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_constant_window_is_exactly_zero() {
        let out = rolling_std(&[0.5; 5], 3);
        assert_eq!(out[4], 0.0);
    }

    #[test]
    fn strength_buckets() {
        assert_eq!(displacement_strength(4.1, Some(1.0)), 4);
        assert_eq!(displacement_strength(4.0, Some(1.0)), 3);
        assert_eq!(displacement_strength(2.5, Some(1.0)), 2);
        assert_eq!(displacement_strength(1.5, Some(1.0)), 1);
        assert_eq!(displacement_strength(1.0, Some(1.0)), 0);
        assert_eq!(displacement_strength(10.0, None), 0);
    }

    #[test]
    fn zero_sigma_scores_any_body_as_four() {
        assert_eq!(displacement_strength(0.25, Some(0.0)), 4);
        assert_eq!(displacement_strength(0.0, Some(0.0)), 0);
    }

    #[test]
    fn body_std_lookback() {
        assert_eq!(BodyStd::new(100).lookback(), 99);
    }
}
