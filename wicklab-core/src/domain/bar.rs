//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single instrument.
///
/// Timestamps are strictly increasing across a sequence; the loader enforces
/// this before bars ever reach the pipeline. Volume is optional because
/// several chart exports omit it and nothing in the strategy reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Bar {
    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        ![self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// Top of the open/close body.
    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    /// Bottom of the open/close body.
    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }
}
