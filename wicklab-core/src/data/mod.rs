//! Bar loading: CSV import, Yahoo Finance, normalization and fingerprinting.
//!
//! Everything here runs before the pipeline. It guarantees the bar contract
//! the engine relies on: finite OHLC, timestamps strictly increasing.

pub mod csv_import;
pub mod provider;
pub mod yahoo;

pub use csv_import::{load_csv, parse_timestamp, read_bars};
pub use provider::{BarProvider, DataError, DataSource, LoadedBars};
pub use yahoo::YahooProvider;

use tracing::{debug, warn};

use crate::domain::Bar;

/// Fewest bars an optimization or backtest will run on.
pub const MIN_BARS: usize = 100;

/// Drop bars with missing OHLC, sort by time, reject duplicate timestamps.
pub fn normalize(mut bars: Vec<Bar>) -> Result<Vec<Bar>, DataError> {
    let before = bars.len();
    bars.retain(|b| !b.is_void());
    let dropped = before - bars.len();
    if dropped > 0 {
        warn!(dropped, "dropped bars with missing OHLC values");
    }

    bars.sort_by_key(|b| b.timestamp);
    if let Some(pair) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(DataError::DuplicateTimestamp {
            timestamp: pair[0].timestamp.to_string(),
        });
    }

    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        debug!(insane, "bars with high/low outside open/close kept as-is");
    }
    Ok(bars)
}

pub fn require_min_bars(bars: &[Bar], required: usize) -> Result<(), DataError> {
    if bars.len() < required {
        return Err(DataError::InsufficientBars {
            got: bars.len(),
            required,
        });
    }
    Ok(())
}

/// BLAKE3 over every bar's timestamp and OHLC, hex encoded.
///
/// Volume is excluded; it does not influence any evaluation.
pub fn dataset_fingerprint(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(bars.len() as u64).to_le_bytes());
    for bar in bars {
        hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
        for v in [bar.open, bar.high, bar.low, bar.close] {
            hasher.update(&v.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
