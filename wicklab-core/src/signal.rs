//! Signal Generator: per-bar reversal classification.
//!
//! A short setup is a bullish displacement candle rejected by a significant
//! upper wick; a long setup is the mirror image. Classification is a pure
//! function of one `IndicatorRecord` and never looks at other bars.
//!
//! Tie-break: if both setups hold on the same bar and both sides may trade,
//! the short wins.

use serde::{Deserialize, Serialize};

use crate::domain::Direction;
use crate::indicators::IndicatorRecord;
use crate::params::TradeDirection;

/// Per-bar classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    #[default]
    None,
    Long,
    Short,
}

impl Signal {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::None => None,
            Self::Long => Some(Direction::Long),
            Self::Short => Some(Direction::Short),
        }
    }

    pub fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Short candidate: valid displacement, bullish body, significant upper wick.
pub fn is_short_candidate(r: &IndicatorRecord) -> bool {
    r.is_valid_displacement && r.is_bullish && r.has_upper_wick
}

/// Long candidate: valid displacement, bearish body, significant lower wick.
pub fn is_long_candidate(r: &IndicatorRecord) -> bool {
    r.is_valid_displacement && r.is_bearish && r.has_lower_wick
}

/// Classify one bar under the configured direction mode.
///
/// `Auto` requires a downtrend for shorts and an uptrend for longs; the
/// other modes ignore trend.
pub fn classify(record: &IndicatorRecord, mode: TradeDirection) -> Signal {
    let (short_ok, long_ok) = match mode {
        TradeDirection::Auto => (
            is_short_candidate(record) && record.is_downtrend,
            is_long_candidate(record) && record.is_uptrend,
        ),
        TradeDirection::LongOnly => (false, is_long_candidate(record)),
        TradeDirection::ShortOnly => (is_short_candidate(record), false),
        TradeDirection::Both => (is_short_candidate(record), is_long_candidate(record)),
    };

    if short_ok {
        Signal::Short
    } else if long_ok {
        Signal::Long
    } else {
        Signal::None
    }
}

/// Classify every bar.
pub fn generate_signals(records: &[IndicatorRecord], mode: TradeDirection) -> Vec<Signal> {
    records.iter().map(|r| classify(r, mode)).collect()
}
