//! Metrics Aggregator: pure reduction of a trade list into summary statistics.
//!
//! Every metric is a pure function of the trade list, evaluated in trade
//! order. Nothing here knows about bars, parameters or the search.

use serde::{Deserialize, Serialize};
use wicklab_core::domain::Trade;

/// Aggregate performance of one evaluation. All currency values are dollars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    /// Percentage of trades with `pnl_dollars > 0`, in `[0, 100]`.
    pub win_rate: f64,
    /// Gross profit / gross loss; `f64::INFINITY` when trades exist and none lost.
    #[serde(with = "extended_f64")]
    pub profit_factor: f64,
    pub gross_profit: f64,
    /// Absolute value of the summed losing trades.
    pub gross_loss: f64,
    pub total_pnl: f64,
    pub avg_winner: f64,
    pub avg_loser: f64,
    pub max_drawdown: f64,
    /// Per-trade mean / sample std of `pnl_dollars`; not annualized.
    pub sharpe: f64,
    pub avg_r: f64,
}

impl MetricsSummary {
    /// Compute every metric from a trade list. An empty list is all zeros.
    pub fn compute(trades: &[Trade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }
        let pnl: Vec<f64> = trades.iter().map(|t| t.pnl_dollars).collect();
        let (wins, losses): (Vec<f64>, Vec<f64>) = pnl.iter().partition(|&&p| p > 0.0);
        let gross_profit = wins.iter().sum::<f64>();
        let gross_loss = losses.iter().sum::<f64>().abs();

        Self {
            total_trades: trades.len(),
            winners: wins.len(),
            losers: losses.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(gross_profit, gross_loss, trades.len()),
            gross_profit,
            gross_loss,
            total_pnl: pnl.iter().sum(),
            avg_winner: mean_f64(&wins),
            avg_loser: mean_f64(&losses),
            max_drawdown: max_drawdown(&pnl),
            sharpe: sharpe_ratio(&pnl),
            avg_r: avg_r_multiple(trades),
        }
    }

    pub fn has_trades(&self) -> bool {
        self.total_trades > 0
    }
}

/// Serde for floats that may be infinite.
///
/// JSON has no infinity; non-finite values are written as the strings
/// `"inf"`, `"-inf"` and `"nan"` and read back from them.
pub mod extended_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_f64(*value)
        } else if value.is_nan() {
            s.serialize_str("nan")
        } else if *value > 0.0 {
            s.serialize_str("inf")
        } else {
            s.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(t) => match t.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(serde::de::Error::custom(format!(
                    "expected a number, \"inf\", \"-inf\" or \"nan\", got \"{other}\""
                ))),
            },
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Winners as a percentage of all trades. 0 for no trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64 * 100.0
}

/// Gross profit over gross loss.
///
/// No trades → 0. Trades but no losing dollars → `f64::INFINITY`.
pub fn profit_factor(gross_profit: f64, gross_loss: f64, trade_count: usize) -> f64 {
    if trade_count == 0 {
        0.0
    } else if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else {
        f64::INFINITY
    }
}

/// Largest drop of cumulative P&L below its running peak.
///
/// The peak starts at the first cumulative value, not at zero, so a run that
/// only ever loses still reports the losses after its first trade.
pub fn max_drawdown(pnl: &[f64]) -> f64 {
    let mut cumulative = 0.0;
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0f64;
    for &p in pnl {
        cumulative += p;
        peak = peak.max(cumulative);
        max_dd = max_dd.max(peak - cumulative);
    }
    max_dd
}

/// Per-trade mean over sample standard deviation. 0 if undefined.
pub fn sharpe_ratio(pnl: &[f64]) -> f64 {
    let std = std_dev(pnl);
    if std > 0.0 && std.is_finite() {
        mean_f64(pnl) / std
    } else {
        0.0
    }
}

/// Mean R-multiple. Trades already carry 0 when their risk was not positive.
pub fn avg_r_multiple(trades: &[Trade]) -> f64 {
    let r: Vec<f64> = trades.iter().map(|t| t.r_multiple).collect();
    mean_f64(&r)
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
