//! Trial scoring: the objective the parameter search maximizes.

use crate::metrics::MetricsSummary;

/// Fewer trades than this scores [`PENALTY_SCORE`].
pub const MIN_TRADES: usize = 20;

/// Score for a run with too few trades to judge.
pub const PENALTY_SCORE: f64 = -1000.0;

/// `profit_factor + win_rate / 100 - max_drawdown / 1000`, or the penalty
/// floor below [`MIN_TRADES`].
///
/// A run with no losing dollars has an infinite profit factor and scores
/// `+inf`; it beats every finite score.
pub fn score(metrics: &MetricsSummary) -> f64 {
    if metrics.total_trades < MIN_TRADES {
        return PENALTY_SCORE;
    }
    metrics.profit_factor + metrics.win_rate / 100.0 - metrics.max_drawdown / 1000.0
}

/// Whether `candidate` replaces `incumbent` as the best score.
///
/// Strictly greater: on an exact tie the earlier trial keeps its place. NaN
/// never wins.
pub fn is_better(candidate: f64, incumbent: f64) -> bool {
    candidate > incumbent
}
