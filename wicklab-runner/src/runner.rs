//! Backtest runner: one parameter set through the pipeline, metrics and score.
//!
//! Two entry points:
//! - `run_backtest()`: full result with trades, used for reports and the CLI.
//! - `score_params()`: metrics and score only, used once per search trial.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use wicklab_core::data::dataset_fingerprint;
use wicklab_core::domain::{Bar, Trade};
use wicklab_core::{evaluate, evaluate_trades, ParamError, ParameterSet};

use crate::fitness;
use crate::metrics::MetricsSummary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamError),
    #[error("no bars to evaluate")]
    NoBars,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// The parameter set after validation (clamped strengths).
    pub params: ParameterSet,
    pub metrics: MetricsSummary,
    #[serde(with = "crate::metrics::extended_f64")]
    pub score: f64,
    pub trades: Vec<Trade>,
    pub bar_count: usize,
    pub first_bar: String,
    pub last_bar: String,
    pub dataset_hash: String,
    pub signal_count: usize,
    /// Signals that survived the risk stage with a usable level.
    pub actionable_count: usize,
    /// Whether a position was still open, and discarded, at the last bar.
    pub open_at_end: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run one full backtest with trade extraction.
pub fn run_backtest(bars: &[Bar], params: &ParameterSet) -> Result<BacktestResult, RunError> {
    let (first, last) = match (bars.first(), bars.last()) {
        (Some(f), Some(l)) => (f.timestamp.to_string(), l.timestamp.to_string()),
        _ => return Err(RunError::NoBars),
    };
    let eval = evaluate(bars, params)?;
    let metrics = MetricsSummary::compute(&eval.trades);
    let score = fitness::score(&metrics);

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        signal_count: eval.signal_count(),
        actionable_count: eval.actionable_count(),
        open_at_end: eval.unrealized.is_some(),
        params: eval.params,
        metrics,
        score,
        trades: eval.trades,
        bar_count: bars.len(),
        first_bar: first,
        last_bar: last,
        dataset_hash: dataset_fingerprint(bars),
    })
}

/// Metrics and score for one parameter set, discarding the trades.
pub fn score_params(
    bars: &[Bar],
    params: &ParameterSet,
) -> Result<(MetricsSummary, f64), ParamError> {
    let trades = evaluate_trades(bars, params)?;
    let metrics = MetricsSummary::compute(&trades);
    let score = fitness::score(&metrics);
    Ok((metrics, score))
}
