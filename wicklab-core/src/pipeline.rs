//! One full strategy evaluation: indicators → signals → setups → trades.
//!
//! Every stage is a pure function of the bars and the parameter set, so an
//! evaluation may run on any thread alongside others sharing the same bars.

use serde::Serialize;

use crate::domain::{Bar, Position, Trade};
use crate::indicators::{compute_indicators, IndicatorRecord};
use crate::params::{ParamError, ParameterSet};
use crate::risk::{compute_setups, Setup};
use crate::signal::{generate_signals, Signal};
use crate::simulator::simulate;

/// Every intermediate series of one evaluation, aligned with the input bars.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub params: ParameterSet,
    pub records: Vec<IndicatorRecord>,
    pub signals: Vec<Signal>,
    pub setups: Vec<Setup>,
    pub trades: Vec<Trade>,
    pub unrealized: Option<Position>,
}

impl Evaluation {
    pub fn signal_count(&self) -> usize {
        self.signals.iter().filter(|s| s.is_some()).count()
    }

    pub fn actionable_count(&self) -> usize {
        self.setups.iter().filter(|s| s.actionable().is_some()).count()
    }
}

/// Validate `params` and run the whole pipeline over `bars`.
pub fn evaluate(bars: &[Bar], params: &ParameterSet) -> Result<Evaluation, ParamError> {
    let params = params.clone().validated()?;
    let records = compute_indicators(bars, &params);
    let signals = generate_signals(&records, params.trade_direction);
    let setups = compute_setups(bars, &records, &signals, &params);
    let result = simulate(bars, &setups, &params);
    Ok(Evaluation {
        params,
        records,
        signals,
        setups,
        trades: result.trades,
        unrealized: result.unrealized,
    })
}

/// Trades only, skipping the intermediate series the caller doesn't need.
pub fn evaluate_trades(bars: &[Bar], params: &ParameterSet) -> Result<Vec<Trade>, ParamError> {
    let params = params.clone().validated()?;
    let records = compute_indicators(bars, &params);
    let signals = generate_signals(&records, params.trade_direction);
    let setups = compute_setups(bars, &records, &signals, &params);
    Ok(simulate(bars, &setups, &params).trades)
}
