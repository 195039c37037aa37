//! Risk-Level Calculator: entry, stop, target and risk for each signaled bar.
//!
//! Entry is the zone edge the signal bar printed: its high for a short, its
//! low for a long. A level only exists when the stop is defined and the
//! resulting risk is finite and strictly positive.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction};
use crate::indicators::IndicatorRecord;
use crate::params::{ParameterSet, StopMethod, TargetMethod};
use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLevel {
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub risk: f64,
}

/// A bar's signal after risk annotation.
///
/// `signal` is cleared when the max-risk filter rejects the bar. A signal
/// whose stop cannot be computed keeps `signal` but has no `level`, and is
/// therefore not actionable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    pub signal: Signal,
    pub level: Option<RiskLevel>,
}

impl Setup {
    /// The level, if this bar may open a position.
    pub fn actionable(&self) -> Option<&RiskLevel> {
        if self.signal.is_some() {
            self.level.as_ref()
        } else {
            None
        }
    }
}

/// Distance from the zone edge to the stop, or `None` when undefined.
fn stop_distance(
    record: &IndicatorRecord,
    direction: Direction,
    params: &ParameterSet,
) -> Option<f64> {
    match params.stop_method {
        StopMethod::Atr => record.atr.map(|atr| atr * params.atr_stop_mult),
        StopMethod::FixedTicks => Some(params.fixed_stop_ticks as f64 * params.tick_size),
        StopMethod::WickExtreme => {
            let wick = match direction {
                Direction::Short => record.upper_wick,
                Direction::Long => record.lower_wick,
            };
            Some(wick * params.wick_extreme_mult)
        }
    }
}

fn target_price(
    bar: &Bar,
    record: &IndicatorRecord,
    direction: Direction,
    entry: f64,
    risk: f64,
    params: &ParameterSet,
) -> f64 {
    match (params.target_method, direction) {
        (TargetMethod::FixedRr, _) => entry + direction.sign() * risk * params.target_rr,
        (TargetMethod::WickFill, Direction::Short) => record.body_top,
        (TargetMethod::WickFill, Direction::Long) => record.body_bottom,
        (TargetMethod::BodyFill, Direction::Short) => record.body_bottom,
        (TargetMethod::BodyFill, Direction::Long) => record.body_top,
        (TargetMethod::EntireCandle, Direction::Short) => bar.low,
        (TargetMethod::EntireCandle, Direction::Long) => bar.high,
    }
}

/// Compute the risk level for one bar, before the max-risk filter.
pub fn compute_risk_level(
    bar: &Bar,
    record: &IndicatorRecord,
    signal: Signal,
    params: &ParameterSet,
) -> Option<RiskLevel> {
    let direction = signal.direction()?;
    let entry = match direction {
        Direction::Short => bar.high,
        Direction::Long => bar.low,
    };
    // Stop sits on the adverse side of the entry.
    let stop = entry - direction.sign() * stop_distance(record, direction, params)?;
    let risk = (stop - entry).abs();
    if !risk.is_finite() || risk <= 0.0 {
        return None;
    }
    let target = target_price(bar, record, direction, entry, risk, params);

    Some(RiskLevel {
        direction,
        entry,
        stop,
        target,
        risk,
    })
}

/// Annotate every bar with its setup, applying the max-risk filter.
pub fn compute_setups(
    bars: &[Bar],
    records: &[IndicatorRecord],
    signals: &[Signal],
    params: &ParameterSet,
) -> Vec<Setup> {
    let max_risk = params.max_risk();

    bars.iter()
        .zip(records)
        .zip(signals)
        .map(|((bar, record), &signal)| {
            let level = compute_risk_level(bar, record, signal, params);
            match level {
                Some(l) if params.use_max_risk_filter && l.risk > max_risk => Setup::default(),
                _ => Setup { signal, level },
            }
        })
        .collect()
}
